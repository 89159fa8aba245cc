//! Topic DTOs for server-side publish and broadcast.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::FanOut;
use crate::error::RelayError;

/// Request body for `POST /topics/{topic}/publish` and `POST /broadcast`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PublishRequest {
    /// Message relayed verbatim to each recipient.
    pub message: String,
}

impl PublishRequest {
    /// Rejects empty messages, mirroring the WebSocket publish rules.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidRequest`] if `message` is empty.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.message.is_empty() {
            return Err(RelayError::InvalidRequest(
                "message must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Response body for publish and broadcast.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublishResponse {
    /// Topic the message was published to; absent for broadcasts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Sessions the message was queued for.
    pub delivered: usize,
    /// Sessions evicted because their queue was full.
    pub evicted: usize,
}

impl PublishResponse {
    /// Builds a response from a fan-out report.
    #[must_use]
    pub fn new(topic: Option<String>, report: FanOut) -> Self {
        Self {
            topic,
            delivered: report.delivered,
            evicted: report.evicted,
        }
    }
}
