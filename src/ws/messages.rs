//! WebSocket message types: the envelope and its actions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Message body sent back when a subscription is confirmed.
pub const SUBSCRIBED_MESSAGE: &str = "Successfully subscribed";

/// Top-level WebSocket message envelope.
///
/// Missing fields deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Action discriminator, see [`Action`].
    #[serde(default)]
    pub action: String,
    /// Topic the action applies to.
    #[serde(default)]
    pub topic: String,
    /// Opaque message body.
    #[serde(default)]
    pub message: String,
}

/// Actions understood by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Client → Server: register interest in a topic.
    Subscribe,
    /// Client → Server: relay a message to a topic's subscribers.
    Publish,
    /// Server → Client: acknowledgment of a subscribe.
    Subscribed,
    /// Anything else; ignored.
    Unknown,
}

impl Action {
    /// Returns the wire name of a known action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Publish => "publish",
            Self::Subscribed => "subscribed",
            Self::Unknown => "unknown",
        }
    }
}

impl From<&str> for Action {
    fn from(raw: &str) -> Self {
        match raw {
            "subscribe" => Self::Subscribe,
            "publish" => Self::Publish,
            "subscribed" => Self::Subscribed,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Envelope {
    /// Builds the acknowledgment sent after a successful subscribe.
    #[must_use]
    pub fn subscribed(topic: &str) -> Self {
        Self {
            action: Action::Subscribed.as_str().to_string(),
            topic: topic.to_string(),
            message: SUBSCRIBED_MESSAGE.to_string(),
        }
    }

    /// Returns the parsed action.
    #[must_use]
    pub fn action(&self) -> Action {
        Action::from(self.action.as_str())
    }
}
