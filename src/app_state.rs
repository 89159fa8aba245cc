//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::{RelayConfig, SessionConfig};
use crate::domain::Hub;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Topic registry shared by every session.
    pub hub: Arc<Hub>,
    /// Limits applied to each new session.
    pub session: SessionConfig,
    /// Origins allowed to upgrade. Empty allows any origin.
    pub allowed_origins: Arc<[String]>,
}

impl AppState {
    /// Builds state with a fresh hub from the loaded configuration.
    #[must_use]
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            hub: Arc::new(Hub::new()),
            session: config.session,
            allowed_origins: config.allowed_origins.clone().into(),
        }
    }
}
