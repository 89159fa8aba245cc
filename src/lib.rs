//! # topic-relay
//!
//! Real-time publish/subscribe relay over WebSocket.
//!
//! Clients open a long-lived WebSocket, subscribe to named topics and
//! publish messages to them. Every message published to a topic is fanned
//! out to the sessions currently subscribed to it. A subscriber that
//! cannot keep up is disconnected rather than slowing everyone else down.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Handler (ws/handler)      REST Handlers (api/)
//!     │
//!     ├── Session pumps (ws/connection)
//!     │     inbound loop · outbound loop · keepalive
//!     │
//!     ├── Hub (domain/hub)
//!     │     active sessions · topic → subscribers
//!     │
//!     └── Session state (domain/session)
//!           bounded outbound queue · topics · lifecycle
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod ws;
