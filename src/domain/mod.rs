//! Domain layer: session identity, shared session state, and the hub.
//!
//! This module contains the registry-and-relay engine: the [`Hub`] that
//! maps topics to subscriber sessions, and the [`Session`] state that the
//! hub and a connection's pumps share.

pub mod hub;
pub mod session;
pub mod session_id;

pub use hub::{FanOut, Hub};
pub use session::{Enqueue, OutboundQueue, Payload, Session, SessionState};
pub use session_id::SessionId;
