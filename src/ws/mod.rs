//! WebSocket layer: upgrade handling, frames, envelopes and session pumps.
//!
//! The WebSocket endpoint (default `/wc`) carries one JSON envelope per
//! message. Clients subscribe to topics and publish to them; published
//! messages are relayed to every current subscriber.

pub mod connection;
pub mod frame;
pub mod handler;
pub mod messages;
