//! Transport-neutral WebSocket frames.
//!
//! The session pumps speak [`Frame`] so they can run over any duplex
//! connection; [`super::handler`] converts to and from axum messages.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::Message;

use crate::domain::Payload;

/// One discrete message on an established connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 application message, shared with every other recipient.
    Text(Payload),
    /// Binary application message.
    Binary(Vec<u8>),
    /// Keepalive probe.
    Ping(Vec<u8>),
    /// Keepalive acknowledgment.
    Pong(Vec<u8>),
    /// Protocol-level close.
    Close,
}

impl Frame {
    /// Returns the application payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) | Self::Ping(data) | Self::Pong(data) => data.len(),
            Self::Close => 0,
        }
    }

    /// Returns `true` if the frame carries no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Message> for Frame {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Text(text) => Self::Text(Arc::from(text.as_str())),
            Message::Binary(data) => Self::Binary(data.to_vec()),
            Message::Ping(data) => Self::Ping(data.to_vec()),
            Message::Pong(data) => Self::Pong(data.to_vec()),
            Message::Close(_) => Self::Close,
        }
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            // axum owns its frame buffers, so the shared text is copied once here.
            Frame::Text(text) => Self::text(String::from(&*text)),
            Frame::Binary(data) => Self::Binary(Bytes::from(data)),
            Frame::Ping(data) => Self::Ping(Bytes::from(data)),
            Frame::Pong(data) => Self::Pong(Bytes::from(data)),
            Frame::Close => Self::Close(None),
        }
    }
}
