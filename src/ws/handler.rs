//! Axum WebSocket upgrade handler.
//!
//! Checks the request origin, performs the upgrade and adapts the axum
//! socket into the frame stream and sink the session pumps expect.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::http::header::ORIGIN;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt, future};
use tracing::{Instrument, info_span};

use super::connection::serve_session;
use super::frame::Frame;
use crate::app_state::AppState;
use crate::domain::Session;
use crate::error::RelayError;

/// `GET /wc` — Upgrade HTTP connection to WebSocket.
///
/// # Errors
///
/// Returns [`RelayError::OriginRejected`] if an allow-list is configured
/// and the request's `Origin` header is missing or not on it.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, RelayError> {
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    check_origin(origin, &state.allowed_origins)?;

    let config = state.session;
    Ok(ws
        .max_message_size(config.max_message_size)
        .on_upgrade(move |socket| run_socket(socket, state, peer)))
}

/// Runs one upgraded socket as a relay session.
async fn run_socket(socket: WebSocket, state: AppState, peer: SocketAddr) {
    let (session, queue) = Session::new(state.session.outbound_capacity);
    let span = info_span!("session", id = %session.id(), %peer);

    let (sink, stream) = socket.split();
    let stream = stream.map(|msg| msg.map(Frame::from).map_err(RelayError::transport));
    let sink = sink
        .sink_map_err(RelayError::transport)
        .with(|frame: Frame| future::ready(Ok::<_, RelayError>(Message::from(frame))));

    tracing::info!(parent: &span, "client connected");
    serve_session(
        Arc::clone(&state.hub),
        session,
        queue,
        stream,
        Box::pin(sink),
        state.session,
    )
    .instrument(span)
    .await;
}

/// Accepts `origin` if the allow-list is empty or contains it.
///
/// # Errors
///
/// Returns [`RelayError::OriginRejected`] otherwise.
pub fn check_origin(origin: Option<&str>, allowed: &[String]) -> Result<(), RelayError> {
    if allowed.is_empty() {
        return Ok(());
    }
    match origin {
        Some(origin) if allowed.iter().any(|a| a == origin) => Ok(()),
        Some(origin) => Err(RelayError::OriginRejected(origin.to_string())),
        None => Err(RelayError::OriginRejected("<missing>".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn empty_allow_list_accepts_anything() {
        assert!(check_origin(None, &[]).is_ok());
        assert!(check_origin(Some("https://any.example"), &[]).is_ok());
    }

    #[test]
    fn listed_origin_is_accepted() {
        let allowed = allow(&["https://app.example", "https://admin.example"]);
        assert!(check_origin(Some("https://admin.example"), &allowed).is_ok());
    }

    #[test]
    fn unlisted_or_missing_origin_is_rejected() {
        let allowed = allow(&["https://app.example"]);
        assert_eq!(
            check_origin(Some("https://evil.example"), &allowed),
            Err(RelayError::OriginRejected("https://evil.example".to_string()))
        );
        assert!(check_origin(None, &allowed).is_err());
    }
}
