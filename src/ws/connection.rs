//! Per-connection session pumps.
//!
//! [`serve_session`] drives one established connection for its whole
//! life. It registers the session with the [`Hub`], spawns the outbound
//! loop and the keepalive timer, runs the inbound loop on the calling
//! task, and tears everything down once any of them gives up.
//!
//! The connection is any `Stream` of inbound [`Frame`]s paired with a
//! `Sink` for outbound ones, so the pumps never see the upgrade step.
//! Every outbound write is bounded by the configured write timeout; a
//! peer that stops reading is torn down like any other failed write.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::Mutex;
use tokio::time::{Instant, interval_at, timeout};
use tracing::{debug, info, trace, warn};

use super::frame::Frame;
use super::messages::{Action, Envelope};
use crate::config::SessionConfig;
use crate::domain::{Enqueue, Hub, OutboundQueue, Payload, Session};
use crate::error::RelayError;

type SharedSink<Si> = Arc<Mutex<Si>>;

/// Runs a session over an established connection until it closes.
///
/// Returns once the outbound queue is closed, both halves of the
/// connection are released and the session is no longer in the hub; the
/// session is then in [`crate::domain::SessionState::Closed`].
pub async fn serve_session<St, Si>(
    hub: Arc<Hub>,
    session: Arc<Session>,
    queue: OutboundQueue,
    mut stream: St,
    sink: Si,
    config: SessionConfig,
) where
    St: Stream<Item = Result<Frame, RelayError>> + Unpin + Send,
    Si: Sink<Frame, Error = RelayError> + Unpin + Send + 'static,
{
    if !hub.register(&session).await {
        warn!(session = %session.id(), "session could not be registered");
    }

    let sink = Arc::new(Mutex::new(sink));
    let writer = tokio::spawn(write_loop(
        Arc::clone(&hub),
        Arc::clone(&session),
        queue,
        Arc::clone(&sink),
        config.write_timeout,
    ));
    let keepalive = tokio::spawn(keepalive_loop(
        Arc::clone(&session),
        sink,
        config.ping_interval,
        config.write_timeout,
    ));

    match read_loop(&hub, &session, &mut stream, &config).await {
        Ok(()) => debug!(session = %session.id(), "read loop finished"),
        Err(e) if e.is_session_fatal() => {
            info!(session = %session.id(), error = %e, "session ended by connection failure");
        }
        Err(e) => warn!(session = %session.id(), error = %e, "read loop failed"),
    }

    hub.unregister(&session).await;
    session.close().await;
    drop(stream);

    // Both joins are bounded: each write gives up after the write
    // timeout and the keepalive stops as soon as the session closes.
    if let Err(e) = writer.await {
        warn!(session = %session.id(), error = %e, "write loop panicked");
    }
    if let Err(e) = keepalive.await {
        warn!(session = %session.id(), error = %e, "keepalive task panicked");
    }

    session.mark_closed();
    info!(session = %session.id(), "session closed");
}

/// Reads frames until the peer leaves, the transport fails, the idle
/// deadline passes, or another trigger closes the session.
async fn read_loop<St>(
    hub: &Hub,
    session: &Arc<Session>,
    stream: &mut St,
    config: &SessionConfig,
) -> Result<(), RelayError>
where
    St: Stream<Item = Result<Frame, RelayError>> + Unpin,
{
    loop {
        let read = tokio::select! {
            biased;
            () = session.closed() => return Ok(()),
            read = timeout(config.idle_timeout, stream.next()) => read,
        };

        let frame = match read {
            Err(_) => return Err(RelayError::IdleTimeout(config.idle_timeout)),
            Ok(None) => return Ok(()),
            Ok(Some(frame)) => frame?,
        };

        // The axum adapter already rejects oversized frames on the wire
        // and surfaces them as transport errors. This covers connections
        // that reach the pumps without that limit.
        if frame.len() > config.max_message_size {
            return Err(RelayError::MessageTooLarge {
                size: frame.len(),
                limit: config.max_message_size,
            });
        }

        match frame {
            Frame::Text(text) => handle_message(hub, session, text.as_bytes()).await,
            Frame::Binary(data) => handle_message(hub, session, &data).await,
            Frame::Ping(_) | Frame::Pong(_) => trace!(session = %session.id(), "keepalive"),
            Frame::Close => return Ok(()),
        }
    }
}

/// Dispatches one inbound envelope. Never fatal to the session.
async fn handle_message(hub: &Hub, session: &Arc<Session>, raw: &[u8]) {
    let envelope: Envelope = match serde_json::from_slice(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(session = %session.id(), error = %e, "discarding malformed envelope");
            return;
        }
    };

    match envelope.action() {
        Action::Subscribe if !envelope.topic.is_empty() => {
            if hub.subscribe(session, &envelope.topic).await {
                acknowledge(session, &envelope.topic).await;
            }
        }
        Action::Publish if !envelope.topic.is_empty() && !envelope.message.is_empty() => {
            let payload: Payload = Arc::from(envelope.message);
            hub.publish(&envelope.topic, payload).await;
        }
        Action::Subscribe | Action::Publish => {
            debug!(session = %session.id(), action = %envelope.action, "ignoring incomplete envelope");
        }
        Action::Subscribed | Action::Unknown => {
            info!(session = %session.id(), action = %envelope.action, "unknown action");
        }
    }
}

/// Queues a subscribe acknowledgment if there is room.
async fn acknowledge(session: &Session, topic: &str) {
    let ack = match serde_json::to_string(&Envelope::subscribed(topic)) {
        Ok(json) => json,
        Err(e) => {
            warn!(session = %session.id(), error = %e, "failed to serialize acknowledgment");
            return;
        }
    };
    match session.try_enqueue(Arc::from(ack)).await {
        Enqueue::Queued | Enqueue::Closed => {}
        Enqueue::Full => {
            debug!(session = %session.id(), topic, "outbound queue full, acknowledgment dropped");
        }
    }
}

/// Writes one frame, giving up after `limit`.
async fn send_frame<Si>(
    sink: &SharedSink<Si>,
    frame: Frame,
    limit: Duration,
) -> Result<(), RelayError>
where
    Si: Sink<Frame, Error = RelayError> + Unpin + Send,
{
    match timeout(limit, async { sink.lock().await.send(frame).await }).await {
        Ok(sent) => sent,
        Err(_) => Err(RelayError::WriteTimeout(limit)),
    }
}

/// Writes queued payloads in order, then one best-effort close frame.
async fn write_loop<Si>(
    hub: Arc<Hub>,
    session: Arc<Session>,
    mut queue: OutboundQueue,
    sink: SharedSink<Si>,
    write_timeout: Duration,
) where
    Si: Sink<Frame, Error = RelayError> + Unpin + Send,
{
    while let Some(payload) = queue.recv().await {
        if let Err(e) = send_frame(&sink, Frame::Text(payload), write_timeout).await {
            debug!(session = %session.id(), error = %e, "write failed");
            hub.unregister(&session).await;
            session.close().await;
            return;
        }
    }

    if let Err(e) = send_frame(&sink, Frame::Close, write_timeout).await {
        trace!(session = %session.id(), error = %e, "close frame not delivered");
    }
}

/// Sends a ping every `period` until the session closes or a ping fails.
async fn keepalive_loop<Si>(
    session: Arc<Session>,
    sink: SharedSink<Si>,
    period: Duration,
    write_timeout: Duration,
) where
    Si: Sink<Frame, Error = RelayError> + Unpin + Send,
{
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            biased;
            () = session.closed() => return,
            _ = ticker.tick() => {}
        }

        let sent = tokio::select! {
            biased;
            () = session.closed() => return,
            sent = send_frame(&sink, Frame::Ping(Vec::new()), write_timeout) => sent,
        };
        if let Err(e) = sent {
            debug!(session = %session.id(), error = %e, "ping failed");
            return;
        }
    }
}
