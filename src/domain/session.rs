//! Shared per-connection session state.
//!
//! A [`Session`] is the part of a client connection that other tasks
//! touch: the producer side of its bounded outbound queue, its lifecycle
//! state and the set of topics it subscribed to. The connection itself
//! stays with the pumps in [`crate::ws::connection`].
//!
//! # Outbound queue contract
//!
//! Producers (hub fan-out, the session's own acknowledgments) never wait
//! for queue space: [`Session::try_enqueue`] reports [`Enqueue::Full`]
//! instead. The single consumer, [`OutboundQueue::recv`], waits until a
//! payload is available or the queue is closed and drained.
//!
//! # Teardown
//!
//! The queue sender lives behind the session's own mutex. [`Session::close`]
//! takes it out under that mutex, so exactly one caller among any number
//! of concurrent teardown triggers observes the transition.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, watch};

use super::SessionId;

/// A serialized message waiting to be written to one connection.
///
/// Shared between every subscriber of a single publish.
pub type Payload = Arc<str>;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed around an established connection, not yet registered.
    Connecting,
    /// Registered with the hub and exchanging messages.
    Active,
    /// A teardown trigger fired; the outbound queue is closed.
    Closing,
    /// Queue closed, connection released and hub membership removed.
    Closed,
}

impl SessionState {
    /// Returns `true` once teardown has started.
    #[must_use]
    pub const fn is_closing(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

/// Outcome of a non-blocking enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    /// The payload was appended to the queue.
    Queued,
    /// The queue is at capacity; the payload was dropped.
    Full,
    /// The queue is closed; the payload was dropped.
    Closed,
}

/// Shared state of one client connection.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    outbound: Mutex<Option<mpsc::Sender<Payload>>>,
    topics: Mutex<HashSet<String>>,
    state: watch::Sender<SessionState>,
}

/// Consumer side of a session's outbound queue.
#[derive(Debug)]
pub struct OutboundQueue {
    rx: mpsc::Receiver<Payload>,
}

impl Session {
    /// Creates a session with an outbound queue bounded to `capacity`.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> (Arc<Self>, OutboundQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (state, _) = watch::channel(SessionState::Connecting);
        let session = Self {
            id: SessionId::new(),
            outbound: Mutex::new(Some(tx)),
            topics: Mutex::new(HashSet::new()),
            state,
        };
        (Arc::new(session), OutboundQueue { rx })
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns `true` once the outbound queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state().is_closing()
    }

    /// Returns a receiver that observes every state transition.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolves once teardown has started.
    pub async fn closed(&self) {
        let mut state = self.state.subscribe();
        let _ = state.wait_for(|s| s.is_closing()).await;
    }

    /// Attempts to append `payload` without waiting for queue space.
    pub async fn try_enqueue(&self, payload: Payload) -> Enqueue {
        let outbound = self.outbound.lock().await;
        let Some(tx) = outbound.as_ref() else {
            return Enqueue::Closed;
        };
        match tx.try_send(payload) {
            Ok(()) => Enqueue::Queued,
            Err(TrySendError::Full(_)) => Enqueue::Full,
            Err(TrySendError::Closed(_)) => Enqueue::Closed,
        }
    }

    /// Closes the outbound queue.
    ///
    /// Returns `true` only for the call that performed the close; every
    /// later call is a no-op returning `false`. Payloads already queued
    /// remain readable by the consumer until it drains them.
    pub async fn close(&self) -> bool {
        let mut outbound = self.outbound.lock().await;
        if outbound.take().is_none() {
            return false;
        }
        self.state.send_replace(SessionState::Closing);
        true
    }

    /// Returns the topics this session has subscribed to.
    pub async fn topics(&self) -> Vec<String> {
        self.topics.lock().await.iter().cloned().collect()
    }

    /// Records `topic` in the session's own subscription set.
    pub(crate) async fn record_topic(&self, topic: &str) {
        self.topics.lock().await.insert(topic.to_string());
    }

    /// Moves a freshly registered session to [`SessionState::Active`].
    pub(crate) fn activate(&self) {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Connecting {
                *state = SessionState::Active;
                true
            } else {
                false
            }
        });
    }

    /// Marks teardown as complete.
    ///
    /// Has no effect unless the queue has already been closed.
    pub(crate) fn mark_closed(&self) {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Closing {
                *state = SessionState::Closed;
                true
            } else {
                false
            }
        });
    }
}

impl OutboundQueue {
    /// Waits for the next payload.
    ///
    /// Returns `None` once the queue is closed and every payload queued
    /// before the close has been returned.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }
}

#[cfg(test)]
impl OutboundQueue {
    pub(crate) fn try_recv(&mut self) -> Option<Payload> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn drain_ready(&mut self) -> Vec<Payload> {
        let mut ready = Vec::new();
        while let Some(payload) = self.try_recv() {
            ready.push(payload);
        }
        ready
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn payload(s: &str) -> Payload {
        Arc::from(s)
    }

    #[tokio::test]
    async fn new_session_is_connecting() {
        let (session, _queue) = Session::new(4);
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(!session.is_closed());
    }

    #[tokio::test]
    async fn enqueue_preserves_fifo_order() {
        let (session, mut queue) = Session::new(4);
        assert_eq!(session.try_enqueue(payload("a")).await, Enqueue::Queued);
        assert_eq!(session.try_enqueue(payload("b")).await, Enqueue::Queued);

        let drained: Vec<String> = queue.drain_ready().iter().map(|p| p.to_string()).collect();
        assert_eq!(drained, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn full_queue_rejects_without_waiting() {
        let (session, _queue) = Session::new(1);
        assert_eq!(session.try_enqueue(payload("a")).await, Enqueue::Queued);
        assert_eq!(session.try_enqueue(payload("b")).await, Enqueue::Full);
    }

    #[tokio::test]
    async fn close_happens_once() {
        let (session, _queue) = Session::new(1);
        assert!(session.close().await);
        assert!(!session.close().await);
        assert_eq!(session.state(), SessionState::Closing);
        assert_eq!(session.try_enqueue(payload("late")).await, Enqueue::Closed);
    }

    #[tokio::test]
    async fn concurrent_closes_collapse_to_one() {
        let (session, _queue) = Session::new(1);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let session = Arc::clone(&session);
                tokio::spawn(async move { session.close().await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            let Ok(closed) = handle.await else {
                panic!("close task panicked");
            };
            if closed {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn consumer_drains_before_observing_close() {
        let (session, mut queue) = Session::new(4);
        let _ = session.try_enqueue(payload("last")).await;
        assert!(session.close().await);

        let Some(first) = queue.recv().await else {
            panic!("queued payload lost on close");
        };
        assert_eq!(&*first, "last");
        assert!(queue.recv().await.is_none());
    }

    #[tokio::test]
    async fn lifecycle_transitions_in_order() {
        let (session, _queue) = Session::new(1);
        session.mark_closed();
        assert_eq!(session.state(), SessionState::Connecting);

        session.activate();
        assert_eq!(session.state(), SessionState::Active);

        let _ = session.close().await;
        session.activate();
        assert_eq!(session.state(), SessionState::Closing);

        session.mark_closed();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn recorded_topics_are_deduplicated() {
        let (session, _queue) = Session::new(1);
        session.record_topic("news").await;
        session.record_topic("news").await;
        session.record_topic("sports").await;

        let mut topics = session.topics().await;
        topics.sort();
        assert_eq!(topics, vec!["news", "sports"]);
    }
}
