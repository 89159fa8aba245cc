//! Topic registry and fan-out.
//!
//! [`Hub`] tracks every active session and, per topic, the set of
//! sessions subscribed to it. Both maps sit behind a single
//! [`tokio::sync::RwLock`].
//!
//! # Concurrency
//!
//! - `publish` and `broadcast` enumerate subscribers under the read lock.
//! - `register`, `unregister` and `subscribe` take the write lock.
//! - Sessions whose queue is full during a fan-out are evicted after the
//!   read lock has been released, so a fan-out never observes a bucket
//!   mid-mutation and never waits on a subscriber's queue.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::session::{Enqueue, Payload, Session};
use super::SessionId;

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    /// Sessions the payload was queued for.
    pub delivered: usize,
    /// Sessions evicted because their queue was full.
    pub evicted: usize,
}

#[derive(Debug, Default)]
struct Index {
    sessions: HashMap<SessionId, Arc<Session>>,
    topics: HashMap<String, HashSet<SessionId>>,
}

/// Shared registry of sessions and topic subscriptions.
#[derive(Debug, Default)]
pub struct Hub {
    index: RwLock<Index>,
}

impl Hub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `session` to the active set and marks it active.
    ///
    /// Returns `false` without changes if the session is already
    /// registered or has already started closing.
    pub async fn register(&self, session: &Arc<Session>) -> bool {
        let mut index = self.index.write().await;
        if session.is_closed() || index.sessions.contains_key(&session.id()) {
            return false;
        }
        index.sessions.insert(session.id(), Arc::clone(session));
        session.activate();
        debug!(session = %session.id(), active = index.sessions.len(), "session registered");
        true
    }

    /// Removes `session` from the active set and every topic bucket, then
    /// closes its outbound queue.
    ///
    /// Safe to call from any number of concurrent teardown paths: only the
    /// first call returns `true`.
    pub async fn unregister(&self, session: &Session) -> bool {
        let removed = {
            let mut index = self.index.write().await;
            if index.sessions.remove(&session.id()).is_some() {
                for topic in session.topics().await {
                    let now_empty = index.topics.get_mut(&topic).is_some_and(|bucket| {
                        bucket.remove(&session.id());
                        bucket.is_empty()
                    });
                    if now_empty {
                        index.topics.remove(&topic);
                    }
                }
                true
            } else {
                false
            }
        };

        session.close().await;
        if removed {
            info!(session = %session.id(), "session unregistered");
        }
        removed
    }

    /// Subscribes `session` to `topic`, creating the bucket on first use.
    ///
    /// Returns `false` if the session is not registered.
    pub async fn subscribe(&self, session: &Session, topic: &str) -> bool {
        let mut index = self.index.write().await;
        if !index.sessions.contains_key(&session.id()) {
            return false;
        }
        index
            .topics
            .entry(topic.to_string())
            .or_default()
            .insert(session.id());
        session.record_topic(topic).await;
        debug!(session = %session.id(), topic, "subscribed");
        true
    }

    /// Queues `payload` for every subscriber of `topic`.
    ///
    /// Subscribers whose queue is full are evicted. Never waits for queue
    /// space and never fails.
    pub async fn publish(&self, topic: &str, payload: Payload) -> FanOut {
        let (delivered, slow) = {
            let index = self.index.read().await;
            let Some(bucket) = index.topics.get(topic) else {
                debug!(topic, "publish to topic without subscribers");
                return FanOut::default();
            };
            let targets = bucket.iter().filter_map(|id| index.sessions.get(id));
            offer_all(targets, &payload).await
        };

        let evicted = self.evict(slow, topic).await;
        debug!(topic, delivered, evicted, "published");
        FanOut { delivered, evicted }
    }

    /// Queues `payload` for every active session regardless of topic.
    pub async fn broadcast(&self, payload: Payload) -> FanOut {
        let (delivered, slow) = {
            let index = self.index.read().await;
            offer_all(index.sessions.values(), &payload).await
        };

        let evicted = self.evict(slow, "*").await;
        debug!(delivered, evicted, "broadcast");
        FanOut { delivered, evicted }
    }

    /// Returns the number of active sessions.
    pub async fn session_count(&self) -> usize {
        self.index.read().await.sessions.len()
    }

    /// Returns the number of topics with at least one subscriber.
    pub async fn topic_count(&self) -> usize {
        self.index.read().await.topics.len()
    }

    /// Returns the number of sessions subscribed to `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.index
            .read()
            .await
            .topics
            .get(topic)
            .map_or(0, HashSet::len)
    }

    /// Returns `true` if the session is in the active set.
    pub async fn is_registered(&self, id: SessionId) -> bool {
        self.index.read().await.sessions.contains_key(&id)
    }

    /// Returns `true` if the session is in the bucket for `topic`.
    pub async fn is_subscribed(&self, id: SessionId, topic: &str) -> bool {
        self.index
            .read()
            .await
            .topics
            .get(topic)
            .is_some_and(|bucket| bucket.contains(&id))
    }

    async fn evict(&self, slow: Vec<Arc<Session>>, label: &str) -> usize {
        let mut evicted = 0;
        for session in slow {
            if self.unregister(&session).await {
                warn!(session = %session.id(), label, "evicted slow consumer (outbound queue full)");
                evicted += 1;
            }
        }
        evicted
    }
}

/// Offers `payload` to each session, returning the delivered count and
/// the sessions whose queue was full.
async fn offer_all<'a>(
    sessions: impl Iterator<Item = &'a Arc<Session>>,
    payload: &Payload,
) -> (usize, Vec<Arc<Session>>) {
    let mut delivered = 0;
    let mut slow = Vec::new();
    for session in sessions {
        match session.try_enqueue(Arc::clone(payload)).await {
            Enqueue::Queued => delivered += 1,
            Enqueue::Full => slow.push(Arc::clone(session)),
            Enqueue::Closed => {}
        }
    }
    (delivered, slow)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::session::{OutboundQueue, SessionState};

    fn text(s: &str) -> Payload {
        Arc::from(s)
    }

    fn drained(queue: &mut OutboundQueue) -> Vec<String> {
        queue.drain_ready().iter().map(|p| p.to_string()).collect()
    }

    async fn joined(hub: &Hub, capacity: usize) -> (Arc<Session>, OutboundQueue) {
        let (session, queue) = Session::new(capacity);
        assert!(hub.register(&session).await);
        (session, queue)
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let hub = Hub::new();
        let (session, _queue) = Session::new(1);
        assert!(hub.register(&session).await);
        assert!(!hub.register(&session).await);
        assert_eq!(hub.session_count().await, 1);
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn closed_session_cannot_register() {
        let hub = Hub::new();
        let (session, _queue) = Session::new(1);
        let _ = session.close().await;
        assert!(!hub.register(&session).await);
        assert_eq!(hub.session_count().await, 0);
    }

    #[tokio::test]
    async fn subscribe_requires_registration() {
        let hub = Hub::new();
        let (session, _queue) = Session::new(1);
        assert!(!hub.subscribe(&session, "news").await);
        assert_eq!(hub.topic_count().await, 0);
        assert!(session.topics().await.is_empty());
    }

    #[tokio::test]
    async fn subscribe_mirrors_topic_in_session() {
        let hub = Hub::new();
        let (session, _queue) = joined(&hub, 1).await;
        assert!(hub.subscribe(&session, "news").await);
        assert!(hub.is_subscribed(session.id(), "news").await);
        assert_eq!(session.topics().await, vec!["news"]);
    }

    #[tokio::test]
    async fn publish_reaches_only_subscribers() {
        let hub = Hub::new();
        let (a, mut qa) = joined(&hub, 4).await;
        let (b, mut qb) = joined(&hub, 4).await;
        let (_c, mut qc) = joined(&hub, 4).await;
        hub.subscribe(&a, "news").await;
        hub.subscribe(&b, "news").await;

        let report = hub.publish("news", text("payload")).await;
        assert_eq!(report, FanOut { delivered: 2, evicted: 0 });
        assert_eq!(drained(&mut qa), vec!["payload"]);
        assert_eq!(drained(&mut qb), vec!["payload"]);
        assert!(drained(&mut qc).is_empty());
    }

    #[tokio::test]
    async fn publish_to_unknown_topic_is_noop() {
        let hub = Hub::new();
        let (_a, mut qa) = joined(&hub, 1).await;
        assert_eq!(hub.publish("nobody", text("x")).await, FanOut::default());
        assert!(drained(&mut qa).is_empty());
    }

    #[tokio::test]
    async fn full_subscriber_is_evicted_others_still_receive() {
        let hub = Hub::new();
        let (a, mut qa) = joined(&hub, 1).await;
        let (b, mut qb) = joined(&hub, 2).await;
        let (_c, mut qc) = joined(&hub, 1).await;
        hub.subscribe(&a, "news").await;
        hub.subscribe(&b, "news").await;

        let first = hub.publish("news", text("hello")).await;
        assert_eq!(first, FanOut { delivered: 2, evicted: 0 });

        let second = hub.publish("news", text("world")).await;
        assert_eq!(second, FanOut { delivered: 1, evicted: 1 });

        assert!(!hub.is_registered(a.id()).await);
        assert!(!hub.is_subscribed(a.id(), "news").await);
        assert!(a.is_closed());
        assert_eq!(drained(&mut qa), vec!["hello"]);
        assert_eq!(drained(&mut qb), vec!["hello", "world"]);
        assert!(drained(&mut qc).is_empty());
        assert_eq!(hub.subscriber_count("news").await, 1);
    }

    #[tokio::test]
    async fn unregister_removes_every_membership_once() {
        let hub = Hub::new();
        let (a, _qa) = joined(&hub, 1).await;
        hub.subscribe(&a, "news").await;
        hub.subscribe(&a, "sports").await;

        assert!(hub.unregister(&a).await);
        assert!(!hub.unregister(&a).await);
        assert_eq!(hub.session_count().await, 0);
        assert_eq!(hub.topic_count().await, 0);
    }

    #[tokio::test]
    async fn empty_bucket_is_pruned_but_shared_bucket_kept() {
        let hub = Hub::new();
        let (a, _qa) = joined(&hub, 1).await;
        let (b, _qb) = joined(&hub, 1).await;
        hub.subscribe(&a, "news").await;
        hub.subscribe(&b, "news").await;
        hub.subscribe(&a, "solo").await;

        hub.unregister(&a).await;
        assert_eq!(hub.topic_count().await, 1);
        assert_eq!(hub.subscriber_count("news").await, 1);
        assert_eq!(hub.subscriber_count("solo").await, 0);
    }

    #[tokio::test]
    async fn concurrent_teardown_triggers_collapse_to_one() {
        let hub = Arc::new(Hub::new());
        let (a, _qa) = joined(&hub, 1).await;
        hub.subscribe(&a, "news").await;

        let mut handles = Vec::new();
        for i in 0..12 {
            let hub = Arc::clone(&hub);
            let a = Arc::clone(&a);
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    hub.unregister(&a).await
                } else {
                    a.close().await
                }
            }));
        }

        let mut removals = 0;
        let mut direct_closes = 0;
        for (i, handle) in handles.into_iter().enumerate() {
            let Ok(changed) = handle.await else {
                panic!("teardown task panicked");
            };
            match (i % 2 == 0, changed) {
                (true, true) => removals += 1,
                (false, true) => direct_closes += 1,
                _ => {}
            }
        }
        assert_eq!(removals, 1);
        assert!(direct_closes <= 1);
        assert!(a.is_closed());
        assert!(!hub.is_registered(a.id()).await);
        assert_eq!(hub.subscriber_count("news").await, 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_session_and_evicts_full_ones() {
        let hub = Hub::new();
        let (_a, mut qa) = joined(&hub, 1).await;
        let (b, _qb) = joined(&hub, 1).await;
        let _ = b.try_enqueue(text("backlog")).await;

        let report = hub.broadcast(text("all")).await;
        assert_eq!(report, FanOut { delivered: 1, evicted: 1 });
        assert_eq!(drained(&mut qa), vec!["all"]);
        assert!(!hub.is_registered(b.id()).await);
    }

    #[tokio::test]
    async fn publish_skips_closed_queue_without_evicting() {
        let hub = Hub::new();
        let (a, _qa) = joined(&hub, 1).await;
        hub.subscribe(&a, "news").await;
        let _ = a.close().await;

        let report = hub.publish("news", text("x")).await;
        assert_eq!(report, FanOut::default());
    }
}
