use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::state::game::Match;

/// Identifier handed to each subscriber of the hub.
pub type SubscriberId = u64;

type Subscribers = HashMap<SubscriberId, mpsc::UnboundedSender<Match>>;

/// In-process publish/subscribe register keyed by game category.
///
/// Every subscriber owns an unbounded channel so publishing never waits on a
/// slow reader, and a reader that went away cannot stall delivery to the rest.
/// Fan-out stays inside this process: viewers served by another instance are
/// not reached.
#[derive(Clone, Default)]
pub struct MatchHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    categories: DashMap<String, Subscribers>,
    next_id: AtomicU64,
}

impl MatchHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber for `category`.
    pub fn subscribe(&self, category: &str) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();

        self.inner
            .categories
            .entry(category.to_owned())
            .or_default()
            .insert(id, sender.clone());
        debug!(category, subscriber = id, "hub subscriber registered");

        Subscription {
            id,
            category: category.to_owned(),
            sender,
            receiver,
            hub: self.clone(),
            active: true,
        }
    }

    /// Deliver `game` to every subscriber of `category`, returning how many
    /// subscribers received it.
    ///
    /// A subscription leaves the register before its receiver is dropped, so
    /// every registered sender still has a live receiver.
    pub fn publish(&self, category: &str, game: &Match) -> usize {
        let Some(subscribers) = self.inner.categories.get(category) else {
            return 0;
        };

        subscribers
            .values()
            .filter(|sender| sender.send(game.clone()).is_ok())
            .count()
    }

    /// Number of live subscribers for one category, or across all categories.
    pub fn subscriber_count(&self, category: Option<&str>) -> usize {
        match category {
            Some(category) => self
                .inner
                .categories
                .get(category)
                .map(|subscribers| subscribers.len())
                .unwrap_or(0),
            None => self
                .inner
                .categories
                .iter()
                .map(|entry| entry.value().len())
                .sum(),
        }
    }

    fn remove(&self, category: &str, id: SubscriberId) {
        let mut emptied = false;
        if let Some(mut subscribers) = self.inner.categories.get_mut(category) {
            subscribers.remove(&id);
            emptied = subscribers.is_empty();
        }

        if emptied {
            self.inner
                .categories
                .remove_if(category, |_, subscribers| subscribers.is_empty());
        }
    }
}

/// Handle held by a subscriber; unsubscribes when dropped.
pub struct Subscription {
    id: SubscriberId,
    category: String,
    sender: mpsc::UnboundedSender<Match>,
    receiver: mpsc::UnboundedReceiver<Match>,
    hub: MatchHub,
    active: bool,
}

impl Subscription {
    /// Identifier assigned by the hub.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Category this subscription listens to.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Queue a match for this subscriber only, ahead of later publishes.
    pub fn prime(&self, game: Match) {
        let _ = self.sender.send(game);
    }

    /// Wait for the next match update.
    pub async fn recv(&mut self) -> Option<Match> {
        self.receiver.recv().await
    }

    /// Take a pending update without waiting.
    pub fn try_recv(&mut self) -> Option<Match> {
        self.receiver.try_recv().ok()
    }

    /// Detach from the hub. Calling it again is a no-op.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.hub.remove(&self.category, self.id);
        debug!(
            category = %self.category,
            subscriber = self.id,
            "hub subscriber removed"
        );
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
