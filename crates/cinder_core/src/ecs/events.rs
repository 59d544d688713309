//! # Component Change Stream
//!
//! Per-component-type notifications for presentation layers.
//!
//! Events are sent only after a write has been committed to storage, never
//! while a command is still being applied. Uses crossbeam channels so a
//! subscriber can drain on its own schedule.

use std::any::TypeId;
use std::collections::HashMap;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::component::ComponentKey;
use super::entity::Entity;

/// What happened to a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The component was added.
    Added,
    /// The component's value was replaced or written in place.
    Changed,
    /// The component was removed, or its entity destroyed.
    Removed,
    /// Current state, sent on request to bring a subscriber up to date.
    Snapshot,
}

/// One committed change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentChange {
    /// Entity that changed.
    pub entity: Entity,
    /// Component type that changed.
    pub component: ComponentKey,
    /// Kind of change.
    pub kind: ChangeKind,
}

/// Receiving end of a subscription.
pub type ChangeReceiver = Receiver<ComponentChange>;

/// Fan-out of committed changes to subscribers, keyed by component type.
#[derive(Debug, Default)]
pub(crate) struct ChangeFeed {
    subscribers: HashMap<TypeId, Vec<Sender<ComponentChange>>>,
}

impl ChangeFeed {
    pub fn subscribe(&mut self, key: ComponentKey) -> ChangeReceiver {
        let (tx, rx) = unbounded();
        self.subscribers.entry(key.type_id()).or_default().push(tx);
        rx
    }

    #[inline]
    pub fn is_watched(&self, key: ComponentKey) -> bool {
        self.subscribers.contains_key(&key.type_id())
    }

    /// Sends to every live subscriber of `key` and prunes disconnected ones.
    pub fn emit(&mut self, entity: Entity, key: ComponentKey, kind: ChangeKind) {
        let Some(senders) = self.subscribers.get_mut(&key.type_id()) else {
            return;
        };

        let change = ComponentChange {
            entity,
            component: key,
            kind,
        };
        senders.retain(|tx| tx.send(change).is_ok());

        if senders.is_empty() {
            self.subscribers.remove(&key.type_id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Component;

    #[derive(Clone)]
    struct Glow;
    impl Component for Glow {}

    #[test]
    fn test_emit_reaches_all_subscribers() {
        let mut feed = ChangeFeed::default();
        let key = ComponentKey::of::<Glow>();
        let first = feed.subscribe(key);
        let second = feed.subscribe(key);

        feed.emit(Entity::new(1, 0), key, ChangeKind::Added);

        for rx in [first, second] {
            let change = rx.try_recv().unwrap();
            assert_eq!(change.kind, ChangeKind::Added);
            assert_eq!(change.entity, Entity::new(1, 0));
        }
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut feed = ChangeFeed::default();
        let key = ComponentKey::of::<Glow>();
        drop(feed.subscribe(key));
        assert!(feed.is_watched(key));

        feed.emit(Entity::new(0, 0), key, ChangeKind::Changed);
        assert!(!feed.is_watched(key));
    }
}
