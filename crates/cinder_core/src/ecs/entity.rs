//! # Entity Management
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into component stores
//! - A generation counter for safe reuse
//!
//! Freed indices are recycled first-in first-out, so the same sequence of
//! create/destroy operations always yields the same identities.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Unique identifier for an entity.
///
/// A handle is alive only while its generation matches the generation the
/// world currently holds for its index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Creates an entity handle from its raw parts.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Per-index liveness record.
#[derive(Clone, Copy, Debug, Default)]
struct EntitySlot {
    generation: u32,
    alive: bool,
}

/// Indices available for reuse, each paired with the generation it will be
/// handed out with next.
#[derive(Debug, Default)]
struct FreeList {
    recycled: VecDeque<(u32, u32)>,
    next_index: u32,
}

impl FreeList {
    fn reserve(&mut self) -> Entity {
        if let Some((index, generation)) = self.recycled.pop_front() {
            return Entity::new(index, generation);
        }
        let index = self.next_index;
        self.next_index += 1;
        Entity::new(index, 0)
    }
}

/// Hands out entity identities without mutable access to the world.
///
/// Command buffers hold one of these so `create_entity` can return a usable
/// handle immediately while the entity itself only comes alive at flush.
#[derive(Clone, Debug)]
pub struct EntityReserver {
    free: Arc<Mutex<FreeList>>,
}

impl EntityReserver {
    /// Reserves the next identity. It stays dead until materialized.
    #[must_use]
    pub fn reserve(&self) -> Entity {
        self.free.lock().reserve()
    }

    /// Returns a reserved identity that will never be materialized.
    ///
    /// The index is reused next, under a bumped generation, so any copy of the
    /// abandoned handle stays dead.
    pub fn release(&self, entity: Entity) {
        self.free
            .lock()
            .recycled
            .push_front((entity.index, entity.generation.wrapping_add(1)));
    }
}

/// The entity identity table of one world.
#[derive(Debug, Default)]
pub struct Entities {
    slots: Vec<EntitySlot>,
    free: Arc<Mutex<FreeList>>,
    alive_count: usize,
}

impl Entities {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reservation handle sharing this table's free list.
    #[must_use]
    pub fn reserver(&self) -> EntityReserver {
        EntityReserver {
            free: Arc::clone(&self.free),
        }
    }

    /// Allocates and immediately materializes a fresh or recycled entity.
    #[cfg(test)]
    pub(crate) fn create(&mut self) -> Entity {
        let entity = self.free.lock().reserve();
        self.materialize(entity);
        entity
    }

    /// Brings a reserved identity to life.
    ///
    /// Returns `false` if the slot is already occupied by a live entity.
    pub(crate) fn materialize(&mut self, entity: Entity) -> bool {
        let idx = entity.index as usize;
        if idx >= self.slots.len() {
            self.slots.resize(idx + 1, EntitySlot::default());
        }

        let slot = &mut self.slots[idx];
        if slot.alive {
            return false;
        }

        slot.generation = entity.generation;
        slot.alive = true;
        self.alive_count += 1;
        true
    }

    /// Invalidates a live entity and queues its index for reuse.
    ///
    /// Returns `false` for dead or stale handles, which is not an error.
    pub(crate) fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let slot = &mut self.slots[entity.index as usize];
        slot.alive = false;
        self.alive_count -= 1;

        self.free
            .lock()
            .recycled
            .push_back((entity.index, slot.generation.wrapping_add(1)));
        true
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation)
    }

    /// Returns the number of live entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Iterates over all live entities in index order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.alive
                .then(|| Entity::new(idx as u32, slot.generation))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_create_destroy() {
        let mut entities = Entities::new();

        let a = entities.create();
        let b = entities.create();
        assert!(entities.is_alive(a));
        assert!(entities.is_alive(b));
        assert_eq!(entities.alive_count(), 2);

        assert!(entities.destroy(a));
        assert!(!entities.is_alive(a));
        assert_eq!(entities.alive_count(), 1);

        // Spawn again - should reuse the slot
        let c = entities.create();
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert!(!entities.is_alive(a));
        assert!(entities.is_alive(c));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut entities = Entities::new();
        let a = entities.create();
        assert!(entities.destroy(a));
        assert!(!entities.destroy(a));

        let b = entities.create();
        assert!(!entities.destroy(a));
        assert!(entities.is_alive(b));
    }

    #[test]
    fn test_recycling_is_fifo() {
        let mut entities = Entities::new();
        let handles: Vec<Entity> = (0..4).map(|_| entities.create()).collect();

        entities.destroy(handles[2]);
        entities.destroy(handles[0]);

        assert_eq!(entities.create().index(), 2);
        assert_eq!(entities.create().index(), 0);
        assert_eq!(entities.create().index(), 4);
    }

    #[test]
    fn test_reserved_entity_is_dead_until_materialized() {
        let mut entities = Entities::new();
        let reserver = entities.reserver();

        let reserved = reserver.reserve();
        assert!(!entities.is_alive(reserved));

        assert!(entities.materialize(reserved));
        assert!(entities.is_alive(reserved));
        assert!(!entities.materialize(reserved));
    }

    #[test]
    fn test_released_reservation_stays_dead() {
        let mut entities = Entities::new();
        let reserver = entities.reserver();

        let abandoned = reserver.reserve();
        reserver.release(abandoned);

        let next = entities.create();
        assert_eq!(next.index(), abandoned.index());
        assert_ne!(next.generation(), abandoned.generation());
        assert!(!entities.is_alive(abandoned));
    }

    fn run_sequence(seed: u64) -> Vec<Entity> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut entities = Entities::new();
        let mut live = Vec::new();
        let mut issued = Vec::new();

        for _ in 0..2_000 {
            if live.is_empty() || rng.gen_bool(0.6) {
                let entity = entities.create();
                live.push(entity);
                issued.push(entity);
            } else {
                let victim = live.swap_remove(rng.gen_range(0..live.len()));
                entities.destroy(victim);
                assert!(!entities.is_alive(victim));
            }
        }

        for entity in &issued {
            assert_eq!(entities.is_alive(*entity), live.contains(entity));
        }
        issued
    }

    #[test]
    fn test_random_sequences_are_deterministic() {
        assert_eq!(run_sequence(7), run_sequence(7));
    }
}
