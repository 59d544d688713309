//! # Permission & Validation Hooks
//!
//! Fine-grained predicates consulted on top of the write-phase policy.
//!
//! - Write/read permission predicates see `(world, entity, component)`.
//! - Typed validators see the candidate value of one component type.
//! - Boxed validators see every candidate value, type-erased.
//!
//! Evaluation is a logical AND; the first failing predicate denies. Order
//! among predicates of the same kind is unspecified, so predicates must be
//! free of side effects.
//!
//! Hooks belong to one world. Nothing here is process-global.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::component::{Component, ComponentKey};
use super::entity::Entity;
use super::world::World;

/// Identifies a registered hook so it can be removed again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HookId(u64);

type PermissionFn = dyn Fn(&World, Entity, ComponentKey) -> bool + Send + Sync;
type ValueCheckFn = dyn Fn(&dyn Any) -> bool + Send + Sync;
type BoxedCheckFn = dyn Fn(ComponentKey, &dyn Any) -> bool + Send + Sync;

/// The hook registry of one world.
#[derive(Default)]
pub struct Hooks {
    write: Vec<(HookId, Box<PermissionFn>)>,
    read: Vec<(HookId, Box<PermissionFn>)>,
    validators: HashMap<TypeId, Vec<(HookId, Box<ValueCheckFn>)>>,
    boxed_validators: Vec<(HookId, Box<BoxedCheckFn>)>,
    next_id: u64,
}

impl Hooks {
    fn next_id(&mut self) -> HookId {
        self.next_id += 1;
        HookId(self.next_id)
    }

    /// Registers a predicate that must hold for any write to go through.
    pub fn add_write_permission<F>(&mut self, predicate: F) -> HookId
    where
        F: Fn(&World, Entity, ComponentKey) -> bool + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.write.push((id, Box::new(predicate)));
        id
    }

    /// Registers a predicate that must hold for checked reads.
    pub fn add_read_permission<F>(&mut self, predicate: F) -> HookId
    where
        F: Fn(&World, Entity, ComponentKey) -> bool + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.read.push((id, Box::new(predicate)));
        id
    }

    /// Registers a validator for values of component `C`.
    pub fn add_validator<C, F>(&mut self, validator: F) -> HookId
    where
        C: Component,
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        let id = self.next_id();
        let erased = move |value: &dyn Any| value.downcast_ref::<C>().map_or(true, &validator);
        self.validators
            .entry(TypeId::of::<C>())
            .or_default()
            .push((id, Box::new(erased)));
        id
    }

    /// Registers a validator that sees every value, type-erased.
    pub fn add_boxed_validator<F>(&mut self, validator: F) -> HookId
    where
        F: Fn(ComponentKey, &dyn Any) -> bool + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.boxed_validators.push((id, Box::new(validator)));
        id
    }

    /// Removes a hook of any kind. Returns `false` if it was not registered.
    pub fn remove(&mut self, id: HookId) -> bool {
        let before = self.len();
        self.write.retain(|(hook, _)| *hook != id);
        self.read.retain(|(hook, _)| *hook != id);
        self.boxed_validators.retain(|(hook, _)| *hook != id);
        for list in self.validators.values_mut() {
            list.retain(|(hook, _)| *hook != id);
        }
        self.validators.retain(|_, list| !list.is_empty());
        self.len() != before
    }

    /// Removes all read and write permission predicates.
    pub fn clear_permissions(&mut self) {
        self.write.clear();
        self.read.clear();
    }

    /// Removes all typed and boxed validators.
    pub fn clear_validators(&mut self) {
        self.validators.clear();
        self.boxed_validators.clear();
    }

    /// Removes every hook.
    pub fn clear(&mut self) {
        self.clear_permissions();
        self.clear_validators();
    }

    /// Total number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.write.len()
            + self.read.len()
            + self.boxed_validators.len()
            + self.validators.values().map(Vec::len).sum::<usize>()
    }

    /// Returns `true` if no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn can_write(&self, world: &World, entity: Entity, key: ComponentKey) -> bool {
        self.write.iter().all(|(_, check)| check(world, entity, key))
    }

    pub(crate) fn can_read(&self, world: &World, entity: Entity, key: ComponentKey) -> bool {
        self.read.iter().all(|(_, check)| check(world, entity, key))
    }

    pub(crate) fn has_write_permissions(&self) -> bool {
        !self.write.is_empty()
    }

    pub(crate) fn has_validators_for(&self, key: ComponentKey) -> bool {
        !self.boxed_validators.is_empty() || self.validators.contains_key(&key.type_id())
    }

    pub(crate) fn validate(&self, key: ComponentKey, value: &dyn Any) -> bool {
        let typed_ok = self
            .validators
            .get(&key.type_id())
            .map_or(true, |list| list.iter().all(|(_, check)| check(value)));
        typed_ok && self.boxed_validators.iter().all(|(_, check)| check(key, value))
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("write", &self.write.len())
            .field("read", &self.read.len())
            .field("validators", &self.validators.len())
            .field("boxed_validators", &self.boxed_validators.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Health(i32);
    impl Component for Health {}

    #[derive(Clone)]
    struct Name(&'static str);
    impl Component for Name {}

    #[test]
    fn test_typed_validator_only_sees_its_type() {
        let mut hooks = Hooks::default();
        hooks.add_validator::<Health, _>(|health| health.0 >= 0);

        let health = ComponentKey::of::<Health>();
        assert!(hooks.validate(health, &Health(5)));
        assert!(!hooks.validate(health, &Health(-1)));
        assert!(hooks.validate(ComponentKey::of::<Name>(), &Name("x")));
    }

    #[test]
    fn test_boxed_validator_sees_everything() {
        let mut hooks = Hooks::default();
        hooks.add_boxed_validator(|_, value| value.downcast_ref::<Name>().map_or(true, |n| !n.0.is_empty()));

        assert!(hooks.validate(ComponentKey::of::<Name>(), &Name("ok")));
        assert!(!hooks.validate(ComponentKey::of::<Name>(), &Name("")));
        assert!(hooks.validate(ComponentKey::of::<Health>(), &Health(-3)));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut hooks = Hooks::default();
        let a = hooks.add_validator::<Health, _>(|_| false);
        let b = hooks.add_write_permission(|_, _, _| false);
        assert_eq!(hooks.len(), 2);

        assert!(hooks.remove(a));
        assert!(!hooks.remove(a));
        assert!(hooks.validate(ComponentKey::of::<Health>(), &Health(1)));
        assert_eq!(hooks.len(), 1);

        hooks.add_read_permission(|_, _, _| true);
        hooks.clear_permissions();
        assert!(hooks.is_empty());
        assert!(!hooks.remove(b));
    }
}
