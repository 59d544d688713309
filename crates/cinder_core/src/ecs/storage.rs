//! # Component Storage
//!
//! Dense, sparse-set storage with one store per component type.
//!
//! The storage uses a packed array strategy:
//! - Values are packed contiguously, alongside the entity owning each value
//! - A sparse table maps entity index to packed position, giving O(1) access
//! - Removal swaps the last value into the hole, keeping the array dense

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::component::{Component, ComponentKey};
use super::entity::Entity;
use crate::error::{EcsError, EcsResult};

/// Storage for a single component type.
///
/// # Type Parameters
///
/// * `C` - The component type to store
///
/// # Example
///
/// ```rust,ignore
/// let mut storage: ComponentStorage<Position> = ComponentStorage::new();
/// storage.add(entity, Position::new(1.0, 2.0, 3.0))?;
/// ```
#[derive(Debug)]
pub struct ComponentStorage<C: Component> {
    /// Packed component values.
    dense: Vec<C>,
    /// Owner of each packed value, same order as `dense`.
    owners: Vec<Entity>,
    /// Entity index to packed position.
    sparse: Vec<Option<u32>>,
}

impl<C: Component> Default for ComponentStorage<C> {
    fn default() -> Self {
        Self {
            dense: Vec::new(),
            owners: Vec::new(),
            sparse: Vec::new(),
        }
    }
}

impl<C: Component> ComponentStorage<C> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn position(&self, entity: Entity) -> Option<usize> {
        let pos = (*self.sparse.get(entity.index() as usize)?)? as usize;
        (self.owners[pos] == entity).then_some(pos)
    }

    /// Adds a component to an entity.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateComponent` if the entity already has one.
    pub fn add(&mut self, entity: Entity, value: C) -> EcsResult<()> {
        if self.contains(entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: ComponentKey::of::<C>(),
            });
        }

        let idx = entity.index() as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        self.sparse[idx] = Some(self.dense.len() as u32);
        self.dense.push(value);
        self.owners.push(entity);
        Ok(())
    }

    /// Replaces an existing component, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns `ComponentMissing` if the entity has no such component.
    pub fn replace(&mut self, entity: Entity, value: C) -> EcsResult<C> {
        match self.position(entity) {
            Some(pos) => Ok(std::mem::replace(&mut self.dense[pos], value)),
            None => Err(EcsError::ComponentMissing {
                entity,
                component: ComponentKey::of::<C>(),
            }),
        }
    }

    /// Removes a component, returning it if it was present.
    pub fn remove(&mut self, entity: Entity) -> Option<C> {
        let pos = self.position(entity)?;
        self.sparse[entity.index() as usize] = None;

        let value = self.dense.swap_remove(pos);
        self.owners.swap_remove(pos);

        // Re-point the value that was swapped into the hole.
        if let Some(moved) = self.owners.get(pos) {
            self.sparse[moved.index() as usize] = Some(pos as u32);
        }
        Some(value)
    }

    /// Gets a component.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&C> {
        self.position(entity).map(|pos| &self.dense[pos])
    }

    /// Gets a mutable component.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut C> {
        self.position(entity).map(|pos| &mut self.dense[pos])
    }

    /// Checks if the entity has this component.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.position(entity).is_some()
    }

    /// Returns the number of stored components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns `true` if no entity has this component.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Owners of the stored values, in packed order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.owners
    }

    /// Iterates over all components with their owners.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &C)> {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    /// Iterates mutably over all components with their owners.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut C)> {
        self.owners.iter().copied().zip(self.dense.iter_mut())
    }
}

/// Type-erased view of a [`ComponentStorage`].
///
/// Reserved for the untyped paths: entity teardown, boxed commands, and
/// enumeration for serialization. The typed path downcasts once and stays
/// monomorphic.
pub(crate) trait ErasedStorage: Send + Sync {
    fn key(&self) -> ComponentKey;
    fn contains(&self, entity: Entity) -> bool;
    fn entities(&self) -> &[Entity];
    fn remove_entity(&mut self, entity: Entity) -> bool;
    fn get_dyn(&self, entity: Entity) -> Option<&dyn Any>;
    fn add_boxed(&mut self, entity: Entity, value: Box<dyn Any + Send>) -> EcsResult<()>;
    fn replace_boxed(&mut self, entity: Entity, value: Box<dyn Any + Send>) -> EcsResult<()>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

fn unbox<C: Component>(value: Box<dyn Any + Send>) -> EcsResult<C> {
    value
        .downcast::<C>()
        .map(|boxed| *boxed)
        .map_err(|_| EcsError::TypeMismatch { expected: C::name() })
}

impl<C: Component> ErasedStorage for ComponentStorage<C> {
    fn key(&self) -> ComponentKey {
        ComponentKey::of::<C>()
    }

    fn contains(&self, entity: Entity) -> bool {
        ComponentStorage::contains(self, entity)
    }

    fn entities(&self) -> &[Entity] {
        &self.owners
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn get_dyn(&self, entity: Entity) -> Option<&dyn Any> {
        self.get(entity).map(|value| value as &dyn Any)
    }

    fn add_boxed(&mut self, entity: Entity, value: Box<dyn Any + Send>) -> EcsResult<()> {
        self.add(entity, unbox::<C>(value)?)
    }

    fn replace_boxed(&mut self, entity: Entity, value: Box<dyn Any + Send>) -> EcsResult<()> {
        self.replace(entity, unbox::<C>(value)?).map(drop)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// All component stores of one world, in registration order.
#[derive(Default)]
pub(crate) struct ComponentStores {
    stores: Vec<Box<dyn ErasedStorage>>,
    index: HashMap<TypeId, usize>,
}

impl ComponentStores {
    /// Registers `C`, creating its store if needed.
    pub fn register<C: Component>(&mut self) -> ComponentKey {
        let type_id = TypeId::of::<C>();
        if !self.index.contains_key(&type_id) {
            self.index.insert(type_id, self.stores.len());
            self.stores.push(Box::new(ComponentStorage::<C>::new()));
        }
        ComponentKey::of::<C>()
    }

    pub fn is_registered(&self, type_id: TypeId) -> bool {
        self.index.contains_key(&type_id)
    }

    pub fn get<C: Component>(&self) -> Option<&ComponentStorage<C>> {
        self.erased(TypeId::of::<C>())?
            .as_any()
            .downcast_ref::<ComponentStorage<C>>()
    }

    pub fn get_mut<C: Component>(&mut self) -> Option<&mut ComponentStorage<C>> {
        self.erased_mut(TypeId::of::<C>())?
            .as_any_mut()
            .downcast_mut::<ComponentStorage<C>>()
    }

    pub fn erased(&self, type_id: TypeId) -> Option<&dyn ErasedStorage> {
        self.index.get(&type_id).map(|&pos| self.stores[pos].as_ref())
    }

    pub fn erased_mut(&mut self, type_id: TypeId) -> Option<&mut (dyn ErasedStorage + 'static)> {
        let pos = *self.index.get(&type_id)?;
        Some(self.stores[pos].as_mut())
    }

    pub fn contains(&self, entity: Entity, type_id: TypeId) -> bool {
        self.erased(type_id).is_some_and(|store| store.contains(entity))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ErasedStorage> {
        self.stores.iter().map(|store| store.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn ErasedStorage + 'static)> {
        self.stores.iter_mut().map(|store| store.as_mut())
    }
}
