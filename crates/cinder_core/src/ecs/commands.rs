//! # Command Buffer
//!
//! The only way to change the structure of a world.
//!
//! ## Lifecycle
//!
//! ```text
//!   World::command_buffer()  ──►  record (create/destroy/add/replace/remove)
//!                                        │
//!                                        ▼
//!                     World::flush(buffer)  or  World::submit(buffer)
//!                     applied in recorded order, buffer consumed
//! ```
//!
//! Flushing takes the buffer by value, so a buffer cannot be flushed twice
//! or recorded into after its flush. A buffer dropped with commands still in
//! it is reported and its reserved entities are released.

use std::any::Any;

use super::component::{Component, ComponentKey};
use super::entity::{Entity, EntityReserver};
use super::storage::ComponentStores;

/// Creates the store for a typed value on first use at flush.
pub(crate) type RegisterFn = fn(&mut ComponentStores) -> ComponentKey;

/// A type-erased component value travelling through a buffer.
pub(crate) struct BoxedValue {
    pub key: ComponentKey,
    pub value: Box<dyn Any + Send>,
    /// `None` for values recorded through the untyped path; those require
    /// the type to be registered already.
    pub register: Option<RegisterFn>,
}

impl BoxedValue {
    fn typed<C: Component>(value: C) -> Self {
        Self {
            key: ComponentKey::of::<C>(),
            value: Box::new(value),
            register: Some(ComponentStores::register::<C>),
        }
    }
}

/// One recorded structural operation.
pub(crate) enum Command {
    CreateEntity(Entity),
    DestroyEntity(Entity),
    AddComponent(Entity, BoxedValue),
    ReplaceComponent(Entity, BoxedValue),
    RemoveComponent(Entity, ComponentKey),
}

impl Command {
    /// Short name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateEntity(_) => "create_entity",
            Self::DestroyEntity(_) => "destroy_entity",
            Self::AddComponent(..) => "add_component",
            Self::ReplaceComponent(..) => "replace_component",
            Self::RemoveComponent(..) => "remove_component",
        }
    }
}

/// A scoped recording of structural operations against one world.
///
/// # Example
///
/// ```rust,ignore
/// let mut commands = world.command_buffer();
/// let spark = commands.create_entity();
/// commands.add(spark, Heat(800));
/// commands.replace(spark, Heat(900));
/// world.flush(commands)?;
/// assert_eq!(world.get::<Heat>(spark), Some(&Heat(900)));
/// ```
pub struct CommandBuffer {
    world_id: u32,
    reserver: EntityReserver,
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub(crate) fn new(world_id: u32, reserver: EntityReserver) -> Self {
        Self {
            world_id,
            reserver,
            commands: Vec::new(),
        }
    }

    /// Records the creation of an entity.
    ///
    /// The returned handle is final and may be used by later commands in this
    /// buffer, but the entity is not alive until the buffer is flushed.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.reserver.reserve();
        self.commands.push(Command::CreateEntity(entity));
        entity
    }

    /// Records the destruction of an entity. Destroying a dead entity is a no-op.
    pub fn destroy_entity(&mut self, entity: Entity) {
        self.commands.push(Command::DestroyEntity(entity));
    }

    /// Records adding a component. Fails at flush if already present.
    pub fn add<C: Component>(&mut self, entity: Entity, value: C) {
        self.commands
            .push(Command::AddComponent(entity, BoxedValue::typed(value)));
    }

    /// Records replacing a component. Fails at flush if absent.
    pub fn replace<C: Component>(&mut self, entity: Entity, value: C) {
        self.commands
            .push(Command::ReplaceComponent(entity, BoxedValue::typed(value)));
    }

    /// Records removing a component.
    pub fn remove<C: Component>(&mut self, entity: Entity) {
        self.remove_key(entity, ComponentKey::of::<C>());
    }

    /// Records adding a type-erased component.
    ///
    /// The type behind `key` must be registered on the world by the time the
    /// buffer is flushed, and `value` must be of that type.
    pub fn add_boxed(&mut self, entity: Entity, key: ComponentKey, value: Box<dyn Any + Send>) {
        let value = BoxedValue {
            key,
            value,
            register: None,
        };
        self.commands.push(Command::AddComponent(entity, value));
    }

    /// Records replacing a type-erased component.
    pub fn replace_boxed(&mut self, entity: Entity, key: ComponentKey, value: Box<dyn Any + Send>) {
        let value = BoxedValue {
            key,
            value,
            register: None,
        };
        self.commands.push(Command::ReplaceComponent(entity, value));
    }

    /// Records removing a component by runtime key.
    pub fn remove_key(&mut self, entity: Entity, key: ComponentKey) {
        self.commands.push(Command::RemoveComponent(entity, key));
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Id of the world that issued this buffer.
    #[must_use]
    pub const fn world_id(&self) -> u32 {
        self.world_id
    }

    pub(crate) fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        if self.commands.is_empty() {
            return;
        }

        tracing::error!(
            world = self.world_id,
            commands = self.commands.len(),
            "command buffer dropped without being flushed"
        );
        for command in &self.commands {
            if let Command::CreateEntity(entity) = command {
                self.reserver.release(*entity);
            }
        }
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<&'static str> = self.commands.iter().map(Command::label).collect();
        f.debug_struct("CommandBuffer")
            .field("world_id", &self.world_id)
            .field("commands", &labels)
            .finish()
    }
}
