//! # Systems
//!
//! A system is a unit of logic bound to one [`SystemGroup`]. It declares its
//! group and ordering constraints through [`SystemConfig`], and reads and
//! writes the world through a [`SystemContext`] for each run.
//!
//! ## Example
//!
//! ```rust,ignore
//! struct Gravity;
//!
//! impl System for Gravity {
//!     fn config(&self) -> SystemConfig {
//!         SystemConfig::new(SystemGroup::Simulation).after::<Integrate>()
//!     }
//!
//!     fn run(&mut self, ctx: &mut SystemContext<'_>) -> SystemResult {
//!         let dt = ctx.time.fixed_delta.as_secs_f32();
//!         ctx.world.write_each::<Velocity>(None, |_, v| v.y -= 9.81 * dt)?;
//!         Ok(())
//!     }
//! }
//! ```

use std::any::{type_name, Any, TypeId};
use std::ops::Deref;

use super::group::{FrameTime, SystemGroup};
use crate::ecs::{CommandBuffer, Component, Entity, Filter, World};
use crate::error::EcsResult;

/// Error type returned by system bodies.
pub type SystemError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by system bodies.
pub type SystemResult = Result<(), SystemError>;

/// Identifies a system type in ordering constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SystemId {
    type_id: TypeId,
    name: &'static str,
}

impl SystemId {
    /// Id of system type `T`.
    #[must_use]
    pub fn of<T: System>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Rust type id of the system.
    #[inline]
    #[must_use]
    pub const fn type_id(self) -> TypeId {
        self.type_id
    }

    /// Type name of the system.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

/// Group membership and ordering constraints of a system.
///
/// Constraints only apply between systems of the same group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemConfig {
    group: SystemGroup,
    before: Vec<SystemId>,
    after: Vec<SystemId>,
}

impl SystemConfig {
    /// A system in `group` with no constraints.
    #[must_use]
    pub const fn new(group: SystemGroup) -> Self {
        Self {
            group,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Runs this system before `T`.
    #[must_use]
    pub fn before<T: System>(mut self) -> Self {
        self.before.push(SystemId::of::<T>());
        self
    }

    /// Runs this system after `T`.
    #[must_use]
    pub fn after<T: System>(mut self) -> Self {
        self.after.push(SystemId::of::<T>());
        self
    }

    /// The group this system belongs to.
    #[inline]
    #[must_use]
    pub const fn group(&self) -> SystemGroup {
        self.group
    }

    /// Systems this one must precede.
    #[must_use]
    pub fn runs_before(&self) -> &[SystemId] {
        &self.before
    }

    /// Systems this one must follow.
    #[must_use]
    pub fn runs_after(&self) -> &[SystemId] {
        &self.after
    }
}

/// The enabled-flag capability.
pub trait Toggle {
    /// Whether the system runs.
    fn is_enabled(&self) -> bool;
    /// Enables or disables the system.
    fn set_enabled(&mut self, enabled: bool);
}

/// A ready-made enabled flag, on by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnabledFlag(bool);

impl Default for EnabledFlag {
    fn default() -> Self {
        Self(true)
    }
}

impl Toggle for EnabledFlag {
    fn is_enabled(&self) -> bool {
        self.0
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.0 = enabled;
    }
}

/// A unit of logic run by the scheduler.
pub trait System: Send + 'static {
    /// Group and ordering constraints. Read once when the system is added.
    fn config(&self) -> SystemConfig;

    /// Runs the system once.
    ///
    /// # Errors
    ///
    /// Any error is handed to the scheduler's failure reporting.
    fn run(&mut self, ctx: &mut SystemContext<'_>) -> SystemResult;

    /// Called once when the system becomes active.
    ///
    /// # Errors
    ///
    /// A failing system is reported and not added.
    fn initialize(&mut self, _world: &mut World) -> SystemResult {
        Ok(())
    }

    /// Called once when the system is removed or the scheduler shuts down.
    fn shutdown(&mut self, _world: &mut World) {}

    /// Name used in logs and errors.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// The enabled-flag capability, if the system has one.
    fn toggle(&mut self) -> Option<&mut dyn Toggle> {
        None
    }
}

/// Object-safe system with downcasting, stored by the scheduler.
pub trait SystemObject: System {
    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: System> SystemObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A boxed system.
pub type BoxedSystem = Box<dyn SystemObject>;

/// Boxes a system for [`Scheduler::request_add_range`](super::Scheduler::request_add_range).
#[must_use]
pub fn boxed<T: System>(system: T) -> BoxedSystem {
    Box::new(system)
}

/// World access for a running system.
///
/// Dereferences to [`World`] for reads. In-place value writes go through the
/// phase gate and hooks; structural changes go through
/// [`SystemContext::commands`].
pub struct WorldAccess<'a> {
    world: &'a mut World,
}

impl<'a> WorldAccess<'a> {
    pub(crate) fn new(world: &'a mut World) -> Self {
        Self { world }
    }

    /// See [`World::write`].
    ///
    /// # Errors
    ///
    /// As [`World::write`].
    pub fn write<C: Component>(&mut self, entity: Entity, update: impl FnOnce(&mut C)) -> EcsResult<bool> {
        self.world.write(entity, update)
    }

    /// See [`World::write_each`].
    ///
    /// # Errors
    ///
    /// As [`World::write_each`].
    pub fn write_each<C: Component>(
        &mut self,
        filter: Option<&Filter>,
        update: impl FnMut(Entity, &mut C),
    ) -> EcsResult<usize> {
        self.world.write_each(filter, update)
    }
}

impl Deref for WorldAccess<'_> {
    type Target = World;

    fn deref(&self) -> &World {
        self.world
    }
}

/// Everything a system sees during one run.
///
/// Fields are public so a system can iterate `world` while recording into
/// `commands`.
pub struct SystemContext<'a> {
    /// The world, read access plus gated value writes.
    pub world: WorldAccess<'a>,
    /// The group's command buffer, flushed when the group ends.
    pub commands: &'a mut CommandBuffer,
    /// Timing of the current call.
    pub time: FrameTime,
    /// The group being run.
    pub group: SystemGroup,
}
