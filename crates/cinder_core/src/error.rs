//! # Core Error Types
//!
//! All errors that can occur in the world runtime and the scheduler.

use thiserror::Error;

use crate::ecs::{ComponentKey, Entity, WritePhase};
use crate::schedule::SystemGroup;

/// Errors raised by entity, component, and command-buffer operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The entity already carries a component of this type.
    #[error("entity {entity} already has component {component}")]
    DuplicateComponent {
        /// Target entity.
        entity: Entity,
        /// Component type that was already present.
        component: ComponentKey,
    },

    /// The entity does not carry a component of this type.
    #[error("entity {entity} has no component {component}")]
    ComponentMissing {
        /// Target entity.
        entity: Entity,
        /// Component type that was absent.
        component: ComponentKey,
    },

    /// The handle is stale or was never materialized.
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    /// An untyped path referenced a component type the world never registered.
    #[error("component type {0} is not registered")]
    UnregisteredComponent(&'static str),

    /// A boxed value did not match the component type it was recorded under.
    #[error("boxed value is not a {expected}")]
    TypeMismatch {
        /// The component type that was expected.
        expected: &'static str,
    },

    /// The write-phase policy or a permission hook rejected the write.
    #[error("write denied on entity {entity}: {reason}")]
    WriteDenied {
        /// Target entity.
        entity: Entity,
        /// Which gate rejected it.
        reason: DenyReason,
    },

    /// A registered validator rejected the value.
    #[error("value for {component} on entity {entity} rejected by validator")]
    ValidationFailed {
        /// Target entity.
        entity: Entity,
        /// Component type being written.
        component: ComponentKey,
    },

    /// A bulk write was attempted while the phase denies all writes.
    #[error("phase {0:?} denies value writes")]
    PhaseDenied(WritePhase),

    /// A command buffer was flushed into a world that did not issue it.
    #[error("command buffer belongs to world {buffer_world}, flushed into world {target_world}")]
    ForeignCommandBuffer {
        /// World that issued the buffer.
        buffer_world: u32,
        /// World the flush targeted.
        target_world: u32,
    },

    /// One or more entries of a flush failed under the `Throw` policy.
    ///
    /// Entries that succeeded stay applied.
    #[error("{} command(s) failed during flush; first: {}", .0.len(), first_failure(.0))]
    FlushFailed(Vec<CommandFailure>),
}

fn first_failure(failures: &[CommandFailure]) -> String {
    failures
        .first()
        .map_or_else(String::new, |failure| failure.error.to_string())
}

/// Which gate denied a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The active phase denies every write.
    PhaseDeniesWrites,
    /// The active phase denies structural changes.
    PhaseDeniesStructural,
    /// A registered write-permission predicate returned `false`.
    Permission,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::PhaseDeniesWrites => "phase denies all writes",
            Self::PhaseDeniesStructural => "phase denies structural changes",
            Self::Permission => "permission hook",
        };
        f.write_str(text)
    }
}

/// A single rejected command from a flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// Position of the command in its buffer.
    pub position: usize,
    /// Why it was rejected.
    pub error: EcsError,
}

/// Result type for world operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors raised while building or running the schedule.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Ordering constraints inside a group form a cycle.
    #[error("ordering cycle in group {group:?} between {systems:?}")]
    OrderingCycle {
        /// Group whose constraints are cyclic.
        group: SystemGroup,
        /// Systems that could not be ordered.
        systems: Vec<&'static str>,
    },

    /// A system of the same type is already scheduled or pending.
    #[error("system {0} is already scheduled")]
    DuplicateSystem(&'static str),

    /// No system of the requested type is scheduled.
    #[error("system {0} is not scheduled")]
    SystemNotFound(&'static str),

    /// The system does not expose an enabled flag.
    #[error("system {0} cannot be enabled or disabled")]
    NotToggleable(&'static str),

    /// A system body returned an error under the `Propagate` policy.
    #[error("system {system} failed in group {group:?}: {message}")]
    SystemFailed {
        /// Failing system.
        system: &'static str,
        /// Group it was running in.
        group: SystemGroup,
        /// Rendered error.
        message: String,
    },

    /// A flush at a group boundary failed under the `Throw` policy.
    #[error(transparent)]
    Ecs(#[from] EcsError),
}

/// Result type for scheduler operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;
