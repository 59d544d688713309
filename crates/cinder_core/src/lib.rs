//! # Cinder Core
//!
//! The world runtime behind the Cinder frame driver:
//! - Generational entities with deterministic FIFO recycling
//! - Dense per-type component stores and cacheable filters
//! - Deferred structural mutation through command buffers
//! - A write-phase gate plus per-world permission and validation hooks
//! - A scheduler that runs systems group by group in a resolved order
//!
//! ## Architecture Rules
//!
//! 1. **Structure changes only at flush points** - systems record, the scheduler applies
//! 2. **One world, one thread of control** - no locking on the hot path
//! 3. **Order is resolved once** - ticks walk precomputed lists
//!
//! ## Example
//!
//! ```rust,ignore
//! use cinder_core::{Scheduler, SystemGroup, World, FrameTime};
//!
//! let mut world = World::new();
//! let mut scheduler = Scheduler::new();
//! scheduler.request_add(Movement::default());
//! scheduler.apply_pending(&mut world)?;
//! scheduler.run_group(&mut world, SystemGroup::Simulation, FrameTime::default())?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod schedule;

pub use config::{RemovalStrictness, SchedulerConfig, SystemErrorPolicy, WorldConfig, WriteFailurePolicy};
pub use ecs::{
    ChangeKind, ChangeReceiver, CommandBuffer, Component, ComponentChange, ComponentKey, ComponentSet,
    ComponentStorage, Entities, Entity, EntityReserver, Filter, FilterBuilder, FlushReport, HookId, Hooks,
    MigrationRegistry, PhasePolicy, PhaseState, QueryData, QueryIter, World, WritePhase,
};
pub use error::{CommandFailure, DenyReason, EcsError, EcsResult, ScheduleError, ScheduleResult};
pub use schedule::{
    boxed, BoxedSystem, EnabledFlag, FailureReporter, FrameStage, FrameTime, Scheduler, System, SystemConfig,
    SystemContext, SystemError, SystemFailure, SystemGroup, SystemId, SystemInfo, SystemObject, SystemResult,
    Toggle, WorldAccess,
};
