//! # Entity Component System
//!
//! The world runtime: entities, component stores, filters, and the command
//! buffers through which every structural change flows.
//!
//! ## Design Philosophy
//!
//! - Structural changes are recorded, then applied at flush points
//! - Components live in dense per-type stores keyed by entity index
//! - Entity IDs are indices with generation counters, recycled FIFO
//! - Typed paths stay monomorphic; erased paths are for tooling

mod commands;
mod component;
mod entity;
mod events;
mod filter;
mod hooks;
mod migration;
mod phase;
mod query;
mod storage;
mod world;

pub use commands::CommandBuffer;
pub use component::{Component, ComponentKey, ComponentSet};
pub use entity::{Entities, Entity, EntityReserver};
pub use events::{ChangeKind, ChangeReceiver, ComponentChange};
pub use filter::{Filter, FilterBuilder};
pub use hooks::{HookId, Hooks};
pub use migration::MigrationRegistry;
pub use phase::{PhasePolicy, PhaseState, WritePhase};
pub use query::{QueryData, QueryIter};
pub use storage::ComponentStorage;
pub use world::{FlushReport, World};
