//! # Scheduling
//!
//! Systems, the groups they run in, and the scheduler that orders and runs
//! them.

mod group;
mod order;
mod report;
mod scheduler;
mod system;

pub use group::{FrameStage, FrameTime, SystemGroup};
pub use report::{FailureReporter, SystemFailure};
pub use scheduler::{Scheduler, SystemInfo};
pub use system::{
    boxed, BoxedSystem, EnabledFlag, System, SystemConfig, SystemContext, SystemError, SystemId,
    SystemObject, SystemResult, Toggle, WorldAccess,
};
