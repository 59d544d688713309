//! # Cinder
//!
//! Fixed-timestep frame driver over phase-gated ECS worlds.
//!
//! The host calls one of:
//! - [`Kernel::run_frame`] with its frame delta, using the configured tick rate
//! - [`Kernel::begin_frame`] then [`Kernel::pump_and_late_frame`] with its own step size
//!
//! and the kernel runs every owned world's groups in pipeline order.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cinder::{CinderConfig, Kernel};
//!
//! let config = CinderConfig::load("config/cinder.toml")?;
//! let (mut kernel, world) = Kernel::from_config(&config);
//! kernel.scheduler_mut(world)?.request_add(Movement::default());
//!
//! loop {
//!     let report = kernel.run_frame(host_delta())?;
//!     render(kernel.world(world)?, report.alpha);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod error;
pub mod kernel;

pub use clock::{FixedClock, OverflowPolicy};
pub use config::{CinderConfig, KernelConfig};
pub use error::{ConfigError, KernelError, KernelResult};
pub use kernel::{FrameReport, Kernel, WorldHandle};

pub use cinder_core::*;
