//! # Kernel Error Types

use std::path::PathBuf;

use cinder_core::ScheduleError;
use thiserror::Error;

/// Errors raised while driving frames.
#[derive(Error, Debug)]
pub enum KernelError {
    /// A fixed step of zero length was requested.
    #[error("fixed delta must be greater than zero")]
    InvalidFixedDelta,

    /// A frame was pumped with a sub-step cap of zero.
    #[error("max sub-steps must be at least 1")]
    InvalidSubStepCap,

    /// The handle does not name a world owned by this kernel.
    #[error("no world with id {0}")]
    UnknownWorld(u32),

    /// A scheduler build or group run failed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML was malformed or had the wrong shape.
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parsed but are out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}
