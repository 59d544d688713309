//! # Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! [kernel]
//! tick_rate = 60
//! max_sub_steps = 8
//! overflow_policy = "clamp"
//!
//! [world]
//! name = "arena"
//! write_failure_policy = "log"
//! removal_strictness = "lenient"
//!
//! [scheduler]
//! error_policy = "propagate"
//!
//! [scheduler.group_policies.sync]
//! deny_all_writes = true
//! structural_changes_allowed = false
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use cinder_core::{SchedulerConfig, WorldConfig};
use serde::{Deserialize, Serialize};

use crate::clock::OverflowPolicy;
use crate::error::ConfigError;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Frame-driver settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Fixed steps per second.
    pub tick_rate: u32,
    /// Most fixed steps run in one frame.
    pub max_sub_steps: u32,
    /// What happens to time still owed at the cap.
    pub overflow_policy: OverflowPolicy,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            max_sub_steps: 8,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl KernelConfig {
    /// Length of one fixed step. Zero if `tick_rate` is zero.
    #[must_use]
    pub fn fixed_delta(&self) -> Duration {
        match self.tick_rate {
            0 => Duration::ZERO,
            rate => Duration::from_nanos(NANOS_PER_SEC / u64::from(rate)),
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// `Invalid` if `tick_rate` or `max_sub_steps` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("kernel.tick_rate must be at least 1".into()));
        }
        if self.max_sub_steps == 0 {
            return Err(ConfigError::Invalid("kernel.max_sub_steps must be at least 1".into()));
        }
        Ok(())
    }
}

/// Complete runtime configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CinderConfig {
    /// Frame driver.
    pub kernel: KernelConfig,
    /// Default world.
    pub world: WorldConfig,
    /// Default scheduler.
    pub scheduler: SchedulerConfig,
}

impl CinderConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed TOML, `Invalid` for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.kernel.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
