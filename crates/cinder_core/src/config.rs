//! # Runtime Configuration
//!
//! Policies that decide how worlds and schedulers react to denied writes,
//! contract violations, and failing systems. Loaded once at startup; see
//! the `cinder` crate for the TOML entry point.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ecs::PhasePolicy;
use crate::schedule::SystemGroup;

/// What happens when a write is denied or violates a storage contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteFailurePolicy {
    /// Surface the failure as an `Err`.
    #[default]
    Throw,
    /// Emit a `tracing` warning and skip the write.
    Log,
    /// Skip the write without a trace.
    Ignore,
}

/// How removing an absent component is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalStrictness {
    /// Removing an absent component is a `ComponentMissing` failure.
    Strict,
    /// Removing an absent component is a no-op.
    #[default]
    Lenient,
}

/// Per-world configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Name used in logs.
    pub name: String,
    /// Reaction to denied writes and contract violations.
    pub write_failure_policy: WriteFailurePolicy,
    /// Reaction to removing absent components.
    pub removal_strictness: RemovalStrictness,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: "world".to_owned(),
            write_failure_policy: WriteFailurePolicy::default(),
            removal_strictness: RemovalStrictness::default(),
        }
    }
}

/// What the scheduler does when a system returns an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemErrorPolicy {
    /// Report the failure and keep running the rest of the group.
    #[default]
    LogAndContinue,
    /// Report the failure, stop the group, and return the error.
    Propagate,
}

/// Scheduler configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Reaction to failing systems.
    pub error_policy: SystemErrorPolicy,
    /// Write-phase policies that replace a group's default.
    pub group_policies: BTreeMap<SystemGroup, PhasePolicy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorldConfig::default();
        assert_eq!(config.write_failure_policy, WriteFailurePolicy::Throw);
        assert_eq!(config.removal_strictness, RemovalStrictness::Lenient);
        assert_eq!(SchedulerConfig::default().error_policy, SystemErrorPolicy::LogAndContinue);
    }
}
