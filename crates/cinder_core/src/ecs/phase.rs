//! # Write-Phase Policy
//!
//! A coarse gate on what may be written during each logical phase of a frame.
//!
//! ```text
//!   None ──► FrameInput ──► Simulation ──► FrameSync ──► FrameView ──► FrameUI
//!    ▲           │               │              │             │           │
//!    └───────────┴───────────────┴──────────────┴─────────────┴───────────┘
//!                    reset to None between groups
//! ```
//!
//! Only the scheduler moves the world between phases. Fine-grained
//! per-entity rules live in the permission hooks and are ANDed on top.

use serde::{Deserialize, Serialize};

/// Logical phase of the frame the world is currently in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WritePhase {
    /// Outside any group. Permissive.
    #[default]
    None,
    /// Fixed-timestep simulation groups.
    Simulation,
    /// Variable-timestep input gathering at the start of a frame.
    FrameInput,
    /// Copying simulation results toward presentation.
    FrameSync,
    /// Presentation reads.
    FrameView,
    /// UI reads.
    FrameUI,
}

/// The two independent switches a phase carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PhasePolicy {
    /// Rejects every write, value or structural.
    pub deny_all_writes: bool,
    /// Allows create/destroy/add/remove. Replace is a value write.
    pub structural_changes_allowed: bool,
}

impl Default for PhasePolicy {
    fn default() -> Self {
        Self::PERMISSIVE
    }
}

impl PhasePolicy {
    /// Everything allowed.
    pub const PERMISSIVE: Self = Self {
        deny_all_writes: false,
        structural_changes_allowed: true,
    };

    /// Value writes allowed, structural changes denied.
    pub const VALUES_ONLY: Self = Self {
        deny_all_writes: false,
        structural_changes_allowed: false,
    };

    /// Nothing may be written.
    pub const READ_ONLY: Self = Self {
        deny_all_writes: true,
        structural_changes_allowed: false,
    };

    /// `true` if in-place value writes are allowed.
    #[inline]
    #[must_use]
    pub const fn can_value_write(self) -> bool {
        !self.deny_all_writes
    }

    /// `true` if structural changes are allowed.
    #[inline]
    #[must_use]
    pub const fn can_structural_write(self) -> bool {
        !self.deny_all_writes && self.structural_changes_allowed
    }
}

/// The phase a world is in together with the policy in force.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseState {
    phase: WritePhase,
    policy: PhasePolicy,
}

impl PhaseState {
    /// Returns the current phase.
    #[inline]
    #[must_use]
    pub const fn phase(self) -> WritePhase {
        self.phase
    }

    /// Returns the policy in force.
    #[inline]
    #[must_use]
    pub const fn policy(self) -> PhasePolicy {
        self.policy
    }

    /// See [`PhasePolicy::can_value_write`].
    #[inline]
    #[must_use]
    pub const fn can_value_write(self) -> bool {
        self.policy.can_value_write()
    }

    /// See [`PhasePolicy::can_structural_write`].
    #[inline]
    #[must_use]
    pub const fn can_structural_write(self) -> bool {
        self.policy.can_structural_write()
    }

    pub(crate) fn enter(&mut self, phase: WritePhase, policy: PhasePolicy) {
        self.phase = phase;
        self.policy = policy;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_matrix() {
        assert!(PhasePolicy::PERMISSIVE.can_value_write());
        assert!(PhasePolicy::PERMISSIVE.can_structural_write());

        assert!(PhasePolicy::VALUES_ONLY.can_value_write());
        assert!(!PhasePolicy::VALUES_ONLY.can_structural_write());

        assert!(!PhasePolicy::READ_ONLY.can_value_write());
        assert!(!PhasePolicy::READ_ONLY.can_structural_write());

        // deny_all_writes wins over structural_changes_allowed.
        let odd = PhasePolicy {
            deny_all_writes: true,
            structural_changes_allowed: true,
        };
        assert!(!odd.can_structural_write());
    }

    #[test]
    fn test_reset_is_permissive() {
        let mut state = PhaseState::default();
        state.enter(WritePhase::FrameView, PhasePolicy::READ_ONLY);
        assert_eq!(state.phase(), WritePhase::FrameView);
        assert!(!state.can_value_write());

        state.reset();
        assert_eq!(state.phase(), WritePhase::None);
        assert!(state.can_structural_write());
    }
}
