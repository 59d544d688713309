//! # System Groups
//!
//! The closed set of scheduling phases and their fixed pipeline order.
//!
//! ```text
//!   BeginFrame    Input
//!   FixedStep     Decision → Simulation → PostSimulation   (× N)
//!   LateFrame     Sync → View → UI
//! ```
//!
//! Systems pick a group; they never pick where the group runs.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ecs::{PhasePolicy, WritePhase};

/// Which kernel call runs a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameStage {
    /// Once per frame, before fixed steps.
    Begin,
    /// Once per fixed step.
    Fixed,
    /// Once per frame, after fixed steps, with interpolation alpha.
    Late,
}

/// A named scheduling phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemGroup {
    /// Reads the host's input.
    Input,
    /// AI and other decision making ahead of the simulation.
    Decision,
    /// Deterministic simulation.
    Simulation,
    /// Reactions to the simulation's results.
    PostSimulation,
    /// Pushes simulation values to outside consumers.
    Sync,
    /// Presentation.
    View,
    /// User interface.
    Ui,
}

impl SystemGroup {
    /// Every group in pipeline order.
    pub const ALL: [Self; 7] = [
        Self::Input,
        Self::Decision,
        Self::Simulation,
        Self::PostSimulation,
        Self::Sync,
        Self::View,
        Self::Ui,
    ];

    /// Position in the pipeline.
    #[inline]
    #[must_use]
    pub const fn pipeline_index(self) -> usize {
        self as usize
    }

    /// The kernel call this group runs in.
    #[must_use]
    pub const fn stage(self) -> FrameStage {
        match self {
            Self::Input => FrameStage::Begin,
            Self::Decision | Self::Simulation | Self::PostSimulation => FrameStage::Fixed,
            Self::Sync | Self::View | Self::Ui => FrameStage::Late,
        }
    }

    /// Groups run by one kernel call, in pipeline order.
    pub fn in_stage(stage: FrameStage) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |group| group.stage() == stage)
    }

    /// The write phase the world is in while this group runs.
    #[must_use]
    pub const fn default_phase(self) -> WritePhase {
        match self {
            Self::Input => WritePhase::FrameInput,
            Self::Decision | Self::Simulation | Self::PostSimulation => WritePhase::Simulation,
            Self::Sync => WritePhase::FrameSync,
            Self::View => WritePhase::FrameView,
            Self::Ui => WritePhase::FrameUI,
        }
    }

    /// The policy used unless the scheduler configuration overrides it.
    #[must_use]
    pub const fn default_policy(self) -> PhasePolicy {
        match self {
            Self::Input | Self::Decision | Self::Simulation | Self::PostSimulation => {
                PhasePolicy::PERMISSIVE
            }
            Self::Sync => PhasePolicy::VALUES_ONLY,
            Self::View | Self::Ui => PhasePolicy::READ_ONLY,
        }
    }
}

impl fmt::Display for SystemGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Decision => "decision",
            Self::Simulation => "simulation",
            Self::PostSimulation => "post_simulation",
            Self::Sync => "sync",
            Self::View => "view",
            Self::Ui => "ui",
        };
        f.write_str(name)
    }
}

/// Timing handed to every system run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Variable delta of the current frame.
    pub delta: Duration,
    /// Fixed step size.
    pub fixed_delta: Duration,
    /// Interpolation factor between the last and next fixed step. Only
    /// meaningful in late groups; `0.0` elsewhere.
    pub alpha: f64,
    /// Frames begun so far, counting the current one.
    pub frame: u64,
    /// Fixed steps run so far, counting the current one.
    pub fixed_tick: u64,
}
