//! # Fixed-Step Clock
//!
//! Accumulates variable frame time and pays it out in whole fixed steps.
//!
//! ```text
//!   carry += dt
//!   while carry + slack >= fixed && steps < max:  carry = max(carry - fixed, 0); step
//!   after a step, a carry below slack snaps to 0
//!   overflow policy for whole steps still owed
//!   alpha = carry / fixed
//! ```
//!
//! Time is kept as [`Duration`] so the same `dt` sequence always produces
//! the same steps and the same alpha, bit for bit.
//!
//! Hosts usually convert fractional seconds to `Duration`, which rounds
//! both `dt` and the step to whole nanoseconds. A carry that falls short of
//! a step by no more than the slack (one part per million of the step, at
//! least [`MIN_STEP_SLACK`]) still counts as a full step. Either way the
//! step lands on the boundary: what is left over within the slack is dropped.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Smallest shortfall forgiven when deciding whether a step is owed.
pub const MIN_STEP_SLACK: Duration = Duration::from_nanos(16);

const STEP_SLACK_DIVISOR: u32 = 1_000_000;

#[inline]
fn slack(fixed_delta: Duration) -> Duration {
    (fixed_delta / STEP_SLACK_DIVISOR).max(MIN_STEP_SLACK)
}

/// What happens to time still owed once a frame hits its sub-step cap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Keep all of it; later frames catch up. Alpha may exceed `1.0`.
    Retain,
    /// Discard whole steps still owed, keep the sub-step remainder.
    #[default]
    Clamp,
    /// Discard everything still owed.
    Drop,
}

/// Carry-over accumulator for fixed stepping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedClock {
    carry: Duration,
}

impl FixedClock {
    /// Creates a clock with nothing accumulated.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            carry: Duration::ZERO,
        }
    }

    /// Time accumulated and not yet stepped.
    #[inline]
    #[must_use]
    pub const fn carry(&self) -> Duration {
        self.carry
    }

    /// Adds a frame's delta.
    pub fn accumulate(&mut self, dt: Duration) {
        self.carry = self.carry.saturating_add(dt);
    }

    /// Consumes one step if enough time is accumulated.
    #[must_use]
    pub fn try_step(&mut self, fixed_delta: Duration) -> bool {
        if fixed_delta.is_zero() || self.carry.saturating_add(slack(fixed_delta)) < fixed_delta {
            return false;
        }
        let rest = self.carry.saturating_sub(fixed_delta);
        self.carry = if rest < slack(fixed_delta) { Duration::ZERO } else { rest };
        true
    }

    /// Whole steps currently owed.
    #[must_use]
    pub fn owed_steps(&self, fixed_delta: Duration) -> u64 {
        if fixed_delta.is_zero() {
            return 0;
        }
        let carry = self.carry.saturating_add(slack(fixed_delta));
        u64::try_from(carry.as_nanos() / fixed_delta.as_nanos()).unwrap_or(u64::MAX)
    }

    /// Applies `policy` to the steps still owed after a capped frame.
    ///
    /// Returns the number of whole steps discarded.
    pub fn settle_overflow(&mut self, fixed_delta: Duration, policy: OverflowPolicy) -> u64 {
        let owed = self.owed_steps(fixed_delta);
        if owed == 0 {
            return 0;
        }

        match policy {
            OverflowPolicy::Retain => 0,
            OverflowPolicy::Clamp => {
                let owed_nanos = u128::from(owed) * fixed_delta.as_nanos();
                let remainder = self.carry.as_nanos().saturating_sub(owed_nanos);
                // remainder < fixed_delta, which fits a Duration
                let remainder = Duration::from_nanos(u64::try_from(remainder).unwrap_or(u64::MAX));
                self.carry = if remainder < slack(fixed_delta) { Duration::ZERO } else { remainder };
                owed
            }
            OverflowPolicy::Drop => {
                self.carry = Duration::ZERO;
                owed
            }
        }
    }

    /// Interpolation factor between the last and next fixed step.
    #[must_use]
    pub fn alpha(&self, fixed_delta: Duration) -> f64 {
        if fixed_delta.is_zero() {
            return 0.0;
        }
        self.carry.as_nanos() as f64 / fixed_delta.as_nanos() as f64
    }

    /// Forgets all accumulated time.
    pub fn reset(&mut self) {
        self.carry = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(10);

    #[test]
    fn test_steps_and_carry() {
        let mut clock = FixedClock::new();
        clock.accumulate(Duration::from_millis(25));

        assert!(clock.try_step(STEP));
        assert!(clock.try_step(STEP));
        assert!(!clock.try_step(STEP));
        assert_eq!(clock.carry(), Duration::from_millis(5));
        assert!((clock.alpha(STEP) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overflow_policies() {
        let mut retain = FixedClock::new();
        retain.accumulate(Duration::from_millis(37));
        assert_eq!(retain.settle_overflow(STEP, OverflowPolicy::Retain), 0);
        assert_eq!(retain.carry(), Duration::from_millis(37));

        let mut clamp = FixedClock::new();
        clamp.accumulate(Duration::from_millis(37));
        assert_eq!(clamp.settle_overflow(STEP, OverflowPolicy::Clamp), 3);
        assert_eq!(clamp.carry(), Duration::from_millis(7));

        let mut drop = FixedClock::new();
        drop.accumulate(Duration::from_millis(37));
        assert_eq!(drop.settle_overflow(STEP, OverflowPolicy::Drop), 3);
        assert_eq!(drop.carry(), Duration::ZERO);
    }

    #[test]
    fn test_rounded_seconds_still_step() {
        let fixed = Duration::from_secs_f64(1.0 / 60.0);
        let mut clock = FixedClock::new();
        let mut steps = 0;

        for _ in 0..2 {
            clock.accumulate(Duration::from_secs_f64(5.0 / 60.0));
            while clock.try_step(fixed) {
                steps += 1;
            }
        }

        assert_eq!(steps, 10);
        assert_eq!(clock.carry(), Duration::ZERO);
        assert_eq!(clock.alpha(fixed), 0.0);
    }

    #[test]
    fn test_shortfall_beyond_slack_waits() {
        let mut clock = FixedClock::new();
        clock.accumulate(STEP - Duration::from_micros(1));
        assert!(!clock.try_step(STEP));
        assert_eq!(clock.owed_steps(STEP), 0);

        clock.accumulate(Duration::from_micros(1) - Duration::from_nanos(5));
        assert_eq!(clock.owed_steps(STEP), 1);
        assert!(clock.try_step(STEP));
        assert_eq!(clock.carry(), Duration::ZERO);
    }

    #[test]
    fn test_clamp_forgives_near_whole_remainder() {
        let mut clock = FixedClock::new();
        clock.accumulate(STEP * 3 - Duration::from_nanos(3));
        assert_eq!(clock.settle_overflow(STEP, OverflowPolicy::Clamp), 3);
        assert_eq!(clock.carry(), Duration::ZERO);
    }

    #[test]
    fn test_zero_step_never_steps() {
        let mut clock = FixedClock::new();
        clock.accumulate(STEP);
        assert!(!clock.try_step(Duration::ZERO));
        assert_eq!(clock.alpha(Duration::ZERO), 0.0);
    }
}
