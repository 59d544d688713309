//! # Kernel
//!
//! Drives every owned world through the frame pipeline.
//!
//! ```text
//!   begin_frame(dt)           apply pending systems, run Input
//!   fixed_step(fixed) × N     run Decision → Simulation → PostSimulation
//!   late_frame(dt, alpha)     run Sync → View → UI
//! ```
//!
//! Worlds are driven one after another in the order they were added. Each
//! call stops at the first world that returns an error.

use std::time::Duration;

use cinder_core::{FrameStage, FrameTime, Scheduler, SchedulerConfig, World, WorldConfig};

use crate::clock::FixedClock;
use crate::config::{CinderConfig, KernelConfig};
use crate::error::{KernelError, KernelResult};

/// Names a world owned by a [`Kernel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldHandle(u32);

impl WorldHandle {
    /// Id of the world behind this handle.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

/// Outcome of [`Kernel::pump_and_late_frame`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Fixed steps run this frame.
    pub fixed_steps: u32,
    /// Whole steps discarded by the overflow policy.
    pub dropped_steps: u64,
    /// Alpha handed to the late groups.
    pub alpha: f64,
}

struct WorldSlot {
    world: World,
    scheduler: Scheduler,
}

/// The frame driver.
pub struct Kernel {
    config: KernelConfig,
    slots: Vec<WorldSlot>,
    clock: FixedClock,
    frame: u64,
    fixed_tick: u64,
    frame_delta: Duration,
    fixed_delta: Duration,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl Kernel {
    /// Creates a kernel with no worlds.
    #[must_use]
    pub fn new(config: KernelConfig) -> Self {
        let fixed_delta = config.fixed_delta();
        Self {
            config,
            slots: Vec::new(),
            clock: FixedClock::new(),
            frame: 0,
            fixed_tick: 0,
            frame_delta: Duration::ZERO,
            fixed_delta,
        }
    }

    /// Creates a kernel owning one world built from `config`.
    #[must_use]
    pub fn from_config(config: &CinderConfig) -> (Self, WorldHandle) {
        let mut kernel = Self::new(config.kernel.clone());
        let handle = kernel.create_world(config.world.clone(), config.scheduler.clone());
        (kernel, handle)
    }

    /// Frame-driver settings.
    #[must_use]
    pub const fn config(&self) -> &KernelConfig {
        &self.config
    }

    // =========================================================================
    // Worlds
    // =========================================================================

    /// Takes ownership of a world and its scheduler.
    pub fn add_world(&mut self, world: World, scheduler: Scheduler) -> WorldHandle {
        let handle = WorldHandle(world.id());
        tracing::debug!(world = world.id(), name = world.name(), "world added to kernel");
        self.slots.push(WorldSlot { world, scheduler });
        handle
    }

    /// Creates and adds a world.
    pub fn create_world(&mut self, world: WorldConfig, scheduler: SchedulerConfig) -> WorldHandle {
        self.add_world(World::with_config(world), Scheduler::with_config(scheduler))
    }

    /// Shuts down a world's systems and hands the world back.
    ///
    /// # Errors
    ///
    /// `UnknownWorld` if the handle is not owned by this kernel.
    pub fn remove_world(&mut self, handle: WorldHandle) -> KernelResult<(World, Scheduler)> {
        let pos = self.position(handle)?;
        let WorldSlot {
            mut world,
            mut scheduler,
        } = self.slots.remove(pos);
        scheduler.shutdown(&mut world);
        Ok((world, scheduler))
    }

    fn position(&self, handle: WorldHandle) -> KernelResult<usize> {
        self.slots
            .iter()
            .position(|slot| slot.world.id() == handle.0)
            .ok_or(KernelError::UnknownWorld(handle.0))
    }

    /// Number of owned worlds.
    #[must_use]
    pub fn world_count(&self) -> usize {
        self.slots.len()
    }

    /// A world.
    ///
    /// # Errors
    ///
    /// `UnknownWorld` if the handle is not owned by this kernel.
    pub fn world(&self, handle: WorldHandle) -> KernelResult<&World> {
        Ok(&self.slots[self.position(handle)?].world)
    }

    /// A world, mutably.
    ///
    /// # Errors
    ///
    /// `UnknownWorld` if the handle is not owned by this kernel.
    pub fn world_mut(&mut self, handle: WorldHandle) -> KernelResult<&mut World> {
        let pos = self.position(handle)?;
        Ok(&mut self.slots[pos].world)
    }

    /// A world's scheduler.
    ///
    /// # Errors
    ///
    /// `UnknownWorld` if the handle is not owned by this kernel.
    pub fn scheduler(&self, handle: WorldHandle) -> KernelResult<&Scheduler> {
        Ok(&self.slots[self.position(handle)?].scheduler)
    }

    /// A world's scheduler, mutably.
    ///
    /// # Errors
    ///
    /// `UnknownWorld` if the handle is not owned by this kernel.
    pub fn scheduler_mut(&mut self, handle: WorldHandle) -> KernelResult<&mut Scheduler> {
        let pos = self.position(handle)?;
        Ok(&mut self.slots[pos].scheduler)
    }

    /// A world together with its scheduler.
    ///
    /// # Errors
    ///
    /// `UnknownWorld` if the handle is not owned by this kernel.
    pub fn world_and_scheduler_mut(&mut self, handle: WorldHandle) -> KernelResult<(&mut World, &mut Scheduler)> {
        let pos = self.position(handle)?;
        let slot = &mut self.slots[pos];
        Ok((&mut slot.world, &mut slot.scheduler))
    }

    // =========================================================================
    // Counters
    // =========================================================================

    /// Frames begun so far.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Fixed steps run so far.
    #[inline]
    #[must_use]
    pub const fn fixed_tick(&self) -> u64 {
        self.fixed_tick
    }

    /// Time accumulated and not yet stepped.
    #[inline]
    #[must_use]
    pub const fn carry(&self) -> Duration {
        self.clock.carry()
    }

    /// Step size of the most recent fixed step, or the configured one
    /// before any step has run.
    #[inline]
    #[must_use]
    pub const fn fixed_delta(&self) -> Duration {
        self.fixed_delta
    }

    fn time(&self, alpha: f64) -> FrameTime {
        FrameTime {
            delta: self.frame_delta,
            fixed_delta: self.fixed_delta,
            alpha,
            frame: self.frame,
            fixed_tick: self.fixed_tick,
        }
    }

    // =========================================================================
    // Frame pipeline
    // =========================================================================

    /// Starts a frame: materializes pending system changes, then runs the
    /// early variable-rate groups.
    ///
    /// # Errors
    ///
    /// A failed scheduler build or group run.
    pub fn begin_frame(&mut self, dt: Duration) -> KernelResult<()> {
        self.frame += 1;
        self.frame_delta = dt;
        let time = self.time(0.0);

        for slot in &mut self.slots {
            slot.scheduler.apply_pending(&mut slot.world)?;
            slot.scheduler.run_stage(&mut slot.world, FrameStage::Begin, time)?;
        }
        Ok(())
    }

    /// Runs the fixed-rate groups once.
    ///
    /// # Errors
    ///
    /// `InvalidFixedDelta` for a zero step, otherwise a failed group run.
    pub fn fixed_step(&mut self, fixed_delta: Duration) -> KernelResult<()> {
        if fixed_delta.is_zero() {
            return Err(KernelError::InvalidFixedDelta);
        }
        self.fixed_tick += 1;
        self.fixed_delta = fixed_delta;
        let time = self.time(0.0);

        for slot in &mut self.slots {
            slot.scheduler.run_stage(&mut slot.world, FrameStage::Fixed, time)?;
        }
        Ok(())
    }

    /// Runs the late presentation groups once.
    ///
    /// # Errors
    ///
    /// A failed group run.
    pub fn late_frame(&mut self, dt: Duration, alpha: f64) -> KernelResult<()> {
        self.frame_delta = dt;
        let time = self.time(alpha);

        for slot in &mut self.slots {
            slot.scheduler.run_stage(&mut slot.world, FrameStage::Late, time)?;
        }
        Ok(())
    }

    /// Accumulates `dt`, runs up to `max_sub_steps` fixed steps, applies the
    /// configured overflow policy, then runs the late groups with the
    /// resulting alpha.
    ///
    /// # Errors
    ///
    /// `InvalidFixedDelta` for a zero step, `InvalidSubStepCap` for a zero
    /// cap, otherwise a failed group run. Time not yet stepped when an
    /// error occurs stays accumulated.
    pub fn pump_and_late_frame(
        &mut self,
        dt: Duration,
        fixed_delta: Duration,
        max_sub_steps: u32,
    ) -> KernelResult<FrameReport> {
        if fixed_delta.is_zero() {
            return Err(KernelError::InvalidFixedDelta);
        }
        if max_sub_steps == 0 {
            return Err(KernelError::InvalidSubStepCap);
        }
        self.fixed_delta = fixed_delta;

        self.clock.accumulate(dt);
        let mut report = FrameReport::default();
        while report.fixed_steps < max_sub_steps && self.clock.try_step(fixed_delta) {
            self.fixed_step(fixed_delta)?;
            report.fixed_steps += 1;
        }

        report.dropped_steps = self
            .clock
            .settle_overflow(fixed_delta, self.config.overflow_policy);
        if self.clock.owed_steps(fixed_delta) > 0 || report.dropped_steps > 0 {
            tracing::warn!(
                frame = self.frame,
                max_sub_steps,
                dropped = report.dropped_steps,
                policy = ?self.config.overflow_policy,
                "fixed-step cap reached"
            );
        }

        report.alpha = self.clock.alpha(fixed_delta);
        self.late_frame(dt, report.alpha)?;
        Ok(report)
    }

    /// Runs one whole frame with the configured tick rate and cap.
    ///
    /// # Errors
    ///
    /// As [`begin_frame`](Self::begin_frame) and
    /// [`pump_and_late_frame`](Self::pump_and_late_frame).
    pub fn run_frame(&mut self, dt: Duration) -> KernelResult<FrameReport> {
        self.begin_frame(dt)?;
        let fixed_delta = self.config.fixed_delta();
        let max_sub_steps = self.config.max_sub_steps;
        self.pump_and_late_frame(dt, fixed_delta, max_sub_steps)
    }

    /// Shuts down every world's systems. Worlds stay owned.
    pub fn shutdown(&mut self) {
        for slot in &mut self.slots {
            slot.scheduler.shutdown(&mut slot.world);
        }
        self.clock.reset();
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("config", &self.config)
            .field("worlds", &self.slots.len())
            .field("frame", &self.frame)
            .field("fixed_tick", &self.fixed_tick)
            .field("carry", &self.clock.carry())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::OverflowPolicy;

    const FIXED: Duration = Duration::from_millis(10);

    fn kernel_with(policy: OverflowPolicy) -> Kernel {
        let mut kernel = Kernel::new(KernelConfig {
            overflow_policy: policy,
            ..KernelConfig::default()
        });
        kernel.create_world(WorldConfig::default(), SchedulerConfig::default());
        kernel
    }

    #[test]
    fn test_pump_counts_steps_and_alpha() {
        let mut kernel = kernel_with(OverflowPolicy::Clamp);
        let report = kernel
            .pump_and_late_frame(Duration::from_millis(25), FIXED, 8)
            .unwrap();

        assert_eq!(report.fixed_steps, 2);
        assert_eq!(report.dropped_steps, 0);
        assert!((report.alpha - 0.5).abs() < 1e-12);
        assert_eq!(kernel.fixed_tick(), 2);
    }

    #[test]
    fn test_cap_with_clamp_keeps_remainder() {
        let mut kernel = kernel_with(OverflowPolicy::Clamp);
        let report = kernel
            .pump_and_late_frame(Duration::from_millis(65), FIXED, 4)
            .unwrap();

        assert_eq!(report.fixed_steps, 4);
        assert_eq!(report.dropped_steps, 2);
        assert_eq!(kernel.carry(), Duration::from_millis(5));
    }

    #[test]
    fn test_cap_with_retain_catches_up() {
        let mut kernel = kernel_with(OverflowPolicy::Retain);
        let first = kernel
            .pump_and_late_frame(Duration::from_millis(65), FIXED, 4)
            .unwrap();
        assert_eq!(first.fixed_steps, 4);
        assert!(first.alpha > 1.0);

        let second = kernel.pump_and_late_frame(Duration::ZERO, FIXED, 4).unwrap();
        assert_eq!(second.fixed_steps, 2);
        assert_eq!(kernel.fixed_tick(), 6);
    }

    #[test]
    fn test_cap_with_drop_discards_everything() {
        let mut kernel = kernel_with(OverflowPolicy::Drop);
        let report = kernel
            .pump_and_late_frame(Duration::from_millis(65), FIXED, 4)
            .unwrap();
        assert_eq!(report.dropped_steps, 2);
        assert_eq!(report.alpha, 0.0);
    }

    #[test]
    fn test_zero_fixed_delta_is_rejected() {
        let mut kernel = kernel_with(OverflowPolicy::Clamp);
        assert!(matches!(
            kernel.pump_and_late_frame(FIXED, Duration::ZERO, 4),
            Err(KernelError::InvalidFixedDelta)
        ));
        assert!(matches!(kernel.fixed_step(Duration::ZERO), Err(KernelError::InvalidFixedDelta)));
    }

    #[test]
    fn test_zero_sub_step_cap_is_rejected() {
        let mut kernel = kernel_with(OverflowPolicy::Drop);
        assert!(matches!(
            kernel.pump_and_late_frame(FIXED * 3, FIXED, 0),
            Err(KernelError::InvalidSubStepCap)
        ));
        assert_eq!(kernel.carry(), Duration::ZERO);
        assert_eq!(kernel.fixed_tick(), 0);
    }

    #[test]
    fn test_pumped_step_size_is_remembered() {
        let mut kernel = kernel_with(OverflowPolicy::Clamp);
        assert_eq!(kernel.fixed_delta(), KernelConfig::default().fixed_delta());

        kernel.pump_and_late_frame(Duration::from_millis(5), FIXED, 4).unwrap();
        assert_eq!(kernel.fixed_delta(), FIXED);
    }

    #[test]
    fn test_unknown_world() {
        let mut kernel = Kernel::default();
        let handle = kernel.create_world(WorldConfig::default(), SchedulerConfig::default());
        let (world, _) = kernel.remove_world(handle).unwrap();
        assert_eq!(world.id(), handle.id());
        assert!(matches!(kernel.world(handle), Err(KernelError::UnknownWorld(_))));
    }
}
