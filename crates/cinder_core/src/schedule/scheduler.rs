//! # System Scheduler
//!
//! Owns the systems of one world and runs them group by group.
//!
//! ## System lifecycle
//!
//! ```text
//!   request_add ──► pending ──apply_pending()──► active ──request_remove──► pending ──► gone
//!                              (frame boundary)
//! ```
//!
//! `apply_pending` is the build step: it materializes queued requests and
//! resolves each group into a plain ordered list of slot indices. Ticks only
//! walk those lists.
//!
//! ## Running a group
//!
//! 1. Enter the group's write phase
//! 2. Run each enabled system in resolved order with a shared command buffer
//! 3. Flush that buffer, then any buffers submitted to the world
//! 4. Return to the permissive phase

use std::any::TypeId;
use std::collections::{HashMap, VecDeque};

use super::group::{FrameStage, FrameTime, SystemGroup};
use super::order;
use super::report::{FailureReporter, SystemFailure};
use super::system::{BoxedSystem, System, SystemConfig, SystemContext, SystemId, WorldAccess};
use crate::config::{SchedulerConfig, SystemErrorPolicy};
use crate::ecs::{PhasePolicy, World};
use crate::error::{ScheduleError, ScheduleResult};

struct Slot {
    type_id: TypeId,
    name: &'static str,
    config: SystemConfig,
    /// Last observed state of the enabled flag; `None` if not toggleable.
    enabled: Option<bool>,
    system: BoxedSystem,
}

impl Slot {
    fn new(mut system: BoxedSystem) -> Self {
        Self {
            type_id: system.as_any().type_id(),
            name: system.name(),
            config: system.config(),
            enabled: system.toggle().map(|toggle| toggle.is_enabled()),
            system,
        }
    }

    fn refresh_enabled(&mut self) -> bool {
        self.enabled = self.system.toggle().map(|toggle| toggle.is_enabled());
        self.enabled.unwrap_or(true)
    }
}

enum Request {
    Add(BoxedSystem),
    Remove(SystemId),
}

/// Read-only description of an active system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemInfo {
    /// System name.
    pub name: &'static str,
    /// Group it runs in.
    pub group: SystemGroup,
    /// Position within the group's resolved order.
    pub position: usize,
    /// Enabled flag, `None` if the system cannot be toggled.
    pub enabled: Option<bool>,
}

/// Runs the systems of one world.
pub struct Scheduler {
    config: SchedulerConfig,
    reporter: FailureReporter,
    slots: Vec<Slot>,
    /// Slot indices per group, indexed by pipeline position.
    orders: Vec<Vec<usize>>,
    requests: VecDeque<Request>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates a scheduler with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Creates a scheduler with the given configuration.
    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            reporter: FailureReporter::new(),
            slots: Vec::new(),
            orders: vec![Vec::new(); SystemGroup::ALL.len()],
            requests: VecDeque::new(),
        }
    }

    /// The configuration in force.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Changes what happens when a system fails.
    pub fn set_error_policy(&mut self, policy: SystemErrorPolicy) {
        self.config.error_policy = policy;
    }

    /// Replaces the failure reporter.
    pub fn set_failure_reporter(&mut self, reporter: FailureReporter) {
        self.reporter = reporter;
    }

    /// The write-phase policy used for `group`.
    #[must_use]
    pub fn policy_for(&self, group: SystemGroup) -> PhasePolicy {
        self.config
            .group_policies
            .get(&group)
            .copied()
            .unwrap_or_else(|| group.default_policy())
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Queues a system to be added at the next frame boundary.
    pub fn request_add<T: System>(&mut self, system: T) {
        self.requests.push_back(Request::Add(Box::new(system)));
    }

    /// Queues several systems, keeping their order as registration order.
    pub fn request_add_range(&mut self, systems: impl IntoIterator<Item = BoxedSystem>) {
        self.requests.extend(systems.into_iter().map(Request::Add));
    }

    /// Queues removal of system `T` at the next frame boundary.
    pub fn request_remove<T: System>(&mut self) {
        self.requests.push_back(Request::Remove(SystemId::of::<T>()));
    }

    /// Number of queued requests.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    /// Materializes queued requests and resolves the order of every group.
    ///
    /// Removed systems are shut down; added systems are initialized. A
    /// system whose initialization fails is reported and dropped.
    ///
    /// # Errors
    ///
    /// - `OrderingCycle` if the new set has cyclic constraints. The systems
    ///   being added are dropped; removals still happen.
    /// - `DuplicateSystem` if a system type was added twice. Other requests
    ///   are still applied.
    pub fn apply_pending(&mut self, world: &mut World) -> ScheduleResult<()> {
        if self.requests.is_empty() {
            return Ok(());
        }

        // Slots before `initialized` are live systems; later ones are queued
        // in this batch and not yet initialized.
        let mut initialized = self.slots.len();
        let mut first_error = None;
        let mut removed = 0_usize;

        while let Some(request) = self.requests.pop_front() {
            match request {
                Request::Add(system) => {
                    let slot = Slot::new(system);
                    if self.position_of(slot.type_id).is_some() {
                        tracing::warn!(system = slot.name, "system added twice; ignoring the second");
                        first_error.get_or_insert(ScheduleError::DuplicateSystem(slot.name));
                        continue;
                    }
                    self.slots.push(slot);
                }
                Request::Remove(id) => match self.position_of(id.type_id()) {
                    Some(pos) => {
                        let mut slot = self.slots.remove(pos);
                        if pos < initialized {
                            slot.system.shutdown(world);
                            initialized -= 1;
                        }
                        removed += 1;
                    }
                    None => tracing::warn!(system = id.name(), "remove requested for unscheduled system"),
                },
            }
        }

        let first_new = initialized;
        if let Err(cycle) = resolve_all(&self.slots) {
            self.slots.truncate(first_new);
            self.orders = resolve_all(&self.slots)?;
            return Err(cycle);
        }

        let mut index = first_new;
        while index < self.slots.len() {
            let slot = &mut self.slots[index];
            match slot.system.initialize(world) {
                Ok(()) => {
                    slot.refresh_enabled();
                    index += 1;
                }
                Err(error) => {
                    let failure = SystemFailure {
                        system: slot.name,
                        group: slot.config.group(),
                        message: error.to_string(),
                    };
                    self.reporter.report(&failure);
                    self.slots.remove(index);
                }
            }
        }

        self.orders = resolve_all(&self.slots)?;
        tracing::debug!(
            world = world.id(),
            systems = self.slots.len(),
            added = self.slots.len() - first_new,
            removed,
            "scheduler rebuilt"
        );
        for group in SystemGroup::ALL {
            let names: Vec<&str> = self.resolved_order(group).collect();
            if !names.is_empty() {
                tracing::debug!(%group, order = ?names, "resolved group order");
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    // =========================================================================
    // Running
    // =========================================================================

    /// Runs every group bound to `stage`, in pipeline order.
    ///
    /// # Errors
    ///
    /// Stops at the first group that returns an error.
    pub fn run_stage(&mut self, world: &mut World, stage: FrameStage, time: FrameTime) -> ScheduleResult<()> {
        for group in SystemGroup::in_stage(stage) {
            self.run_group(world, group, time)?;
        }
        Ok(())
    }

    /// Runs one group.
    ///
    /// The group's buffer and the world's submitted buffers are flushed under
    /// the group's phase, so the phase policy also gates what its systems
    /// recorded. The phase is reset afterwards in every case.
    ///
    /// # Errors
    ///
    /// - `SystemFailed` under the `Propagate` policy.
    /// - `Ecs(FlushFailed)` under the world's `Throw` write-failure policy.
    pub fn run_group(&mut self, world: &mut World, group: SystemGroup, time: FrameTime) -> ScheduleResult<()> {
        let policy = self.policy_for(group);
        world.enter_phase(group.default_phase(), policy);

        let mut commands = world.command_buffer();
        let mut failed = None;

        for &index in &self.orders[group.pipeline_index()] {
            let slot = &mut self.slots[index];
            if !slot.refresh_enabled() {
                continue;
            }

            let mut ctx = SystemContext {
                world: WorldAccess::new(world),
                commands: &mut commands,
                time,
                group,
            };
            let outcome = slot.system.run(&mut ctx);
            slot.refresh_enabled();

            if let Err(error) = outcome {
                let failure = SystemFailure {
                    system: slot.name,
                    group,
                    message: error.to_string(),
                };
                self.reporter.report(&failure);
                if self.config.error_policy == SystemErrorPolicy::Propagate {
                    failed = Some(failure);
                    break;
                }
            }
        }

        let flushed = world.flush_point(commands);
        world.reset_phase();

        match (failed, flushed) {
            (Some(failure), flushed) => {
                if let Err(error) = flushed {
                    tracing::error!(%group, %error, "flush after failed system also failed");
                }
                Err(ScheduleError::SystemFailed {
                    system: failure.system,
                    group,
                    message: failure.message,
                })
            }
            (None, Ok(report)) => {
                tracing::trace!(%group, ?report, "group finished");
                Ok(())
            }
            (None, Err(error)) => Err(error.into()),
        }
    }

    /// Shuts down every system, latest registered first.
    pub fn shutdown(&mut self, world: &mut World) {
        for mut slot in self.slots.drain(..).rev() {
            slot.system.shutdown(world);
        }
        self.orders.iter_mut().for_each(Vec::clear);
        self.requests.clear();
    }

    // =========================================================================
    // Introspection and toggling
    // =========================================================================

    fn position_of(&self, type_id: TypeId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.type_id == type_id)
    }

    /// Checks if system `T` is active.
    #[must_use]
    pub fn contains<T: System>(&self) -> bool {
        self.position_of(TypeId::of::<T>()).is_some()
    }

    /// Number of active systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no system is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The active system of type `T`.
    #[must_use]
    pub fn try_get<T: System>(&self) -> Option<&T> {
        let pos = self.position_of(TypeId::of::<T>())?;
        self.slots[pos].system.as_any().downcast_ref::<T>()
    }

    /// The active system of type `T`, mutably.
    pub fn try_get_mut<T: System>(&mut self) -> Option<&mut T> {
        let pos = self.position_of(TypeId::of::<T>())?;
        self.slots[pos].system.as_any_mut().downcast_mut::<T>()
    }

    /// Names of a group's systems in resolved order.
    pub fn resolved_order(&self, group: SystemGroup) -> impl Iterator<Item = &'static str> + '_ {
        self.orders[group.pipeline_index()]
            .iter()
            .map(|&index| self.slots[index].name)
    }

    /// Every active system, in pipeline then resolved order.
    pub fn systems(&self) -> impl Iterator<Item = SystemInfo> + '_ {
        SystemGroup::ALL.into_iter().flat_map(move |group| {
            self.orders[group.pipeline_index()]
                .iter()
                .enumerate()
                .map(move |(position, &index)| {
                    let slot = &self.slots[index];
                    SystemInfo {
                        name: slot.name,
                        group,
                        position,
                        enabled: slot.enabled,
                    }
                })
        })
    }

    /// Enables or disables system `T` without unscheduling it.
    ///
    /// # Errors
    ///
    /// `SystemNotFound` if `T` is not active, `NotToggleable` if it has no
    /// enabled flag.
    pub fn set_enabled<T: System>(&mut self, enabled: bool) -> ScheduleResult<()> {
        let id = SystemId::of::<T>();
        let pos = self
            .position_of(id.type_id())
            .ok_or(ScheduleError::SystemNotFound(id.name()))?;
        let slot = &mut self.slots[pos];
        let toggle = slot
            .system
            .toggle()
            .ok_or(ScheduleError::NotToggleable(slot.name))?;
        toggle.set_enabled(enabled);
        slot.enabled = Some(enabled);
        Ok(())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.slots.iter().map(|slot| slot.name).collect();
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("systems", &names)
            .field("pending", &self.requests.len())
            .finish_non_exhaustive()
    }
}

/// Resolves the order of every group. Constraints naming a system in another
/// group are ignored.
fn resolve_all(slots: &[Slot]) -> ScheduleResult<Vec<Vec<usize>>> {
    let mut orders = vec![Vec::new(); SystemGroup::ALL.len()];

    for group in SystemGroup::ALL {
        let members: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.config.group() == group)
            .map(|(index, _)| index)
            .collect();
        if members.is_empty() {
            continue;
        }

        let local: HashMap<TypeId, usize> = members
            .iter()
            .enumerate()
            .map(|(local, &index)| (slots[index].type_id, local))
            .collect();
        let lookup = |owner: &Slot, target: SystemId| -> Option<usize> {
            let found = local.get(&target.type_id()).copied();
            if found.is_none() && slots.iter().any(|slot| slot.type_id == target.type_id()) {
                tracing::warn!(
                    system = owner.name,
                    target = target.name(),
                    %group,
                    "ordering constraint names a system in another group; ignored"
                );
            }
            found
        };

        let mut edges = Vec::new();
        for (this, &index) in members.iter().enumerate() {
            let slot = &slots[index];
            for &target in slot.config.runs_before() {
                if let Some(other) = lookup(slot, target) {
                    edges.push((this, other));
                }
            }
            for &target in slot.config.runs_after() {
                if let Some(other) = lookup(slot, target) {
                    edges.push((other, this));
                }
            }
        }

        match order::resolve(members.len(), &edges) {
            Ok(sorted) => {
                orders[group.pipeline_index()] = sorted.into_iter().map(|local| members[local]).collect();
            }
            Err(stuck) => {
                return Err(ScheduleError::OrderingCycle {
                    group,
                    systems: stuck.into_iter().map(|local| slots[members[local]].name).collect(),
                });
            }
        }
    }

    Ok(orders)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::ecs::Component;
    use crate::error::EcsError;
    use crate::schedule::{EnabledFlag, SystemResult, Toggle};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    macro_rules! logging_system {
        ($name:ident, $group:expr $(, $method:ident::<$target:ident>)*) => {
            struct $name(Log);

            impl System for $name {
                fn config(&self) -> SystemConfig {
                    SystemConfig::new($group)$(.$method::<$target>())*
                }

                fn run(&mut self, _ctx: &mut SystemContext<'_>) -> SystemResult {
                    self.0.lock().push(stringify!($name));
                    Ok(())
                }

                fn name(&self) -> &'static str {
                    stringify!($name)
                }
            }
        };
    }

    logging_system!(X, SystemGroup::Simulation, before::<Y>);
    logging_system!(Y, SystemGroup::Simulation);
    logging_system!(Z, SystemGroup::Simulation, after::<Y>);
    logging_system!(Loop1, SystemGroup::Decision, before::<Loop2>);
    logging_system!(Loop2, SystemGroup::Decision, before::<Loop1>);
    logging_system!(Viewer, SystemGroup::View, after::<Y>);

    #[derive(Clone, Debug, PartialEq)]
    struct Spark;
    impl Component for Spark {}

    struct Failing;

    impl System for Failing {
        fn config(&self) -> SystemConfig {
            SystemConfig::new(SystemGroup::Simulation)
        }

        fn run(&mut self, ctx: &mut SystemContext<'_>) -> SystemResult {
            let entity = ctx.commands.create_entity();
            ctx.commands.add(entity, Spark);
            Err("boom".into())
        }
    }

    #[derive(Default)]
    struct Counter {
        runs: u32,
        enabled: EnabledFlag,
    }

    impl System for Counter {
        fn config(&self) -> SystemConfig {
            SystemConfig::new(SystemGroup::Input)
        }

        fn run(&mut self, _ctx: &mut SystemContext<'_>) -> SystemResult {
            self.runs += 1;
            Ok(())
        }

        fn toggle(&mut self) -> Option<&mut dyn Toggle> {
            Some(&mut self.enabled)
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Glow(u32);
    impl Component for Glow {}

    /// Records a spawn from the sync group, where structural changes are denied.
    struct SyncSpawner;

    impl System for SyncSpawner {
        fn config(&self) -> SystemConfig {
            SystemConfig::new(SystemGroup::Sync)
        }

        fn run(&mut self, ctx: &mut SystemContext<'_>) -> SystemResult {
            ctx.commands.create_entity();
            Ok(())
        }
    }

    struct Lifecycle {
        log: Log,
        refuse: bool,
    }

    impl System for Lifecycle {
        fn config(&self) -> SystemConfig {
            SystemConfig::new(SystemGroup::PostSimulation)
        }

        fn run(&mut self, _ctx: &mut SystemContext<'_>) -> SystemResult {
            self.log.lock().push("run");
            Ok(())
        }

        fn initialize(&mut self, _world: &mut World) -> SystemResult {
            self.log.lock().push("initialize");
            if self.refuse {
                return Err("not ready".into());
            }
            Ok(())
        }

        fn shutdown(&mut self, _world: &mut World) {
            self.log.lock().push("shutdown");
        }
    }

    fn time() -> FrameTime {
        FrameTime::default()
    }

    #[test]
    fn test_ordering_is_independent_of_registration() {
        let permutations: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        for permutation in permutations {
            let log = Log::default();
            let mut world = World::new();
            let mut scheduler = Scheduler::new();
            for which in permutation {
                match which {
                    0 => scheduler.request_add(X(log.clone())),
                    1 => scheduler.request_add(Y(log.clone())),
                    _ => scheduler.request_add(Z(log.clone())),
                }
            }
            scheduler.apply_pending(&mut world).unwrap();
            scheduler.run_group(&mut world, SystemGroup::Simulation, time()).unwrap();

            assert_eq!(*log.lock(), ["X", "Y", "Z"], "registered as {permutation:?}");
        }
    }

    #[test]
    fn test_cycle_fails_at_build() {
        let log = Log::default();
        let mut world = World::new();
        let mut scheduler = Scheduler::new();
        scheduler.request_add(Loop1(log.clone()));
        scheduler.request_add(Loop2(log.clone()));

        let err = scheduler.apply_pending(&mut world).unwrap_err();
        let ScheduleError::OrderingCycle { group, systems } = err else {
            panic!("expected OrderingCycle");
        };
        assert_eq!(group, SystemGroup::Decision);
        assert_eq!(systems, ["Loop1", "Loop2"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cross_group_constraint_is_ignored() {
        let log = Log::default();
        let mut world = World::new();
        let mut scheduler = Scheduler::new();
        scheduler.request_add(Viewer(log.clone()));
        scheduler.request_add(Y(log.clone()));
        scheduler.apply_pending(&mut world).unwrap();

        assert_eq!(scheduler.resolved_order(SystemGroup::View).collect::<Vec<_>>(), ["Viewer"]);
    }

    #[test]
    fn test_requests_wait_for_frame_boundary() {
        let mut world = World::new();
        let mut scheduler = Scheduler::new();
        scheduler.request_add(Counter::default());
        scheduler.run_group(&mut world, SystemGroup::Input, time()).unwrap();
        assert!(scheduler.try_get::<Counter>().is_none());

        scheduler.apply_pending(&mut world).unwrap();
        scheduler.run_group(&mut world, SystemGroup::Input, time()).unwrap();
        assert_eq!(scheduler.try_get::<Counter>().map(|c| c.runs), Some(1));

        scheduler.request_remove::<Counter>();
        assert!(scheduler.contains::<Counter>());
        scheduler.apply_pending(&mut world).unwrap();
        assert!(!scheduler.contains::<Counter>());
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut world = World::new();
        let mut scheduler = Scheduler::new();
        scheduler.request_add(Counter::default());
        scheduler.request_add(Counter::default());
        let err = scheduler.apply_pending(&mut world).unwrap_err();
        assert!(matches!(err, ScheduleError::DuplicateSystem(_)));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_disabled_system_is_skipped_not_removed() {
        let log = Log::default();
        let mut world = World::new();
        let mut scheduler = Scheduler::new();
        scheduler.request_add(Counter::default());
        scheduler.request_add(Y(log));
        scheduler.apply_pending(&mut world).unwrap();

        scheduler.set_enabled::<Counter>(false).unwrap();
        scheduler.run_group(&mut world, SystemGroup::Input, time()).unwrap();
        assert_eq!(scheduler.try_get::<Counter>().map(|c| c.runs), Some(0));

        let info: Vec<SystemInfo> = scheduler.systems().collect();
        assert_eq!(info[0].enabled, Some(false));
        assert_eq!(info[1].enabled, None);

        assert!(matches!(scheduler.set_enabled::<Y>(false), Err(ScheduleError::NotToggleable(_))));
        assert!(matches!(scheduler.set_enabled::<Z>(false), Err(ScheduleError::SystemNotFound(_))));

        scheduler.set_enabled::<Counter>(true).unwrap();
        scheduler.run_group(&mut world, SystemGroup::Input, time()).unwrap();
        assert_eq!(scheduler.try_get::<Counter>().map(|c| c.runs), Some(1));
    }

    #[test]
    fn test_log_and_continue_still_flushes() {
        let log = Log::default();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);

        let mut world = World::new();
        let mut scheduler = Scheduler::new();
        scheduler.set_failure_reporter(FailureReporter::with_callback(move |failure| {
            sink.lock().push(failure.clone());
        }));
        scheduler.request_add(Failing);
        scheduler.request_add(Y(log.clone()));
        scheduler.apply_pending(&mut world).unwrap();

        scheduler.run_group(&mut world, SystemGroup::Simulation, time()).unwrap();
        assert_eq!(*log.lock(), ["Y"]);
        assert_eq!(failures.lock().len(), 1);
        assert_eq!(failures.lock()[0].message, "boom");
        assert_eq!(world.alive_count(), 1);
    }

    #[test]
    fn test_propagate_stops_group_and_resets_phase() {
        let log = Log::default();
        let mut world = World::new();
        let mut scheduler = Scheduler::new();
        scheduler.set_error_policy(SystemErrorPolicy::Propagate);
        scheduler.request_add(Failing);
        scheduler.request_add(Y(log.clone()));
        scheduler.apply_pending(&mut world).unwrap();

        let err = scheduler
            .run_group(&mut world, SystemGroup::Simulation, time())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::SystemFailed { .. }));
        assert!(log.lock().is_empty());
        assert_eq!(world.alive_count(), 1);
        assert_eq!(world.phase().phase(), crate::ecs::WritePhase::None);
    }

    #[test]
    fn test_submitted_buffers_flush_even_when_group_buffer_fails() {
        let mut world = World::new();
        let mut commands = world.command_buffer();
        let lamp = commands.create_entity();
        commands.add(lamp, Glow(1));
        world.flush(commands).unwrap();

        let mut submitted = world.command_buffer();
        submitted.replace(lamp, Glow(2));
        world.submit(submitted).unwrap();

        let mut scheduler = Scheduler::new();
        scheduler.request_add(SyncSpawner);
        scheduler.apply_pending(&mut world).unwrap();

        let err = scheduler.run_group(&mut world, SystemGroup::Sync, time()).unwrap_err();
        let ScheduleError::Ecs(EcsError::FlushFailed(failures)) = err else {
            panic!("expected a flush failure, got {err:?}");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(world.pending_buffers(), 0);
        assert_eq!(world.get::<Glow>(lamp), Some(&Glow(2)));
        assert_eq!(world.alive_count(), 1);
    }

    #[test]
    fn test_lifecycle_on_remove_and_shutdown() {
        let log = Log::default();
        let mut world = World::new();
        let mut scheduler = Scheduler::new();
        scheduler.request_add(Lifecycle {
            log: log.clone(),
            refuse: false,
        });
        scheduler.apply_pending(&mut world).unwrap();
        scheduler.run_group(&mut world, SystemGroup::PostSimulation, time()).unwrap();
        scheduler.request_remove::<Lifecycle>();
        scheduler.apply_pending(&mut world).unwrap();
        assert_eq!(*log.lock(), ["initialize", "run", "shutdown"]);

        log.lock().clear();
        scheduler.request_add(Lifecycle {
            log: log.clone(),
            refuse: false,
        });
        scheduler.apply_pending(&mut world).unwrap();
        scheduler.shutdown(&mut world);
        assert_eq!(*log.lock(), ["initialize", "shutdown"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_failed_initialize_drops_system() {
        let log = Log::default();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);

        let mut world = World::new();
        let mut scheduler = Scheduler::new();
        scheduler.set_failure_reporter(FailureReporter::with_callback(move |failure| {
            sink.lock().push(failure.clone());
        }));
        scheduler.request_add(Lifecycle {
            log: log.clone(),
            refuse: true,
        });
        scheduler.apply_pending(&mut world).unwrap();

        assert!(!scheduler.contains::<Lifecycle>());
        assert_eq!(failures.lock()[0].message, "not ready");
        scheduler.run_group(&mut world, SystemGroup::PostSimulation, time()).unwrap();
        scheduler.shutdown(&mut world);
        assert_eq!(*log.lock(), ["initialize"]);
    }
}
