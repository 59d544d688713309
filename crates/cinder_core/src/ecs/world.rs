//! # ECS World
//!
//! The unit of isolation: one entity table, one store per component type,
//! one write-phase state, one hook registry, one change feed, and a queue of
//! submitted command buffers.
//!
//! ## Mutation rules
//!
//! - Structural changes only through [`CommandBuffer`]s, applied at flush
//! - Value writes in place only while the phase allows them
//! - Every write passes the permission hooks and validators
//!
//! Reads borrow the world immutably, so a query can never observe a flush
//! half-way through.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use super::commands::{BoxedValue, Command, CommandBuffer};
use super::component::{Component, ComponentKey};
use super::entity::{Entities, Entity};
use super::events::{ChangeFeed, ChangeKind, ChangeReceiver};
use super::filter::Filter;
use super::hooks::Hooks;
use super::phase::{PhasePolicy, PhaseState, WritePhase};
use super::storage::{ComponentStorage, ComponentStores};
use crate::config::{RemovalStrictness, WorldConfig, WriteFailurePolicy};
use crate::error::{CommandFailure, DenyReason, EcsError, EcsResult};

static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(0);

/// Outcome of a flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Commands that changed the world.
    pub applied: usize,
    /// Commands that were valid but had nothing to do (destroying a dead
    /// entity, lenient removal of an absent component).
    pub skipped: usize,
    /// Commands rejected by policy, hooks, or storage contracts.
    pub rejected: usize,
}

impl FlushReport {
    /// Adds another report's counts to this one.
    pub fn merge(&mut self, other: Self) {
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.rejected += other.rejected;
    }
}

fn absorb(
    result: EcsResult<FlushReport>,
    report: &mut FlushReport,
    failures: &mut Vec<CommandFailure>,
) -> EcsResult<()> {
    match result {
        Ok(partial) => report.merge(partial),
        Err(EcsError::FlushFailed(mut more)) => failures.append(&mut more),
        Err(other) => return Err(other),
    }
    Ok(())
}

fn finish(report: FlushReport, failures: Vec<CommandFailure>) -> EcsResult<FlushReport> {
    if failures.is_empty() {
        Ok(report)
    } else {
        Err(EcsError::FlushFailed(failures))
    }
}

enum Applied {
    Done,
    Skipped,
}

/// The ECS World - container for all simulation state.
///
/// # Example
///
/// ```rust
/// use cinder_core::{Component, Filter, World};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Heat(u32);
/// impl Component for Heat {}
///
/// let mut world = World::new();
/// let mut commands = world.command_buffer();
/// let spark = commands.create_entity();
/// commands.add(spark, Heat(800));
/// world.flush(commands).unwrap();
///
/// let hot = Filter::builder().with::<Heat>().build();
/// assert_eq!(world.query_entities(&hot).count(), 1);
/// ```
pub struct World {
    id: u32,
    config: WorldConfig,
    entities: Entities,
    components: ComponentStores,
    phase: PhaseState,
    hooks: Hooks,
    changes: ChangeFeed,
    submitted: VecDeque<CommandBuffer>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates a world with the given configuration.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            id: NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed),
            config,
            entities: Entities::new(),
            components: ComponentStores::default(),
            phase: PhaseState::default(),
            hooks: Hooks::default(),
            changes: ChangeFeed::default(),
            submitted: VecDeque::new(),
        }
    }

    /// Process-unique id of this world.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Name from the configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configuration this world runs with.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Changes the reaction to failed writes.
    pub fn set_write_failure_policy(&mut self, policy: WriteFailurePolicy) {
        self.config.write_failure_policy = policy;
    }

    /// Changes how removing an absent component is treated.
    pub fn set_removal_strictness(&mut self, strictness: RemovalStrictness) {
        self.config.removal_strictness = strictness;
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// The entity identity table.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &Entities {
        &self.entities
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Returns the number of live entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.entities.alive_count()
    }

    // =========================================================================
    // Component registry
    // =========================================================================

    /// Registers a component type so untyped paths can use it.
    ///
    /// Typed commands register lazily; registering up front fixes the
    /// enumeration order.
    pub fn register<C: Component>(&mut self) -> ComponentKey {
        self.components.register::<C>()
    }

    /// Checks if a component type is registered.
    #[must_use]
    pub fn is_registered(&self, key: ComponentKey) -> bool {
        self.components.is_registered(key.type_id())
    }

    /// Registered component types, in registration order.
    pub fn registered_components(&self) -> impl Iterator<Item = ComponentKey> + '_ {
        self.components.iter().map(|store| store.key())
    }

    /// Looks up a registered component type by its name.
    #[must_use]
    pub fn component_key(&self, name: &str) -> Option<ComponentKey> {
        self.registered_components().find(|key| key.name() == name)
    }

    pub(crate) const fn stores(&self) -> &ComponentStores {
        &self.components
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a component. Does not consult read hooks.
    #[inline]
    #[must_use]
    pub fn get<C: Component>(&self, entity: Entity) -> Option<&C> {
        self.components.get::<C>()?.get(entity)
    }

    /// Checks if the entity has component `C`.
    #[inline]
    #[must_use]
    pub fn has<C: Component>(&self, entity: Entity) -> bool {
        self.has_key(entity, ComponentKey::of::<C>())
    }

    /// Checks if the entity has the component behind `key`.
    #[inline]
    #[must_use]
    pub fn has_key(&self, entity: Entity, key: ComponentKey) -> bool {
        self.components.contains(entity, key.type_id())
    }

    /// Reads a copy of a component, honoring read permission hooks.
    ///
    /// Never fails: missing components and denied reads are both `None`.
    #[must_use]
    pub fn try_read<C: Component>(&self, entity: Entity) -> Option<C> {
        let value = self.get::<C>(entity)?;
        self.hooks
            .can_read(self, entity, ComponentKey::of::<C>())
            .then(|| value.clone())
    }

    /// Type-erased read, honoring read permission hooks.
    #[must_use]
    pub fn read_dyn(&self, entity: Entity, key: ComponentKey) -> Option<&dyn Any> {
        let value = self.components.erased(key.type_id())?.get_dyn(entity)?;
        self.hooks.can_read(self, entity, key).then_some(value)
    }

    /// The store for `C`, if any entity ever had one.
    #[must_use]
    pub fn storage<C: Component>(&self) -> Option<&ComponentStorage<C>> {
        self.components.get::<C>()
    }

    /// Every component of one entity, in registration order.
    pub fn components_of(&self, entity: Entity) -> impl Iterator<Item = (ComponentKey, &dyn Any)> + '_ {
        self.components
            .iter()
            .filter_map(move |store| store.get_dyn(entity).map(|value| (store.key(), value)))
    }

    /// Visits every live `(entity, component, value)` triple.
    ///
    /// Order is registration order of the types, then packed order within
    /// each store. Intended for serialization and tooling.
    pub fn for_each_component(&self, mut visit: impl FnMut(Entity, ComponentKey, &dyn Any)) {
        for store in self.components.iter() {
            let key = store.key();
            for &entity in store.entities() {
                if let Some(value) = store.get_dyn(entity) {
                    visit(entity, key, value);
                }
            }
        }
    }

    /// Live entities matching a filter.
    ///
    /// Iteration is driven by the smallest required store, or by the entity
    /// table when the filter requires nothing.
    pub fn query_entities<'w>(&'w self, filter: &'w Filter) -> Box<dyn Iterator<Item = Entity> + 'w> {
        let driver = filter
            .required()
            .iter()
            .map(|key| self.components.erased(key.type_id()).map(|store| store.entities()))
            .min_by_key(|entities| entities.map_or(0, <[Entity]>::len));

        match driver {
            // A required type has no store at all: nothing can match.
            Some(None) => Box::new(std::iter::empty()),
            Some(Some(entities)) => Box::new(
                entities
                    .iter()
                    .copied()
                    .filter(move |&entity| filter.matches(&self.components, entity)),
            ),
            None => Box::new(
                self.entities
                    .iter_alive()
                    .filter(move |&entity| filter.matches(&self.components, entity)),
            ),
        }
    }

    // =========================================================================
    // Write phase
    // =========================================================================

    /// Current phase and policy.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> PhaseState {
        self.phase
    }

    /// Moves the world into a phase. Called by the scheduler around groups.
    pub fn enter_phase(&mut self, phase: WritePhase, policy: PhasePolicy) {
        tracing::trace!(world = self.id, ?phase, ?policy, "enter phase");
        self.phase.enter(phase, policy);
    }

    /// Returns to the permissive `None` phase.
    pub fn reset_phase(&mut self) {
        self.phase.reset();
    }

    // =========================================================================
    // Hooks and change stream
    // =========================================================================

    /// The permission/validation hook registry.
    #[must_use]
    pub const fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Mutable access to the hook registry.
    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// Subscribes to committed changes of component `C`.
    pub fn subscribe<C: Component>(&mut self) -> ChangeReceiver {
        self.changes.subscribe(ComponentKey::of::<C>())
    }

    /// Sends a `Snapshot` event for every current holder of `C`.
    ///
    /// Returns the number of events sent.
    pub fn snapshot<C: Component>(&mut self) -> usize {
        let key = ComponentKey::of::<C>();
        if !self.changes.is_watched(key) {
            return 0;
        }
        let Some(store) = self.components.get::<C>() else {
            return 0;
        };
        let holders: Vec<Entity> = store.entities().to_vec();
        for &entity in &holders {
            self.changes.emit(entity, key, ChangeKind::Snapshot);
        }
        holders.len()
    }

    // =========================================================================
    // Command buffers
    // =========================================================================

    /// Acquires an empty command buffer bound to this world.
    #[must_use]
    pub fn command_buffer(&self) -> CommandBuffer {
        CommandBuffer::new(self.id, self.entities.reserver())
    }

    /// Queues a finished buffer for the next flush point.
    ///
    /// # Errors
    ///
    /// Returns `ForeignCommandBuffer` if another world issued the buffer.
    pub fn submit(&mut self, buffer: CommandBuffer) -> EcsResult<()> {
        self.check_owner(&buffer)?;
        self.submitted.push_back(buffer);
        Ok(())
    }

    /// Number of submitted buffers waiting for a flush point.
    #[must_use]
    pub fn pending_buffers(&self) -> usize {
        self.submitted.len()
    }

    /// Flushes every submitted buffer, in submission order.
    ///
    /// # Errors
    ///
    /// Returns `FlushFailed` under the `Throw` policy if any command was
    /// rejected. All buffers are still applied in full.
    pub fn flush_pending(&mut self) -> EcsResult<FlushReport> {
        let mut report = FlushReport::default();
        let mut failures = Vec::new();

        while let Some(buffer) = self.submitted.pop_front() {
            absorb(self.flush(buffer), &mut report, &mut failures)?;
        }
        finish(report, failures)
    }

    /// Runs one flush point: `buffer` first, then every submitted buffer.
    ///
    /// Rejections in `buffer` never hold back the submitted buffers.
    ///
    /// # Errors
    ///
    /// `FlushFailed` under the `Throw` policy, carrying the rejections of
    /// both in that order.
    pub fn flush_point(&mut self, buffer: CommandBuffer) -> EcsResult<FlushReport> {
        let mut report = FlushReport::default();
        let mut failures = Vec::new();

        absorb(self.flush(buffer), &mut report, &mut failures)?;
        absorb(self.flush_pending(), &mut report, &mut failures)?;
        finish(report, failures)
    }

    fn check_owner(&self, buffer: &CommandBuffer) -> EcsResult<()> {
        if buffer.world_id() == self.id {
            Ok(())
        } else {
            Err(EcsError::ForeignCommandBuffer {
                buffer_world: buffer.world_id(),
                target_world: self.id,
            })
        }
    }

    /// Applies a buffer's commands in recorded order and consumes it.
    ///
    /// Each command is re-checked against the current phase and hooks. A
    /// rejected command does not undo the ones before it, and every command
    /// is attempted.
    ///
    /// # Errors
    ///
    /// - `ForeignCommandBuffer` if another world issued the buffer; nothing
    ///   is applied.
    /// - `FlushFailed` under the `Throw` policy if any command was rejected.
    pub fn flush(&mut self, mut buffer: CommandBuffer) -> EcsResult<FlushReport> {
        // A foreign buffer is dropped whole; its reservations return to the
        // world that issued it.
        self.check_owner(&buffer)?;

        let commands = buffer.take_commands();
        let reserver = self.entities.reserver();
        let mut report = FlushReport::default();
        let mut failures = Vec::new();

        for (position, command) in commands.into_iter().enumerate() {
            let label = command.label();
            let created = match &command {
                Command::CreateEntity(entity) => Some(*entity),
                _ => None,
            };

            match self.apply(command) {
                Ok(Applied::Done) => report.applied += 1,
                Ok(Applied::Skipped) => report.skipped += 1,
                Err(error) => {
                    if let Some(entity) = created {
                        reserver.release(entity);
                    }
                    report.rejected += 1;
                    self.record_rejection(position, label, error, &mut failures);
                }
            }
        }

        tracing::trace!(world = self.id, ?report, "flushed command buffer");
        if failures.is_empty() {
            Ok(report)
        } else {
            Err(EcsError::FlushFailed(failures))
        }
    }

    fn record_rejection(
        &self,
        position: usize,
        label: &'static str,
        error: EcsError,
        failures: &mut Vec<CommandFailure>,
    ) {
        match self.config.write_failure_policy {
            WriteFailurePolicy::Throw => failures.push(CommandFailure { position, error }),
            WriteFailurePolicy::Log => {
                tracing::warn!(world = self.id, position, command = label, %error, "command rejected at flush");
            }
            WriteFailurePolicy::Ignore => {}
        }
    }

    fn require_structural(&self, entity: Entity) -> EcsResult<()> {
        if self.phase.can_structural_write() {
            return Ok(());
        }
        let reason = if self.phase.can_value_write() {
            DenyReason::PhaseDeniesStructural
        } else {
            DenyReason::PhaseDeniesWrites
        };
        Err(EcsError::WriteDenied { entity, reason })
    }

    fn require_value_write(&self, entity: Entity) -> EcsResult<()> {
        if self.phase.can_value_write() {
            Ok(())
        } else {
            Err(EcsError::WriteDenied {
                entity,
                reason: DenyReason::PhaseDeniesWrites,
            })
        }
    }

    fn require_alive(&self, entity: Entity) -> EcsResult<()> {
        if self.entities.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::DeadEntity(entity))
        }
    }

    fn require_permission(&self, entity: Entity, key: ComponentKey) -> EcsResult<()> {
        if self.hooks.can_write(self, entity, key) {
            Ok(())
        } else {
            Err(EcsError::WriteDenied {
                entity,
                reason: DenyReason::Permission,
            })
        }
    }

    fn require_valid(&self, entity: Entity, key: ComponentKey, value: &dyn Any) -> EcsResult<()> {
        if self.hooks.validate(key, value) {
            Ok(())
        } else {
            Err(EcsError::ValidationFailed {
                entity,
                component: key,
            })
        }
    }

    fn ensure_registered(&mut self, boxed: &BoxedValue) -> EcsResult<()> {
        if self.components.is_registered(boxed.key.type_id()) {
            return Ok(());
        }
        match boxed.register {
            Some(register) => {
                register(&mut self.components);
                Ok(())
            }
            None => Err(EcsError::UnregisteredComponent(boxed.key.name())),
        }
    }

    fn apply(&mut self, command: Command) -> EcsResult<Applied> {
        match command {
            Command::CreateEntity(entity) => {
                self.require_structural(entity)?;
                if self.entities.materialize(entity) {
                    Ok(Applied::Done)
                } else {
                    Err(EcsError::DeadEntity(entity))
                }
            }
            Command::DestroyEntity(entity) => {
                if !self.entities.is_alive(entity) {
                    return Ok(Applied::Skipped);
                }
                self.require_structural(entity)?;
                let held: Vec<ComponentKey> = self.components_of(entity).map(|(key, _)| key).collect();
                for &key in &held {
                    self.require_permission(entity, key)?;
                }
                self.despawn(entity, &held);
                Ok(Applied::Done)
            }
            Command::AddComponent(entity, boxed) => {
                self.require_alive(entity)?;
                self.require_structural(entity)?;
                self.require_permission(entity, boxed.key)?;
                self.ensure_registered(&boxed)?;
                if self.has_key(entity, boxed.key) {
                    return Err(EcsError::DuplicateComponent {
                        entity,
                        component: boxed.key,
                    });
                }
                self.require_valid(entity, boxed.key, boxed.value.as_ref())?;

                let key = boxed.key;
                let store = self
                    .components
                    .erased_mut(key.type_id())
                    .ok_or(EcsError::UnregisteredComponent(key.name()))?;
                store.add_boxed(entity, boxed.value)?;
                self.changes.emit(entity, key, ChangeKind::Added);
                Ok(Applied::Done)
            }
            Command::ReplaceComponent(entity, boxed) => {
                self.require_alive(entity)?;
                self.require_value_write(entity)?;
                self.require_permission(entity, boxed.key)?;
                if !self.has_key(entity, boxed.key) {
                    return Err(EcsError::ComponentMissing {
                        entity,
                        component: boxed.key,
                    });
                }
                self.require_valid(entity, boxed.key, boxed.value.as_ref())?;

                let key = boxed.key;
                let store = self
                    .components
                    .erased_mut(key.type_id())
                    .ok_or(EcsError::UnregisteredComponent(key.name()))?;
                store.replace_boxed(entity, boxed.value)?;
                self.changes.emit(entity, key, ChangeKind::Changed);
                Ok(Applied::Done)
            }
            Command::RemoveComponent(entity, key) => {
                self.require_alive(entity)?;
                self.require_structural(entity)?;
                self.require_permission(entity, key)?;
                if !self.has_key(entity, key) {
                    return match self.config.removal_strictness {
                        RemovalStrictness::Strict => Err(EcsError::ComponentMissing {
                            entity,
                            component: key,
                        }),
                        RemovalStrictness::Lenient => Ok(Applied::Skipped),
                    };
                }

                if let Some(store) = self.components.erased_mut(key.type_id()) {
                    store.remove_entity(entity);
                }
                self.changes.emit(entity, key, ChangeKind::Removed);
                Ok(Applied::Done)
            }
        }
    }

    fn despawn(&mut self, entity: Entity, held: &[ComponentKey]) {
        for store in self.components.iter_mut() {
            store.remove_entity(entity);
        }
        for &key in held {
            self.changes.emit(entity, key, ChangeKind::Removed);
        }
        self.entities.destroy(entity);
    }

    // =========================================================================
    // Direct value writes
    // =========================================================================

    fn direct_failure(&self, error: EcsError) -> EcsResult<bool> {
        match self.config.write_failure_policy {
            WriteFailurePolicy::Throw => Err(error),
            WriteFailurePolicy::Log => {
                tracing::warn!(world = self.id, %error, "direct write rejected");
                Ok(false)
            }
            WriteFailurePolicy::Ignore => Ok(false),
        }
    }

    /// Writes a component value in place.
    ///
    /// `update` runs on a copy; the copy is committed only if the validators
    /// accept it. Returns `Ok(false)` when the write was rejected under the
    /// `Log` or `Ignore` policy.
    ///
    /// # Errors
    ///
    /// Under the `Throw` policy: `DeadEntity`, `WriteDenied`,
    /// `ComponentMissing`, or `ValidationFailed`.
    pub fn write<C: Component>(&mut self, entity: Entity, update: impl FnOnce(&mut C)) -> EcsResult<bool> {
        let key = ComponentKey::of::<C>();
        if !self.entities.is_alive(entity) {
            return self.direct_failure(EcsError::DeadEntity(entity));
        }
        if !self.phase.can_value_write() {
            return self.direct_failure(EcsError::WriteDenied {
                entity,
                reason: DenyReason::PhaseDeniesWrites,
            });
        }
        if let Err(error) = self.require_permission(entity, key) {
            return self.direct_failure(error);
        }
        let Some(current) = self.get::<C>(entity) else {
            return self.direct_failure(EcsError::ComponentMissing {
                entity,
                component: key,
            });
        };

        let mut candidate = current.clone();
        update(&mut candidate);
        if let Err(error) = self.require_valid(entity, key, &candidate) {
            return self.direct_failure(error);
        }

        if let Some(slot) = self.components.get_mut::<C>().and_then(|store| store.get_mut(entity)) {
            *slot = candidate;
        }
        self.changes.emit(entity, key, ChangeKind::Changed);
        Ok(true)
    }

    /// Writes every `C` whose entity matches `filter`, in place.
    ///
    /// The phase is checked once. Permission hooks and validators, when any
    /// are registered, are checked per entity. Returns the number of values
    /// written.
    ///
    /// # Errors
    ///
    /// Under the `Throw` policy: `PhaseDenied`, or the first per-entity
    /// rejection. Values written before the rejection stay written.
    pub fn write_each<C: Component>(
        &mut self,
        filter: Option<&Filter>,
        mut update: impl FnMut(Entity, &mut C),
    ) -> EcsResult<usize> {
        let key = ComponentKey::of::<C>();
        if !self.phase.can_value_write() {
            return self
                .direct_failure(EcsError::PhaseDenied(self.phase.phase()))
                .map(|_| 0);
        }

        let Some(store) = self.components.get::<C>() else {
            return Ok(0);
        };
        let targets: Vec<Entity> = store
            .entities()
            .iter()
            .copied()
            .filter(|&entity| filter.map_or(true, |filter| filter.matches(&self.components, entity)))
            .collect();

        let check_permission = self.hooks.has_write_permissions();
        let check_value = self.hooks.has_validators_for(key);
        let mut written = 0;

        for entity in targets {
            if check_permission {
                if let Err(error) = self.require_permission(entity, key) {
                    self.direct_failure(error)?;
                    continue;
                }
            }

            let Some(slot) = self.components.get_mut::<C>().and_then(|store| store.get_mut(entity)) else {
                continue;
            };

            if check_value {
                let mut candidate = slot.clone();
                update(entity, &mut candidate);
                if let Err(error) = self.require_valid(entity, key, &candidate) {
                    self.direct_failure(error)?;
                    continue;
                }
                if let Some(slot) = self.components.get_mut::<C>().and_then(|store| store.get_mut(entity)) {
                    *slot = candidate;
                }
            } else {
                update(entity, slot);
            }

            written += 1;
            self.changes.emit(entity, key, ChangeKind::Changed);
        }

        Ok(written)
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("alive", &self.entities.alive_count())
            .field("phase", &self.phase)
            .field("submitted", &self.submitted.len())
            .finish_non_exhaustive()
    }
}
