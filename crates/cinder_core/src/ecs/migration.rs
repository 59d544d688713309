//! # Post-Load Migrations
//!
//! Callbacks a loader runs once storage has been restored. Each migration
//! reads the world and records its fixes into a command buffer, which is
//! flushed before the next migration runs, so later migrations see the
//! effects of earlier ones and every change obeys the active phase.
//!
//! Migrations must be idempotent: a loader may run them on data that was
//! already migrated.

use super::commands::CommandBuffer;
use super::world::{FlushReport, World};
use crate::error::EcsResult;

type MigrationFn = dyn Fn(&World, &mut CommandBuffer) + Send + Sync;

struct Migration {
    name: &'static str,
    priority: i32,
    sequence: usize,
    run: Box<MigrationFn>,
}

/// Ordered list of post-load migrations.
///
/// Lower priorities run first; equal priorities run in registration order.
#[derive(Default)]
pub struct MigrationRegistry {
    migrations: Vec<Migration>,
}

impl MigrationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a migration.
    pub fn register<F>(&mut self, name: &'static str, priority: i32, migration: F)
    where
        F: Fn(&World, &mut CommandBuffer) + Send + Sync + 'static,
    {
        let sequence = self.migrations.len();
        self.migrations.push(Migration {
            name,
            priority,
            sequence,
            run: Box::new(migration),
        });
        self.migrations
            .sort_by_key(|migration| (migration.priority, migration.sequence));
    }

    /// Names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.migrations.iter().map(|migration| migration.name)
    }

    /// Number of registered migrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Runs every migration against `world`, flushing after each.
    ///
    /// # Errors
    ///
    /// Stops at the first flush that fails under the `Throw` policy and
    /// returns its error. Migrations already run stay applied.
    pub fn run(&self, world: &mut World) -> EcsResult<FlushReport> {
        let mut report = FlushReport::default();
        for migration in &self.migrations {
            let mut commands = world.command_buffer();
            (migration.run)(world, &mut commands);

            tracing::debug!(
                world = world.id(),
                migration = migration.name,
                commands = commands.len(),
                "running post-load migration"
            );
            report.merge(world.flush(commands)?);
        }
        Ok(report)
    }
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
