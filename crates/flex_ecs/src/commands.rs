//! Deferred structural changes.
//!
//! Structural changes invalidate the entity list a query loop is walking.
//! Record them in a [`CommandBuffer`] while iterating, then apply the buffer
//! once the loop is done.

use std::any::Any;

use flex_component::{Component, ComponentId, ComponentMeta, EntityId};
use tracing::{debug, warn};

use crate::error::EcsError;
use crate::scene::Scene;

/// One deferred operation.
#[derive(Debug)]
pub enum Command {
    /// Destroy an entity.
    Destroy(EntityId),
    /// Clone an entity with all of its components.
    Clone(EntityId),
    /// Attach a boxed component.
    Add {
        /// Target entity.
        entity: EntityId,
        /// Function table of the component type.
        meta: ComponentMeta,
        /// The value, of `meta`'s Rust type.
        value: Box<dyn Any + Send>,
    },
    /// Detach a component.
    Remove {
        /// Target entity.
        entity: EntityId,
        /// The component to drop.
        component: ComponentId,
    },
}

impl Command {
    /// The entity the command targets.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        match self {
            Command::Destroy(entity) | Command::Clone(entity) => *entity,
            Command::Add { entity, .. } | Command::Remove { entity, .. } => *entity,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Command::Destroy(_) => "destroy",
            Command::Clone(_) => "clone",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "remove",
        }
    }
}

/// A command that could not be applied.
#[derive(Debug)]
pub struct CommandFailure {
    /// Position of the command in its buffer.
    pub index: usize,
    /// The entity it targeted.
    pub entity: EntityId,
    /// Why it failed.
    pub error: EcsError,
}

/// Outcome of applying a [`CommandBuffer`].
#[derive(Debug, Default)]
pub struct CommandReport {
    /// Commands that ran, including no-op adds and removes.
    pub applied: usize,
    /// Entities created by `Clone` commands, in order.
    pub spawned: Vec<EntityId>,
    /// Commands that failed. Later commands still ran.
    pub failures: Vec<CommandFailure>,
}

impl CommandReport {
    /// Returns `true` if every command succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered list of deferred commands.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// An empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command.
    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Queue destruction of `entity`.
    pub fn destroy(&mut self, entity: EntityId) -> &mut Self {
        self.push(Command::Destroy(entity))
    }

    /// Queue a clone of `entity`.
    pub fn clone_entity(&mut self, entity: EntityId) -> &mut Self {
        self.push(Command::Clone(entity))
    }

    /// Queue attaching `value` to `entity`.
    pub fn add<T: Component>(&mut self, entity: EntityId, value: T) -> &mut Self {
        self.push(Command::Add {
            entity,
            meta: T::meta(),
            value: Box::new(value),
        })
    }

    /// Queue detaching `T` from `entity`.
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> &mut Self {
        self.push(Command::Remove {
            entity,
            component: T::component_id(),
        })
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Apply every command to `scene`, in order. A failing command is logged
    /// and reported; it does not stop the rest.
    pub fn apply(self, scene: &mut Scene) -> CommandReport {
        let mut report = CommandReport::default();
        for (index, command) in self.commands.into_iter().enumerate() {
            let entity = command.entity();
            let kind = command.kind();
            let result = match command {
                Command::Destroy(entity) => scene.destroy_entity(entity),
                Command::Clone(entity) => scene
                    .clone_entity(entity)
                    .map(|clone| report.spawned.push(clone)),
                Command::Add {
                    entity,
                    meta,
                    value,
                } => scene.add_boxed(entity, meta, value).map(drop),
                Command::Remove { entity, component } => {
                    scene.remove_by_id(entity, component).map(drop)
                }
            };
            match result {
                Ok(()) => report.applied += 1,
                Err(error) => {
                    warn!(index, %entity, command = kind, %error, "deferred command failed");
                    report.failures.push(CommandFailure {
                        index,
                        entity,
                        error,
                    });
                }
            }
        }
        debug!(
            applied = report.applied,
            failed = report.failures.len(),
            "applied command buffer"
        );
        report
    }
}
