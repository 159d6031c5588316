//! # flex_ecs
//!
//! Scenes for the FlexECS storage engine.
//!
//! A [`Scene`] owns the archetype tables defined in `flex_component` and
//! the indices that route into them:
//!
//! - the entity index, `EntityId -> (archetype, row)`;
//! - the component index, `ComponentId -> (archetype -> column)`;
//! - per-scene [`StringStorage`] for cheap string handles;
//! - a [`QueryCache`] keyed by [`QueryDescriptor`](flex_component::QueryDescriptor).
//!
//! Structural changes can be deferred with a [`CommandBuffer`], and scenes
//! are saved and loaded as `.flxscene` JSON documents. Single entities
//! travel as `.flxprefab` [`EntityDocument`]s. [`SceneManager`]
//! tracks the active scene.

pub mod builtin;
pub mod commands;
pub mod config;
pub mod entity;
pub mod error;
pub mod index;
pub mod manager;
pub mod prefab;
pub mod query;
pub mod scene;
pub mod serialize;
pub mod strings;

pub use builtin::EntityName;
pub use commands::{Command, CommandBuffer, CommandFailure, CommandReport};
pub use config::{QueryInvalidation, SceneConfig};
pub use entity::{EntityMut, EntityRef};
pub use error::{EcsError, EcsResult};
pub use index::{ArchetypeRecord, ComponentIndex, EntityIndex, EntityRecord};
pub use manager::SceneManager;
pub use prefab::{EntityDocument, PREFAB_FORMAT, PREFAB_VERSION};
pub use query::{QueryCache, QueryResult};
pub use scene::{ComponentData, Scene};
pub use serialize::{ArchetypeDocument, SceneDocument};
pub use strings::{StringIndex, StringStorage};
