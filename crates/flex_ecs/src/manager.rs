//! Active scene management.
//!
//! The [`SceneManager`] owns at most one active [`Scene`] together with the
//! type registry used to load scenes from disk. Swapping scenes hands the
//! previous one back to the caller.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use flex_component::{EntityId, TypeRegistry};
use tracing::{info, warn};

use crate::config::SceneConfig;
use crate::error::EcsResult;
use crate::scene::Scene;

/// Owner of the active scene.
#[derive(Debug)]
pub struct SceneManager {
    registry: Arc<TypeRegistry>,
    config: SceneConfig,
    active: Option<Scene>,
}

impl SceneManager {
    /// A manager with no active scene.
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>, config: SceneConfig) -> Self {
        Self {
            registry,
            config,
            active: None,
        }
    }

    /// The registry used to load scenes.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The configuration given to new and loaded scenes.
    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// A new empty scene using the manager's configuration. It is not made
    /// active.
    #[must_use]
    pub fn create_scene(&self) -> Scene {
        Scene::with_config(self.config.clone())
    }

    /// Make `scene` active, returning the previously active scene.
    pub fn set_active_scene(&mut self, scene: Scene) -> Option<Scene> {
        info!(entities = scene.entity_count(), "activated scene");
        self.active.replace(scene)
    }

    /// Remove and return the active scene.
    pub fn take_active_scene(&mut self) -> Option<Scene> {
        self.active.take()
    }

    /// The active scene, if any.
    #[must_use]
    pub fn active_scene(&self) -> Option<&Scene> {
        self.active.as_ref()
    }

    /// The active scene, creating an empty one if none is active.
    pub fn active_scene_mut(&mut self) -> &mut Scene {
        let config = &self.config;
        self.active.get_or_insert_with(|| {
            warn!("no active scene, creating an empty one");
            Scene::with_config(config.clone())
        })
    }

    /// Load a scene from a reader. It is not made active.
    ///
    /// # Errors
    ///
    /// See [`Scene::from_document`].
    pub fn load<R: std::io::Read>(&self, reader: R) -> EcsResult<Scene> {
        Scene::load(reader, &self.registry, self.config.clone())
    }

    /// Load a scene file and make it active, returning the previous scene.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened, otherwise see
    /// [`Scene::from_document`]. The active scene is unchanged on error.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> EcsResult<Option<Scene>> {
        let path = path.as_ref();
        let scene = self.load(BufReader::new(File::open(path)?))?;
        info!(path = %path.display(), "loaded scene file");
        Ok(self.set_active_scene(scene))
    }

    /// Write the active scene to a writer. Does nothing if no scene is active.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or the writer fails.
    pub fn save_active_scene<W: Write>(&self, writer: W) -> EcsResult<bool> {
        match &self.active {
            Some(scene) => {
                scene.save(writer)?;
                Ok(true)
            }
            None => {
                warn!("no active scene to save");
                Ok(false)
            }
        }
    }

    /// Write the active scene to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save_file(&self, path: impl AsRef<Path>) -> EcsResult<bool> {
        let path = path.as_ref();
        if self.active.is_none() {
            warn!(path = %path.display(), "no active scene to save");
            return Ok(false);
        }
        let mut writer = BufWriter::new(File::create(path)?);
        let saved = self.save_active_scene(&mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), "saved scene file");
        Ok(saved)
    }

    /// Write one entity of the active scene to a prefab file. Returns
    /// `false` if no scene is active.
    ///
    /// # Errors
    ///
    /// See [`Scene::save_entity`]; also fails if the file cannot be created.
    pub fn save_prefab_file(&self, entity: EntityId, path: impl AsRef<Path>) -> EcsResult<bool> {
        let path = path.as_ref();
        let Some(scene) = &self.active else {
            warn!(path = %path.display(), "no active scene to save a prefab from");
            return Ok(false);
        };
        let document = scene.entity_document(entity)?;
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writer.flush()?;
        info!(path = %path.display(), %entity, "saved prefab file");
        Ok(true)
    }

    /// Instantiate a prefab file into the active scene, creating one if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened, otherwise see
    /// [`Scene::instantiate`].
    pub fn instantiate_file(&mut self, path: impl AsRef<Path>) -> EcsResult<EntityId> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let registry = Arc::clone(&self.registry);
        let entity = self.active_scene_mut().load_entity(reader, &registry)?;
        info!(path = %path.display(), %entity, "instantiated prefab file");
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SceneManager {
        SceneManager::new(Arc::new(TypeRegistry::with_primitives()), SceneConfig::default())
    }

    #[test]
    fn test_active_scene_is_created_on_demand() {
        let mut manager = manager();
        assert!(manager.active_scene().is_none());
        let e = manager.active_scene_mut().create_entity(Some("Camera"));
        assert_eq!(manager.active_scene().and_then(|s| s.entity_name(e)), Some("Camera"));
    }

    #[test]
    fn test_set_active_scene_returns_previous() {
        let mut manager = manager();
        let mut first = manager.create_scene();
        first.create_empty_entity();
        assert!(manager.set_active_scene(first).is_none());

        let previous = manager.set_active_scene(manager.create_scene()).unwrap();
        assert_eq!(previous.entity_count(), 1);
        assert_eq!(manager.active_scene().map(Scene::entity_count), Some(0));
    }

    #[test]
    fn test_save_and_load_through_manager() {
        let mut manager = manager();
        let mut bytes = Vec::new();
        assert!(!manager.save_active_scene(&mut bytes).unwrap());

        manager.active_scene_mut().create_entity(Some("Saved"));
        assert!(manager.save_active_scene(&mut bytes).unwrap());

        let loaded = manager.load(bytes.as_slice()).unwrap();
        assert!(loaded.entity_by_name("Saved").is_some());
    }

    #[test]
    fn test_prefab_file_roundtrip() {
        let dir = std::env::temp_dir().join(format!("flex_ecs_prefab_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lamp.flxprefab");

        let mut manager = manager();
        assert!(!manager.save_prefab_file(EntityId::NULL, &path).unwrap());

        let lamp = manager.active_scene_mut().create_entity(Some("Lamp"));
        assert!(manager.save_prefab_file(lamp, &path).unwrap());

        manager.set_active_scene(manager.create_scene());
        let copy = manager.instantiate_file(&path).unwrap();
        assert_eq!(
            manager.active_scene().and_then(|s| s.entity_name(copy)),
            Some("Lamp")
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
