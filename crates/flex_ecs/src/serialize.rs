//! Saving and loading `.flxscene` documents.
//!
//! A document is JSON:
//!
//! ```text
//! {
//!   "format": "flxscene",
//!   "version": 1,
//!   "allocator": { ... },
//!   "strings": { "strings": ["", ...], "free": [...] },
//!   "archetypes": [
//!     { "id": 1, "type": ["EntityName", "Position"], "entities": [4294967297],
//!       "table": [[{"type":"EntityName","data":1}], [{"type":"Position","data":{...}}]] }
//!   ]
//! }
//! ```
//!
//! `table` is column-major: `table[c][r]` is the record for component
//! `type[c]` of `entities[r]`. Loading rebuilds the archetypes and both
//! indices from scratch; archetype IDs in the file are informational.

use std::any::Any;
use std::collections::HashSet;
use std::io::{Read, Write};

use flex_component::{ArchetypeId, ComponentMeta, EntityAllocator, EntityId, TypeRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SceneConfig;
use crate::error::{EcsError, EcsResult};
use crate::index::EntityRecord;
use crate::scene::Scene;
use crate::strings::StringStorage;

/// Value of the `format` field.
pub const SCENE_FORMAT: &str = "flxscene";

/// Highest document version this build reads and the version it writes.
pub const SCENE_VERSION: u32 = 1;

/// A whole scene as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Always [`SCENE_FORMAT`].
    pub format: String,
    /// Document version.
    pub version: u32,
    /// Entity ID allocator state, so recycled slots keep their generations.
    pub allocator: EntityAllocator,
    /// The scene's string storage.
    pub strings: StringStorage,
    /// One entry per archetype.
    pub archetypes: Vec<ArchetypeDocument>,
}

/// One archetype's rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeDocument {
    /// Archetype ID at save time.
    pub id: u32,
    /// Component names, one per column.
    #[serde(rename = "type")]
    pub components: Vec<String>,
    /// Entity per row.
    pub entities: Vec<EntityId>,
    /// Column-major `{"type":..,"data":..}` records.
    pub table: Vec<Vec<Value>>,
}

impl Scene {
    /// Capture the scene as a document.
    ///
    /// # Errors
    ///
    /// Returns a reflection error if a component cannot be serialised.
    pub fn to_document(&self) -> EcsResult<SceneDocument> {
        let mut archetypes = Vec::with_capacity(self.archetypes.len());
        for table in &self.archetypes {
            let mut columns = Vec::with_capacity(table.columns.len());
            for column in &table.columns {
                let meta = column.meta();
                let mut records = Vec::with_capacity(column.len());
                for row in 0..column.len() {
                    let Some(value) = column.get_any(row) else {
                        continue;
                    };
                    let mut text = String::new();
                    (meta.serialize_fn)(value, &mut text)?;
                    records.push(serde_json::from_str(&text)?);
                }
                columns.push(records);
            }
            archetypes.push(ArchetypeDocument {
                id: table.id.0,
                components: table
                    .columns
                    .iter()
                    .map(|column| column.meta().name.to_string())
                    .collect(),
                entities: table.entities.clone(),
                table: columns,
            });
        }

        Ok(SceneDocument {
            format: SCENE_FORMAT.to_string(),
            version: SCENE_VERSION,
            allocator: self.allocator.clone(),
            strings: self.strings.clone(),
            archetypes,
        })
    }

    /// Write the scene as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if a component cannot be serialised or the writer fails.
    pub fn save<W: Write>(&self, writer: W) -> EcsResult<()> {
        let document = self.to_document()?;
        serde_json::to_writer_pretty(writer, &document)?;
        info!(
            entities = self.entity_count(),
            archetypes = self.archetypes.len(),
            "saved scene"
        );
        Ok(())
    }

    /// Read a scene saved with [`Scene::save`].
    ///
    /// # Errors
    ///
    /// See [`Scene::from_document`].
    pub fn load<R: Read>(reader: R, registry: &TypeRegistry, config: SceneConfig) -> EcsResult<Self> {
        let document: SceneDocument = serde_json::from_reader(reader)?;
        Self::from_document(document, registry, config)
    }

    /// Rebuild a scene from a document, resolving component names through
    /// `registry`.
    ///
    /// Unless `config.strict_load` is set, a column naming an unregistered
    /// component is dropped and a record that fails to deserialise leaves the
    /// component at its default value. Both are logged.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidDocument`] if the document is structurally
    /// inconsistent. In strict mode, also [`EcsError::UnknownComponent`] or
    /// the reflection failure of the first bad record.
    pub fn from_document(
        document: SceneDocument,
        registry: &TypeRegistry,
        config: SceneConfig,
    ) -> EcsResult<Self> {
        if document.format != SCENE_FORMAT {
            return Err(EcsError::InvalidDocument(format!(
                "format is '{}', expected '{SCENE_FORMAT}'",
                document.format
            )));
        }
        if document.version > SCENE_VERSION {
            return Err(EcsError::InvalidDocument(format!(
                "version {} is newer than supported version {SCENE_VERSION}",
                document.version
            )));
        }
        if !document.allocator.is_consistent() {
            return Err(EcsError::InvalidDocument("allocator state is inconsistent".into()));
        }
        if !document.strings.is_consistent() {
            return Err(EcsError::InvalidDocument("string storage is inconsistent".into()));
        }

        let strict = config.strict_load;
        let mut scene = Scene::with_config(config);
        scene.allocator = document.allocator;
        scene.strings = document.strings;

        for archetype in &document.archetypes {
            scene.load_archetype(archetype, registry, strict)?;
        }
        scene.split_shared_names();

        let touched: Vec<ArchetypeId> = scene.archetypes.iter().map(|table| table.id).collect();
        scene.structural_change(&touched);

        if let Some(problem) = scene.integrity_error() {
            return Err(EcsError::InvalidDocument(problem));
        }
        info!(
            entities = scene.entity_count(),
            archetypes = scene.archetypes.len(),
            "loaded scene"
        );
        Ok(scene)
    }

    fn load_archetype(
        &mut self,
        archetype: &ArchetypeDocument,
        registry: &TypeRegistry,
        strict: bool,
    ) -> EcsResult<()> {
        let rows = archetype.entities.len();
        if archetype.table.len() != archetype.components.len() {
            return Err(EcsError::InvalidDocument(format!(
                "archetype {} lists {} components but {} columns",
                archetype.id,
                archetype.components.len(),
                archetype.table.len()
            )));
        }
        if let Some(column) = archetype.table.iter().position(|column| column.len() != rows) {
            return Err(EcsError::InvalidDocument(format!(
                "archetype {} column '{}' does not have {rows} rows",
                archetype.id, archetype.components[column]
            )));
        }

        // (document column, meta) for every column that can be read.
        let mut known: Vec<(usize, ComponentMeta)> = Vec::new();
        let mut seen = HashSet::new();
        for (column, name) in archetype.components.iter().enumerate() {
            if !seen.insert(name.as_str()) {
                return Err(EcsError::InvalidDocument(format!(
                    "archetype {} lists '{name}' twice",
                    archetype.id
                )));
            }
            if let Some(meta) = self.resolve_component(name, registry, strict)? {
                known.push((column, meta));
            }
        }

        let metas: Vec<ComponentMeta> = known.iter().map(|(_, meta)| *meta).collect();
        let target = self.get_or_create_archetype(&metas);

        for (row, &entity) in archetype.entities.iter().enumerate() {
            if !self.allocator.is_alive(entity) {
                return Err(EcsError::InvalidDocument(format!(
                    "{entity} is stored but not allocated"
                )));
            }
            if self.entity_index.contains(entity) {
                return Err(EcsError::InvalidDocument(format!("{entity} is stored twice")));
            }

            let table = &mut self.archetypes[target.index()];
            for (column, meta) in &known {
                let record = &archetype.table[*column][row];
                let Some(slot) = table.column_mut(meta.id) else {
                    continue;
                };
                slot.push_default();
                let last = slot.len() - 1;
                if let Some(value) = slot.get_any_mut(last) {
                    read_record(value, meta, record, entity, strict)?;
                }
            }
            table.entities.push(entity);
            let row = table.len() - 1;
            self.entity_index.insert(
                entity,
                EntityRecord {
                    archetype: target,
                    row,
                },
            );
        }

        debug!(
            archetype = archetype.id,
            target = %target,
            rows,
            "loaded archetype"
        );
        Ok(())
    }

    /// Find the function table for a stored component name, registering it
    /// with the scene. `Ok(None)` means the name is unknown and should be
    /// skipped.
    pub(crate) fn resolve_component(
        &mut self,
        name: &str,
        registry: &TypeRegistry,
        strict: bool,
    ) -> EcsResult<Option<ComponentMeta>> {
        let meta = self
            .component_meta_by_name(name)
            .or_else(|| registry.component(name))
            .copied();
        match meta {
            Some(meta) => {
                self.register_meta(meta)?;
                Ok(Some(meta))
            }
            None if strict => Err(EcsError::UnknownComponent(name.to_string())),
            None => {
                warn!(component = %name, "unknown component, skipping");
                Ok(None)
            }
        }
    }
}

/// Deserialise `record` into `value`. Outside strict mode a failure leaves
/// `value` untouched and is only logged.
pub(crate) fn read_record(
    value: &mut dyn Any,
    meta: &ComponentMeta,
    record: &Value,
    entity: EntityId,
    strict: bool,
) -> EcsResult<()> {
    if let Err(error) = (meta.deserialize_fn)(value, record) {
        if strict {
            return Err(error.into());
        }
        warn!(%entity, component = meta.name, %error, "unreadable component, keeping default");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flex_component::Component;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Score(i64);
    impl Component for Score {
        fn type_name() -> &'static str {
            "Score"
        }
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::with_primitives();
        registry.register::<Score>();
        registry
    }

    #[test]
    fn test_document_shape() {
        let mut scene = Scene::new();
        let e = scene.create_entity(Some("Counter"));
        scene.add_component(e, Score(12)).unwrap();

        let document = scene.to_document().unwrap();
        assert_eq!(document.format, "flxscene");
        let table = document
            .archetypes
            .iter()
            .find(|a| a.entities == vec![e])
            .unwrap();
        assert_eq!(table.components.len(), 2);
        let column = table.components.iter().position(|c| c == "Score").unwrap();
        assert_eq!(
            table.table[column][0],
            serde_json::json!({"type": "Score", "data": 12})
        );
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut scene = Scene::new();
        let a = scene.create_entity(Some("A"));
        let b = scene.create_entity(Some("B \"quoted\"\n"));
        scene.add_component(a, Score(-5)).unwrap();
        let gone = scene.create_empty_entity();
        scene.destroy_entity(gone).unwrap();

        let mut bytes = Vec::new();
        scene.save(&mut bytes).unwrap();
        let mut loaded = Scene::load(bytes.as_slice(), &registry(), SceneConfig::default()).unwrap();

        assert!(loaded.is_consistent());
        assert_eq!(loaded.entity_count(), 2);
        assert_eq!(loaded.try_get_component::<Score>(a), Some(&Score(-5)));
        assert_eq!(loaded.entity_name(b), Some("B \"quoted\"\n"));
        assert!(!loaded.is_alive(gone));

        let fresh = loaded.create_empty_entity();
        assert_eq!(fresh.index(), gone.index());
        assert_ne!(fresh, gone);
    }

    fn document_with(type_names: &[&str], records: Value) -> Value {
        serde_json::json!({
            "format": "flxscene",
            "version": 1,
            "allocator": {"generations": [0, 0], "alive": [false, true], "free": []},
            "strings": {"strings": [""], "free": []},
            "archetypes": [{
                "id": 1,
                "type": type_names,
                "entities": [1],
                "table": records,
            }],
        })
    }

    #[test]
    fn test_unknown_component_is_dropped_when_lenient() {
        let doc = document_with(
            &["Score", "Mana"],
            serde_json::json!([[{"type": "Score", "data": 3}], [{"type": "Mana", "data": 9}]]),
        );
        let text = doc.to_string();
        let scene = Scene::load(text.as_bytes(), &registry(), SceneConfig::default()).unwrap();
        let e = EntityId::from_parts(1, 0);
        assert_eq!(scene.try_get_component::<Score>(e), Some(&Score(3)));
        assert_eq!(scene.components_of(e).unwrap().len(), 1);

        let strict = SceneConfig::new().with_strict_load(true);
        assert!(matches!(
            Scene::load(text.as_bytes(), &registry(), strict),
            Err(EcsError::UnknownComponent(name)) if name == "Mana"
        ));
    }

    #[test]
    fn test_bad_field_keeps_default_when_lenient() {
        let doc = document_with(
            &["Score"],
            serde_json::json!([[{"type": "Score", "data": "lots"}]]),
        );
        let text = doc.to_string();
        let scene = Scene::load(text.as_bytes(), &registry(), SceneConfig::default()).unwrap();
        assert_eq!(
            scene.try_get_component::<Score>(EntityId::from_parts(1, 0)),
            Some(&Score::default())
        );

        let strict = SceneConfig::new().with_strict_load(true);
        assert!(matches!(
            Scene::load(text.as_bytes(), &registry(), strict),
            Err(EcsError::Reflect(_))
        ));
    }

    #[test]
    fn test_inconsistent_documents_are_rejected() {
        let short_column = document_with(&["Score"], serde_json::json!([[]]));
        assert!(matches!(
            Scene::load(short_column.to_string().as_bytes(), &registry(), SceneConfig::default()),
            Err(EcsError::InvalidDocument(_))
        ));

        let mut unallocated = document_with(&["Score"], serde_json::json!([[{"type": "Score", "data": 1}]]));
        unallocated["allocator"]["alive"] = serde_json::json!([false, false]);
        assert!(matches!(
            Scene::load(unallocated.to_string().as_bytes(), &registry(), SceneConfig::default()),
            Err(EcsError::InvalidDocument(_))
        ));

        let mut wrong_format = document_with(&[], serde_json::json!([]));
        wrong_format["format"] = serde_json::json!("flxprefab");
        assert!(matches!(
            Scene::load(wrong_format.to_string().as_bytes(), &registry(), SceneConfig::default()),
            Err(EcsError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_repeated_free_slot_is_rejected() {
        let mut doc = document_with(&[], serde_json::json!([]));
        doc["allocator"] = serde_json::json!({
            "generations": [0, 0],
            "alive": [false, false],
            "free": [1, 1],
        });
        doc["archetypes"] = serde_json::json!([]);
        assert!(matches!(
            Scene::load(doc.to_string().as_bytes(), &registry(), SceneConfig::default()),
            Err(EcsError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_shared_name_handles_are_split_on_load() {
        let doc = serde_json::json!({
            "format": "flxscene",
            "version": 1,
            "allocator": {"generations": [0, 0, 0], "alive": [false, true, true], "free": []},
            "strings": {"strings": ["", "Twin"], "free": []},
            "archetypes": [{
                "id": 1,
                "type": ["EntityName"],
                "entities": [1, 2],
                "table": [[
                    {"type": "EntityName", "data": 1},
                    {"type": "EntityName", "data": 1},
                ]],
            }],
        });
        let mut scene =
            Scene::load(doc.to_string().as_bytes(), &registry(), SceneConfig::default()).unwrap();
        let first = EntityId::from_parts(1, 0);
        let second = EntityId::from_parts(2, 0);

        scene.destroy_entity(first).unwrap();
        assert_eq!(scene.entity_name(second), Some("Twin"));
        assert!(scene.strings().is_consistent());
    }
}
