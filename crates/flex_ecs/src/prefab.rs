//! Single-entity documents (`.flxprefab`).
//!
//! A prefab holds one entity's components as `{"type":..,"data":..}`
//! records and can be instantiated into any scene. The entity's name is
//! stored as text because a [`StringIndex`](crate::StringIndex) only means
//! something inside the scene that issued it. Other string handle fields
//! are saved as raw handles.

use std::collections::HashSet;
use std::io::{Read, Write};

use flex_component::reflect::descriptor::record_type;
use flex_component::{Column, Component, ComponentMeta, EntityId, TypeRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::builtin::EntityName;
use crate::error::{EcsError, EcsResult};
use crate::index::EntityRecord;
use crate::scene::Scene;
use crate::serialize::read_record;

/// Value of the `format` field.
pub const PREFAB_FORMAT: &str = "flxprefab";

/// Highest prefab version this build reads and the version it writes.
pub const PREFAB_VERSION: u32 = 1;

/// One entity as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDocument {
    /// Always [`PREFAB_FORMAT`].
    pub format: String,
    /// Document version.
    pub version: u32,
    /// Display name, if the entity had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// One record per component, name excluded.
    pub components: Vec<Value>,
}

impl Scene {
    /// Capture `entity`'s components as a prefab document.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for a stale handle, or a
    /// reflection error if a component cannot be serialised.
    pub fn entity_document(&self, entity: EntityId) -> EcsResult<EntityDocument> {
        let record = self.location(entity)?;
        let table = &self.archetypes[record.archetype.index()];

        let mut components: Vec<Value> = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let meta = column.meta();
            if meta.id == EntityName::component_id() {
                continue;
            }
            let value = column
                .get_any(record.row)
                .ok_or(EcsError::ComponentNotPresent {
                    entity,
                    component: meta.id,
                })?;
            let mut text = String::new();
            (meta.serialize_fn)(value, &mut text)?;
            components.push(serde_json::from_str(&text)?);
        }

        Ok(EntityDocument {
            format: PREFAB_FORMAT.to_string(),
            version: PREFAB_VERSION,
            name: self.entity_name(entity).map(str::to_string),
            components,
        })
    }

    /// Write `entity` as a pretty-printed prefab.
    ///
    /// # Errors
    ///
    /// See [`Scene::entity_document`]; also fails if the writer does.
    pub fn save_entity<W: Write>(&self, entity: EntityId, writer: W) -> EcsResult<()> {
        let document = self.entity_document(entity)?;
        serde_json::to_writer_pretty(writer, &document)?;
        debug!(%entity, components = document.components.len(), "saved prefab");
        Ok(())
    }

    /// Create a new entity from a prefab document, resolving component
    /// names through the scene first and `registry` second.
    ///
    /// Unknown components and unreadable records are handled as in
    /// [`Scene::from_document`], following the scene's `strict_load`
    /// setting. Nothing is created if an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidDocument`] for a wrong format, a newer
    /// version or a component listed twice. In strict mode, also
    /// [`EcsError::UnknownComponent`] or the first reflection failure.
    pub fn instantiate(
        &mut self,
        document: &EntityDocument,
        registry: &TypeRegistry,
    ) -> EcsResult<EntityId> {
        if document.format != PREFAB_FORMAT {
            return Err(EcsError::InvalidDocument(format!(
                "format is '{}', expected '{PREFAB_FORMAT}'",
                document.format
            )));
        }
        if document.version > PREFAB_VERSION {
            return Err(EcsError::InvalidDocument(format!(
                "version {} is newer than supported version {PREFAB_VERSION}",
                document.version
            )));
        }

        // Each value is read into a one-row column first, so a strict
        // failure leaves the scene untouched.
        let strict = self.config.strict_load;
        let mut staged: Vec<Column> = Vec::with_capacity(document.components.len() + 1);
        let mut seen = HashSet::new();
        for record in &document.components {
            let name = record_type(record)?;
            if name == EntityName::type_name() {
                warn!("ignoring name record in prefab components");
                continue;
            }
            if !seen.insert(name) {
                return Err(EcsError::InvalidDocument(format!(
                    "prefab lists '{name}' twice"
                )));
            }
            let Some(meta) = self.resolve_component(name, registry, strict)? else {
                continue;
            };
            let mut column = Column::new(meta);
            column.push_default();
            if let Some(value) = column.get_any_mut(0) {
                read_record(value, &meta, record, EntityId::NULL, strict)?;
            }
            staged.push(column);
        }

        if let Some(name) = &document.name {
            let mut column = Column::new(EntityName::meta());
            column.push(EntityName(self.strings.insert(name.as_str())));
            staged.push(column);
        }

        let metas: Vec<ComponentMeta> = staged.iter().map(|column| *column.meta()).collect();
        let archetype = self.get_or_create_archetype(&metas);
        let entity = self.allocator.allocate();
        let table = &mut self.archetypes[archetype.index()];
        for mut column in staged {
            if let Some(dst) = table.column_mut(column.type_id) {
                column.move_row_into(0, dst);
            }
        }
        table.entities.push(entity);
        let row = table.len() - 1;
        debug_assert!(table.is_dense());
        self.entity_index.insert(entity, EntityRecord { archetype, row });
        self.structural_change(&[archetype]);
        debug!(%entity, archetype = %archetype, components = metas.len(), "instantiated prefab");
        Ok(entity)
    }

    /// Read a prefab saved with [`Scene::save_entity`] and instantiate it.
    ///
    /// # Errors
    ///
    /// Returns a JSON error for malformed input, otherwise see
    /// [`Scene::instantiate`].
    pub fn load_entity<R: Read>(&mut self, reader: R, registry: &TypeRegistry) -> EcsResult<EntityId> {
        let document: EntityDocument = serde_json::from_reader(reader)?;
        self.instantiate(&document, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::strings::StringIndex;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Score(i64);
    impl Component for Score {
        fn type_name() -> &'static str {
            "Score"
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Tag {
        label: String,
        weight: f32,
    }
    impl Component for Tag {
        fn type_name() -> &'static str {
            "Tag"
        }
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::with_primitives();
        registry.register::<Score>().register::<Tag>();
        registry
    }

    fn prefab(components: Value) -> EntityDocument {
        serde_json::from_value(serde_json::json!({
            "format": "flxprefab",
            "version": 1,
            "components": components,
        }))
        .unwrap()
    }

    #[test]
    fn test_prefab_roundtrip_into_fresh_scene() {
        let mut source = Scene::new();
        let e = source.create_entity(Some("Goblin \"boss\""));
        source.add_component(e, Score(-40)).unwrap();
        source
            .add_component(
                e,
                Tag {
                    label: "line\nbreak".into(),
                    weight: 0.5,
                },
            )
            .unwrap();

        let mut bytes = Vec::new();
        source.save_entity(e, &mut bytes).unwrap();

        let mut target = Scene::new();
        target.create_entity(Some("Already here"));
        let copy = target.load_entity(bytes.as_slice(), &registry()).unwrap();

        assert!(target.is_consistent());
        assert_eq!(target.entity_name(copy), Some("Goblin \"boss\""));
        assert_eq!(target.try_get_component::<Score>(copy), Some(&Score(-40)));
        assert_eq!(
            target.try_get_component::<Tag>(copy),
            source.try_get_component::<Tag>(e)
        );
        assert_eq!(
            target.entity_document(copy).unwrap(),
            source.entity_document(e).unwrap()
        );
        assert_eq!(target.cached_query::<(Score, Tag)>().entities(), &[copy]);
    }

    #[test]
    fn test_document_leaves_out_name_handle() {
        let mut scene = Scene::new();
        let e = scene.create_entity(Some("Solo"));
        let document = scene.entity_document(e).unwrap();
        assert_eq!(document.name.as_deref(), Some("Solo"));
        assert!(document.components.is_empty());

        let unnamed = scene.create_empty_entity();
        scene.add_component(unnamed, Score(1)).unwrap();
        let document = scene.entity_document(unnamed).unwrap();
        assert_eq!(document.name, None);
        assert_eq!(
            document.components,
            vec![serde_json::json!({"type": "Score", "data": 1})]
        );
    }

    #[test]
    fn test_instantiate_unknown_component() {
        let document = prefab(serde_json::json!([
            {"type": "Score", "data": 9},
            {"type": "Mana", "data": 3},
        ]));

        let mut lenient = Scene::new();
        let e = lenient.instantiate(&document, &registry()).unwrap();
        assert_eq!(lenient.try_get_component::<Score>(e), Some(&Score(9)));
        assert_eq!(lenient.components_of(e).unwrap().len(), 1);

        let mut strict = Scene::with_config(SceneConfig::new().with_strict_load(true));
        assert!(matches!(
            strict.instantiate(&document, &registry()),
            Err(EcsError::UnknownComponent(name)) if name == "Mana"
        ));
        assert_eq!(strict.entity_count(), 0);
        assert!(strict.is_consistent());
    }

    #[test]
    fn test_instantiate_bad_record() {
        let document = prefab(serde_json::json!([{"type": "Score", "data": "many"}]));

        let mut lenient = Scene::new();
        let e = lenient.instantiate(&document, &registry()).unwrap();
        assert_eq!(lenient.try_get_component::<Score>(e), Some(&Score::default()));

        let mut strict = Scene::with_config(SceneConfig::new().with_strict_load(true));
        assert!(matches!(
            strict.instantiate(&document, &registry()),
            Err(EcsError::Reflect(_))
        ));
        assert_eq!(strict.entity_count(), 0);
    }

    #[test]
    fn test_instantiate_rejects_bad_documents() {
        let mut scene = Scene::new();
        let twice = prefab(serde_json::json!([
            {"type": "Score", "data": 1},
            {"type": "Score", "data": 2},
        ]));
        assert!(matches!(
            scene.instantiate(&twice, &registry()),
            Err(EcsError::InvalidDocument(_))
        ));

        let mut wrong_format = prefab(serde_json::json!([]));
        wrong_format.format = "flxscene".into();
        assert!(matches!(
            scene.instantiate(&wrong_format, &registry()),
            Err(EcsError::InvalidDocument(_))
        ));
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn test_instantiated_name_is_owned() {
        let mut scene = Scene::new();
        let document = EntityDocument {
            format: PREFAB_FORMAT.into(),
            version: PREFAB_VERSION,
            name: Some("Spawned".into()),
            components: Vec::new(),
        };
        let a = scene.instantiate(&document, &registry()).unwrap();
        let b = scene.instantiate(&document, &registry()).unwrap();
        let handle = |e| scene.try_get_component::<EntityName>(e).map(|name| name.0);
        assert_ne!(handle(a), handle(b));
        assert_ne!(handle(a), Some(StringIndex::NULL));
        scene.destroy_entity(a).unwrap();
        assert_eq!(scene.entity_name(b), Some("Spawned"));
    }
}
