//! The [`Scene`]: archetype storage plus the indices that route into it.
//!
//! Entities live in exactly one archetype at a time. Adding or removing a
//! component moves the entity's row to the archetype for its new component
//! set; the vacated row is filled by the archetype's last row, and that
//! entity's record is patched. Every such structural change bumps the scene
//! epoch, which is what cached queries and [`QueryResult`]s are checked
//! against.

use std::any::Any;
use std::collections::{BTreeSet, HashMap, HashSet};

use flex_component::{
    ArchetypeId, ArchetypeTable, Component, ComponentId, ComponentMeta, ComponentSet,
    EntityAllocator, EntityId, QueryDescriptor, ReflectError,
};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::builtin::EntityName;
use crate::commands::{CommandBuffer, CommandReport};
use crate::config::{QueryInvalidation, SceneConfig};
use crate::error::{EcsError, EcsResult};
use crate::index::{ComponentIndex, EntityIndex, EntityRecord};
use crate::query::{QueryCache, QueryResult};
use crate::strings::{StringIndex, StringStorage};

/// Type-erased view of one component instance.
#[derive(Debug, Clone, Copy)]
pub struct ComponentData<'s> {
    /// Size of the component in bytes.
    pub size: usize,
    /// Function table of the component type.
    pub meta: &'s ComponentMeta,
    /// The instance itself.
    pub value: &'s dyn Any,
}

/// One loaded world: archetypes, indices, strings and the query cache.
pub struct Scene {
    pub(crate) config: SceneConfig,
    pub(crate) allocator: EntityAllocator,
    pub(crate) archetypes: Vec<ArchetypeTable>,
    pub(crate) archetype_index: HashMap<BTreeSet<ComponentId>, ArchetypeId>,
    pub(crate) entity_index: EntityIndex,
    pub(crate) component_index: ComponentIndex,
    pub(crate) metas: HashMap<ComponentId, ComponentMeta>,
    pub(crate) strings: StringStorage,
    query_cache: QueryCache,
    epoch: u64,
}

impl Scene {
    /// An empty scene with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// An empty scene. The empty archetype always exists and has ID 0.
    #[must_use]
    pub fn with_config(config: SceneConfig) -> Self {
        let mut scene = Self {
            config,
            allocator: EntityAllocator::new(),
            archetypes: Vec::new(),
            archetype_index: HashMap::new(),
            entity_index: EntityIndex::default(),
            component_index: ComponentIndex::default(),
            metas: HashMap::new(),
            strings: StringStorage::new(),
            query_cache: QueryCache::default(),
            epoch: 0,
        };
        scene.metas.insert(EntityName::component_id(), EntityName::meta());
        scene.get_or_create_archetype(&[]);
        scene
    }

    /// The scene's configuration.
    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Number of structural changes applied so far.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    // -- Entity lifecycle --

    /// Create an entity with no components.
    pub fn create_empty_entity(&mut self) -> EntityId {
        let entity = self.allocator.allocate();
        let table = &mut self.archetypes[ArchetypeId::EMPTY.index()];
        table.entities.push(entity);
        let row = table.len() - 1;
        self.entity_index.insert(
            entity,
            EntityRecord {
                archetype: ArchetypeId::EMPTY,
                row,
            },
        );
        self.structural_change(&[ArchetypeId::EMPTY]);
        trace!(%entity, "created empty entity");
        entity
    }

    /// Create an entity carrying an [`EntityName`]. `None` uses the
    /// configured default name.
    pub fn create_entity(&mut self, name: Option<&str>) -> EntityId {
        let text = name.map_or_else(|| self.config.default_entity_name.clone(), str::to_string);
        let handle = self.strings.insert(text);

        let archetype = self.get_or_create_archetype(&[EntityName::meta()]);
        let entity = self.allocator.allocate();
        let table = &mut self.archetypes[archetype.index()];
        debug_assert_eq!(table.columns.len(), 1);
        table.columns[0].push(EntityName(handle));
        table.entities.push(entity);
        let row = table.len() - 1;
        self.entity_index.insert(entity, EntityRecord { archetype, row });
        self.structural_change(&[archetype]);
        debug!(%entity, name = self.strings.get(handle).unwrap_or_default(), "created entity");
        entity
    }

    /// Destroy an entity and drop its components. The string behind its
    /// [`EntityName`] is freed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for a stale or unknown handle.
    pub fn destroy_entity(&mut self, entity: EntityId) -> EcsResult<()> {
        let record = self.location(entity)?;
        self.release_name(record);
        let table = &mut self.archetypes[record.archetype.index()];
        if let Some(moved) = table.swap_remove(record.row) {
            self.entity_index.set_row(moved, record.row);
        }
        self.entity_index.remove(entity);
        self.allocator.free(entity);
        self.structural_change(&[record.archetype]);
        debug!(%entity, archetype = %record.archetype, "destroyed entity");
        Ok(())
    }

    /// Create a new entity holding a copy of every component of `entity`.
    /// [`StringIndex`] fields are copied as handles, so both entities refer
    /// to the same stored string. The exception is [`EntityName`]: the clone
    /// gets its own copy of the name, since each entity frees its name when
    /// destroyed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for a stale or unknown handle.
    pub fn clone_entity(&mut self, entity: EntityId) -> EcsResult<EntityId> {
        let record = self.location(entity)?;
        let clone = self.allocator.allocate();
        let row = self.archetypes[record.archetype.index()].clone_row(record.row, clone);
        let cloned = EntityRecord {
            archetype: record.archetype,
            row,
        };
        self.entity_index.insert(clone, cloned);
        self.own_name(cloned);
        self.structural_change(&[record.archetype]);
        debug!(source = %entity, %clone, "cloned entity");
        Ok(clone)
    }

    /// Returns `true` if `entity` is alive in this scene.
    #[must_use]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity) && self.entity_index.contains(entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entity_index.len()
    }

    /// Every live entity, grouped by archetype.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.archetypes
            .iter()
            .flat_map(|table| table.entities.iter().copied())
    }

    /// Where `entity` is stored, if it is alive.
    #[must_use]
    pub fn entity_record(&self, entity: EntityId) -> Option<EntityRecord> {
        self.location(entity).ok()
    }

    // -- Components --

    /// Register a component type with this scene without attaching it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NameCollision`] if another Rust type already uses
    /// the same name.
    pub fn register_component<T: Component>(&mut self) -> EcsResult<()> {
        self.register_meta(T::meta())
    }

    /// Attach `value` to `entity`. Returns `Ok(false)` and leaves the entity
    /// untouched if it already carries a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for a stale handle, or
    /// [`EcsError::NameCollision`] if `T`'s name belongs to another type.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, value: T) -> EcsResult<bool> {
        self.add_boxed(entity, T::meta(), Box::new(value))
    }

    /// Attach a boxed component described by `meta`.
    ///
    /// # Errors
    ///
    /// As [`Scene::add_component`], plus [`ReflectError::WrongRustType`] if
    /// the box does not hold `meta`'s type.
    pub fn add_boxed(
        &mut self,
        entity: EntityId,
        meta: ComponentMeta,
        value: Box<dyn Any + Send>,
    ) -> EcsResult<bool> {
        if (*value).type_id() != meta.rust_type {
            return Err(ReflectError::WrongRustType {
                type_name: meta.name.to_string(),
            }
            .into());
        }
        let record = self.location(entity)?;
        self.register_meta(meta)?;

        if self.archetypes[record.archetype.index()].has_component(meta.id) {
            trace!(%entity, component = meta.name, "component already present");
            return Ok(false);
        }

        let dst = self.archetype_with(record.archetype, meta);
        self.move_entity(entity, record, dst);

        let table = &mut self.archetypes[dst.index()];
        let pushed = table
            .column_mut(meta.id)
            .map(|column| column.push_any(value));
        if !matches!(pushed, Some(Ok(()))) {
            // Unreachable after the type check above; keep the table dense.
            warn!(%entity, component = meta.name, "failed to store component, using default");
            if let Some(column) = table.column_mut(meta.id) {
                column.push_default();
            }
        }
        debug_assert!(table.is_dense());

        self.structural_change(&[record.archetype, dst]);
        trace!(%entity, component = meta.name, archetype = %dst, "added component");
        Ok(true)
    }

    /// Detach and return `entity`'s `T`. Returns `Ok(None)` if it has none.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for a stale handle, or
    /// [`EcsError::NameCollision`] if `T`'s name belongs to another type.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> EcsResult<Option<T>> {
        let Some(value) = self.get_component::<T>(entity)?.cloned() else {
            return Ok(None);
        };
        self.remove_by_id(entity, T::component_id())?;
        Ok(Some(value))
    }

    /// Detach a component by ID, dropping it. Returns `Ok(false)` if the
    /// entity does not carry it. Removing [`EntityName`] frees the name
    /// string.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for a stale handle.
    pub fn remove_by_id(&mut self, entity: EntityId, component: ComponentId) -> EcsResult<bool> {
        let record = self.location(entity)?;
        if !self.archetypes[record.archetype.index()].has_component(component) {
            trace!(%entity, %component, "component not present, nothing to remove");
            return Ok(false);
        }
        if component == EntityName::component_id() {
            self.release_name(record);
        }

        let dst = self.archetype_without(record.archetype, component);
        self.move_entity(entity, record, dst);
        self.structural_change(&[record.archetype, dst]);
        trace!(%entity, %component, archetype = %dst, "removed component");
        Ok(true)
    }

    /// Borrow `entity`'s `T`. `Ok(None)` means the entity is alive but has
    /// no `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for a stale handle, or
    /// [`EcsError::NameCollision`] if `T`'s name belongs to another type.
    pub fn get_component<T: Component>(&self, entity: EntityId) -> EcsResult<Option<&T>> {
        let record = self.location(entity)?;
        self.check_type::<T>()?;
        Ok(self
            .component_index
            .column(T::component_id(), record.archetype)
            .and_then(|column| {
                self.archetypes[record.archetype.index()].columns[column].get::<T>(record.row)
            }))
    }

    /// Mutably borrow `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// As [`Scene::get_component`].
    pub fn get_component_mut<T: Component>(
        &mut self,
        entity: EntityId,
    ) -> EcsResult<Option<&mut T>> {
        let record = self.location(entity)?;
        self.check_type::<T>()?;
        let Some(column) = self.component_index.column(T::component_id(), record.archetype) else {
            return Ok(None);
        };
        Ok(self.archetypes[record.archetype.index()].columns[column].get_mut::<T>(record.row))
    }

    /// Borrow `entity`'s `T`, folding every failure into `None`.
    #[must_use]
    pub fn try_get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.get_component::<T>(entity).ok().flatten()
    }

    /// Returns `true` if `entity` is alive and carries a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.has_component_id(entity, T::component_id())
    }

    /// Returns `true` if `entity` is alive and carries `component`.
    #[must_use]
    pub fn has_component_id(&self, entity: EntityId, component: ComponentId) -> bool {
        self.location(entity).is_ok_and(|record| {
            self.archetypes[record.archetype.index()].has_component(component)
        })
    }

    /// The function tables of every component on `entity`, sorted by ID.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for a stale handle.
    pub fn components_of(&self, entity: EntityId) -> EcsResult<Vec<ComponentMeta>> {
        let record = self.location(entity)?;
        Ok(self.archetypes[record.archetype.index()].metas())
    }

    /// Type-erased access to one component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotPresent`].
    pub fn component_data(
        &self,
        entity: EntityId,
        component: ComponentId,
    ) -> EcsResult<ComponentData<'_>> {
        let record = self.location(entity)?;
        let not_present = || EcsError::ComponentNotPresent { entity, component };
        let column = self
            .component_index
            .column(component, record.archetype)
            .ok_or_else(not_present)?;
        let column = &self.archetypes[record.archetype.index()].columns[column];
        let value = column.get_any(record.row).ok_or_else(not_present)?;
        Ok(ComponentData {
            size: column.item_size,
            meta: column.meta(),
            value,
        })
    }

    /// Serialise one component as a `{"type":..,"data":..}` record.
    ///
    /// # Errors
    ///
    /// As [`Scene::component_data`], plus reflection failures.
    pub fn component_record(&self, entity: EntityId, component: ComponentId) -> EcsResult<String> {
        let data = self.component_data(entity, component)?;
        let mut out = String::new();
        (data.meta.serialize_fn)(data.value, &mut out)?;
        Ok(out)
    }

    /// Overwrite one of `entity`'s components from a `{"type":..,"data":..}`
    /// record. The component named by the record's tag must be present.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownComponent`] if the tag names no component
    /// known to this scene, [`EcsError::ComponentNotPresent`] if the entity
    /// lacks it, or the reflection failure. The component keeps its old value
    /// on error.
    pub fn apply_component_record(&mut self, entity: EntityId, record: &Value) -> EcsResult<()> {
        let location = self.location(entity)?;
        let name = flex_component::reflect::descriptor::record_type(record)?;
        let meta = self
            .component_meta_by_name(name)
            .copied()
            .ok_or_else(|| EcsError::UnknownComponent(name.to_string()))?;
        let not_present = EcsError::ComponentNotPresent {
            entity,
            component: meta.id,
        };
        let Some(column) = self.component_index.column(meta.id, location.archetype) else {
            return Err(not_present);
        };
        let value = self.archetypes[location.archetype.index()].columns[column]
            .get_any_mut(location.row)
            .ok_or(not_present)?;
        (meta.deserialize_fn)(value, record)?;
        Ok(())
    }

    /// The function table registered under `id`.
    #[must_use]
    pub fn component_meta(&self, id: ComponentId) -> Option<&ComponentMeta> {
        self.metas.get(&id)
    }

    /// The function table registered under `name`.
    #[must_use]
    pub fn component_meta_by_name(&self, name: &str) -> Option<&ComponentMeta> {
        self.metas.get(&ComponentId::from_name(name))
    }

    // -- Names and strings --

    /// Store a string and return its handle.
    pub fn intern(&mut self, value: impl Into<String>) -> StringIndex {
        self.strings.insert(value)
    }

    /// The string behind `index`.
    #[must_use]
    pub fn string(&self, index: StringIndex) -> Option<&str> {
        self.strings.get(index)
    }

    /// The scene's string storage.
    #[must_use]
    pub fn strings(&self) -> &StringStorage {
        &self.strings
    }

    /// The scene's string storage, mutably.
    pub fn strings_mut(&mut self) -> &mut StringStorage {
        &mut self.strings
    }

    /// `entity`'s display name, if it has one.
    #[must_use]
    pub fn entity_name(&self, entity: EntityId) -> Option<&str> {
        let name = self.try_get_component::<EntityName>(entity)?;
        self.strings.get(name.0)
    }

    /// The first entity whose [`EntityName`] is `name`.
    #[must_use]
    pub fn entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.query(&QueryDescriptor::of::<(EntityName,)>())
            .into_iter()
            .find(|&entity| self.entity_name(entity) == Some(name))
    }

    // -- Queries --

    /// Entities whose archetype matches `desc`, scanning on every call.
    #[must_use]
    pub fn query(&self, desc: &QueryDescriptor) -> Vec<EntityId> {
        let mut candidates: Vec<ArchetypeId> = match desc
            .with
            .iter()
            .map(|&component| self.component_index.archetypes(component))
            .min_by_key(|archetypes| archetypes.map_or(0, |a| a.len()))
        {
            None => self.archetypes.iter().map(|table| table.id).collect(),
            Some(None) => return Vec::new(),
            Some(Some(archetypes)) => archetypes.keys().copied().collect(),
        };
        candidates.sort_unstable();

        candidates
            .into_iter()
            .map(|id| &self.archetypes[id.index()])
            .filter(|table| desc.matches(&table.component_types))
            .flat_map(|table| table.entities.iter().copied())
            .collect()
    }

    /// Cached entities carrying every component of `Q`.
    pub fn cached_query<Q: ComponentSet>(&mut self) -> QueryResult {
        self.cached_query_with(&QueryDescriptor::of::<Q>())
    }

    /// Cached entities matching `desc`.
    pub fn cached_query_with(&mut self, desc: &QueryDescriptor) -> QueryResult {
        let entities = self
            .query_cache
            .get_or_build(desc, &self.archetypes, self.epoch);
        QueryResult::new(entities, self.epoch)
    }

    /// Returns `true` if a structural change happened after `result` was
    /// produced.
    #[must_use]
    pub fn is_stale(&self, result: &QueryResult) -> bool {
        result.epoch() != self.epoch
    }

    /// The query cache, for statistics.
    #[must_use]
    pub fn query_cache(&self) -> &QueryCache {
        &self.query_cache
    }

    // -- Deferred commands --

    /// Apply every command in `buffer`, in order.
    pub fn apply_commands(&mut self, buffer: CommandBuffer) -> CommandReport {
        buffer.apply(self)
    }

    // -- Archetypes --

    /// Every archetype, indexed by [`ArchetypeId`].
    #[must_use]
    pub fn archetypes(&self) -> &[ArchetypeTable] {
        &self.archetypes
    }

    /// The archetype with the given ID.
    #[must_use]
    pub fn archetype(&self, id: ArchetypeId) -> Option<&ArchetypeTable> {
        self.archetypes.get(id.index())
    }

    /// The archetype for an exact component set.
    #[must_use]
    pub fn archetype_for(&self, components: &BTreeSet<ComponentId>) -> Option<ArchetypeId> {
        self.archetype_index.get(components).copied()
    }

    /// The entity index.
    #[must_use]
    pub fn entity_index(&self) -> &EntityIndex {
        &self.entity_index
    }

    /// The component index.
    #[must_use]
    pub fn component_index(&self) -> &ComponentIndex {
        &self.component_index
    }

    /// Describe the first broken storage invariant, if any: a column whose
    /// length differs from its archetype's row count, a row whose entity
    /// record points elsewhere, or an index entry with no row.
    #[must_use]
    pub fn integrity_error(&self) -> Option<String> {
        let mut rows = 0;
        for table in &self.archetypes {
            if !table.is_dense() {
                return Some(format!("{} has columns of unequal length", table.id));
            }
            for (row, &entity) in table.entities.iter().enumerate() {
                let expected = EntityRecord {
                    archetype: table.id,
                    row,
                };
                if self.entity_index.get(entity) != Some(expected) {
                    return Some(format!("{entity} is not indexed at {} row {row}", table.id));
                }
                if !self.allocator.is_alive(entity) {
                    return Some(format!("{entity} is stored but not allocated"));
                }
            }
            rows += table.len();
        }
        if rows != self.entity_index.len() || rows != self.allocator.count() {
            return Some(format!(
                "{rows} stored rows, {} indexed entities, {} allocated ids",
                self.entity_index.len(),
                self.allocator.count()
            ));
        }
        None
    }

    /// Returns `true` if [`Scene::integrity_error`] finds nothing.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.integrity_error().is_none()
    }

    /// Log the archetype, entity and component indices at debug level.
    pub fn dump(&self) {
        debug!(
            archetypes = self.archetypes.len(),
            entities = self.entity_index.len(),
            epoch = self.epoch,
            "scene"
        );
        for table in &self.archetypes {
            let names: Vec<_> = table.columns.iter().map(|col| col.meta().name).collect();
            debug!(archetype = %table.id, components = ?names, rows = table.len(), "archetype index");
        }
        let mut records: Vec<_> = self.entity_index.iter().collect();
        records.sort_unstable_by_key(|(entity, _)| *entity);
        for (entity, record) in records {
            debug!(%entity, archetype = %record.archetype, row = record.row, "entity index");
        }
        for (component, archetypes) in self.component_index.iter() {
            let name = self.metas.get(&component).map_or("?", |meta| meta.name);
            let mut columns: Vec<_> = archetypes
                .iter()
                .map(|(archetype, record)| (archetype.0, record.column))
                .collect();
            columns.sort_unstable();
            debug!(component = name, ?columns, "component index");
        }
    }

    // -- Internals --

    pub(crate) fn location(&self, entity: EntityId) -> EcsResult<EntityRecord> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        self.entity_index
            .get(entity)
            .ok_or(EcsError::EntityNotFound(entity))
    }

    pub(crate) fn register_meta(&mut self, meta: ComponentMeta) -> EcsResult<()> {
        if let Some(existing) = self.metas.get(&meta.id) {
            if existing.rust_type == meta.rust_type {
                return Ok(());
            }
            warn!(component = meta.name, "component name used by two Rust types");
            return Err(EcsError::NameCollision(meta.name.to_string()));
        }
        self.metas.insert(meta.id, meta);
        trace!(component = meta.name, id = %meta.id, "registered component");
        Ok(())
    }

    fn check_type<T: Component>(&self) -> EcsResult<()> {
        match self.metas.get(&T::component_id()) {
            Some(meta) if meta.rust_type != std::any::TypeId::of::<T>() => {
                Err(EcsError::NameCollision(T::type_name().to_string()))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn get_or_create_archetype(&mut self, metas: &[ComponentMeta]) -> ArchetypeId {
        let set: BTreeSet<ComponentId> = metas.iter().map(|meta| meta.id).collect();
        if let Some(&id) = self.archetype_index.get(&set) {
            return id;
        }

        let id = ArchetypeId(u32::try_from(self.archetypes.len()).unwrap_or(u32::MAX));
        let table = ArchetypeTable::new(id, metas);
        self.component_index.insert_archetype(&table);
        self.archetype_index.insert(set, id);
        let names: Vec<_> = table.columns.iter().map(|col| col.meta().name).collect();
        debug!(archetype = %id, components = ?names, "created archetype");
        self.archetypes.push(table);
        id
    }

    fn archetype_with(&mut self, src: ArchetypeId, meta: ComponentMeta) -> ArchetypeId {
        let cached = self.archetypes[src.index()]
            .edges
            .get(&meta.id)
            .and_then(|edge| edge.add);
        if let Some(dst) = cached {
            return dst;
        }

        let mut metas = self.archetypes[src.index()].metas();
        metas.push(meta);
        let dst = self.get_or_create_archetype(&metas);
        self.archetypes[src.index()].edges.entry(meta.id).or_default().add = Some(dst);
        self.archetypes[dst.index()].edges.entry(meta.id).or_default().remove = Some(src);
        dst
    }

    fn archetype_without(&mut self, src: ArchetypeId, component: ComponentId) -> ArchetypeId {
        let cached = self.archetypes[src.index()]
            .edges
            .get(&component)
            .and_then(|edge| edge.remove);
        if let Some(dst) = cached {
            return dst;
        }

        let metas: Vec<_> = self.archetypes[src.index()]
            .metas()
            .into_iter()
            .filter(|meta| meta.id != component)
            .collect();
        let dst = self.get_or_create_archetype(&metas);
        self.archetypes[src.index()].edges.entry(component).or_default().remove = Some(dst);
        self.archetypes[dst.index()].edges.entry(component).or_default().add = Some(src);
        dst
    }

    /// Move `entity`'s row into `dst`, patching the record of the entity
    /// that fills the vacated row. Returns the new row.
    fn move_entity(&mut self, entity: EntityId, record: EntityRecord, dst: ArchetypeId) -> usize {
        let (src_table, dst_table) =
            pair_mut(&mut self.archetypes, record.archetype.index(), dst.index());
        let moved = src_table.move_row(record.row, dst_table);
        if let Some(swapped) = moved.swapped {
            self.entity_index.set_row(swapped, record.row);
        }
        self.entity_index.insert(
            entity,
            EntityRecord {
                archetype: dst,
                row: moved.row,
            },
        );
        moved.row
    }

    fn name_handle(&self, record: EntityRecord) -> Option<StringIndex> {
        let column = self
            .component_index
            .column(EntityName::component_id(), record.archetype)?;
        self.archetypes[record.archetype.index()].columns[column]
            .get::<EntityName>(record.row)
            .map(|name| name.0)
    }

    fn release_name(&mut self, record: EntityRecord) {
        if let Some(handle) = self.name_handle(record).filter(|handle| !handle.is_null()) {
            self.strings.remove(handle);
        }
    }

    /// Point the name at `record` to a fresh copy of its string.
    fn own_name(&mut self, record: EntityRecord) {
        let Some(handle) = self.name_handle(record).filter(|handle| !handle.is_null()) else {
            return;
        };
        let text = self.strings.get(handle).unwrap_or_default().to_string();
        let copy = self.strings.insert(text);
        let Some(column) = self
            .component_index
            .column(EntityName::component_id(), record.archetype)
        else {
            return;
        };
        if let Some(name) =
            self.archetypes[record.archetype.index()].columns[column].get_mut::<EntityName>(record.row)
        {
            name.0 = copy;
        }
    }

    /// Give every entity sharing a name handle with an earlier row its own
    /// copy, so destroying one does not blank the other's name.
    pub(crate) fn split_shared_names(&mut self) {
        let Some(archetypes) = self.component_index.archetypes(EntityName::component_id()) else {
            return;
        };
        let mut named: Vec<ArchetypeId> = archetypes.keys().copied().collect();
        named.sort_unstable();

        let mut seen = HashSet::new();
        for archetype in named {
            for row in 0..self.archetypes[archetype.index()].len() {
                let record = EntityRecord { archetype, row };
                let Some(handle) = self.name_handle(record) else {
                    continue;
                };
                if !handle.is_null() && !seen.insert(handle) {
                    self.own_name(record);
                }
            }
        }
    }

    pub(crate) fn structural_change(&mut self, touched: &[ArchetypeId]) {
        self.epoch += 1;
        for id in touched {
            self.archetypes[id.index()].mark_changed(self.epoch);
        }
        if self.config.invalidation == QueryInvalidation::ClearAll {
            self.query_cache.clear();
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("entities", &self.entity_index.len())
            .field("archetypes", &self.archetypes.len())
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

/// Borrow two distinct archetypes mutably.
fn pair_mut(
    tables: &mut [ArchetypeTable],
    a: usize,
    b: usize,
) -> (&mut ArchetypeTable, &mut ArchetypeTable) {
    assert_ne!(a, b, "an archetype cannot migrate into itself");
    if a < b {
        let (left, right) = tables.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = tables.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
