//! Routing tables from identity to storage.
//!
//! The entity index maps an [`EntityId`] to the archetype and row holding its
//! components. The component index maps a [`ComponentId`] to every archetype
//! that stores it, together with the column it occupies there. Reads never
//! modify either table.

use std::collections::HashMap;

use flex_component::{ArchetypeId, ArchetypeTable, ComponentId, EntityId};

/// Where an entity's components live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRecord {
    /// The archetype holding the entity.
    pub archetype: ArchetypeId,
    /// The entity's row in every column of that archetype.
    pub row: usize,
}

/// Which column of an archetype stores a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchetypeRecord {
    /// Column index within the archetype.
    pub column: usize,
}

/// `EntityId -> EntityRecord`.
#[derive(Debug, Default)]
pub struct EntityIndex {
    records: HashMap<EntityId, EntityRecord>,
}

impl EntityIndex {
    /// Look up an entity's location.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<EntityRecord> {
        self.records.get(&entity).copied()
    }

    /// Returns `true` if the entity has a location.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.records.contains_key(&entity)
    }

    /// Set an entity's location.
    pub fn insert(&mut self, entity: EntityId, record: EntityRecord) {
        self.records.insert(entity, record);
    }

    /// Point an existing entity at a new row in the same archetype.
    pub fn set_row(&mut self, entity: EntityId, row: usize) {
        if let Some(record) = self.records.get_mut(&entity) {
            record.row = row;
        }
    }

    /// Forget an entity.
    pub fn remove(&mut self, entity: EntityId) -> Option<EntityRecord> {
        self.records.remove(&entity)
    }

    /// Number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no entity is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every `(entity, record)` pair, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, EntityRecord)> + '_ {
        self.records.iter().map(|(&entity, &record)| (entity, record))
    }
}

/// `ComponentId -> (ArchetypeId -> ArchetypeRecord)`.
#[derive(Debug, Default)]
pub struct ComponentIndex {
    archetypes: HashMap<ComponentId, HashMap<ArchetypeId, ArchetypeRecord>>,
}

impl ComponentIndex {
    /// Record every column of a newly created archetype.
    pub fn insert_archetype(&mut self, table: &ArchetypeTable) {
        for (column, col) in table.columns.iter().enumerate() {
            self.archetypes
                .entry(col.type_id)
                .or_default()
                .insert(table.id, ArchetypeRecord { column });
        }
    }

    /// The column storing `component` in `archetype`, if it is stored there.
    #[must_use]
    pub fn column(&self, component: ComponentId, archetype: ArchetypeId) -> Option<usize> {
        self.archetypes
            .get(&component)?
            .get(&archetype)
            .map(|record| record.column)
    }

    /// Every archetype storing `component`.
    #[must_use]
    pub fn archetypes(&self, component: ComponentId) -> Option<&HashMap<ArchetypeId, ArchetypeRecord>> {
        self.archetypes.get(&component)
    }

    /// Number of component types indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Returns `true` if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Every `(component, archetypes)` entry, in no particular order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (ComponentId, &HashMap<ArchetypeId, ArchetypeRecord>)> + '_ {
        self.archetypes.iter().map(|(&id, archetypes)| (id, archetypes))
    }
}
