//! Archetype definitions and storage.
//!
//! An archetype is a unique combination of component types. Entities sharing
//! the same set of components are grouped into the same archetype, stored as
//! parallel dense columns: row `i` of every column belongs to `entities[i]`.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::component::{ComponentId, ComponentMeta};
use crate::entity::EntityId;

/// Identifier of an archetype within one scene, counting up from zero in
/// creation order. Archetypes are never removed, so the ID doubles as an
/// index into the scene's archetype list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchetypeId(pub u32);

impl ArchetypeId {
    /// The archetype with no components. Every scene creates it first.
    pub const EMPTY: ArchetypeId = ArchetypeId(0);

    /// The ID as a list index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Archetype({})", self.0)
    }
}

/// Cached transitions to neighbouring archetypes.
///
/// `add` is the archetype reached by adding the keyed component, `remove` the
/// one reached by removing it. Filled lazily on the first migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchetypeEdge {
    /// Archetype for `self ∪ {component}`.
    pub add: Option<ArchetypeId>,
    /// Archetype for `self − {component}`.
    pub remove: Option<ArchetypeId>,
}

/// Outcome of moving a row between archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovedRow {
    /// The row the entity now occupies in the destination archetype.
    pub row: usize,
    /// The entity that was swapped into the vacated source row, if any. Its
    /// entity record must be updated by the caller.
    pub swapped: Option<EntityId>,
}

/// A table of entities sharing the same archetype (set of component types).
#[derive(Debug)]
pub struct ArchetypeTable {
    /// The archetype identifier.
    pub id: ArchetypeId,
    /// Sorted set of component IDs that define this archetype.
    pub component_types: BTreeSet<ComponentId>,
    /// Entity IDs by row. `entities[i]` corresponds to row `i` in every column.
    pub entities: Vec<EntityId>,
    /// One column per component type, in the same order as `component_types`.
    pub columns: Vec<Column>,
    /// Cached neighbours keyed by the component added or removed.
    pub edges: HashMap<ComponentId, ArchetypeEdge>,
    changed_at: u64,
}

impl ArchetypeTable {
    /// Create a new, empty archetype table. Duplicate metas are ignored.
    #[must_use]
    pub fn new(id: ArchetypeId, metas: &[ComponentMeta]) -> Self {
        let mut metas = metas.to_vec();
        metas.sort_by_key(|meta| meta.id);
        metas.dedup_by_key(|meta| meta.id);

        Self {
            id,
            component_types: metas.iter().map(|meta| meta.id).collect(),
            entities: Vec::new(),
            columns: metas.into_iter().map(Column::new).collect(),
            edges: HashMap::new(),
            changed_at: 0,
        }
    }

    /// Returns the number of entities in this archetype table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if this table has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns `true` if this archetype contains the given component type.
    #[must_use]
    pub fn has_component(&self, type_id: ComponentId) -> bool {
        self.component_types.contains(&type_id)
    }

    /// Returns the column index for the given component type, if present.
    #[must_use]
    pub fn column_index(&self, type_id: ComponentId) -> Option<usize> {
        self.columns
            .binary_search_by_key(&type_id, |col| col.type_id)
            .ok()
    }

    /// Returns the column storing the given component type.
    #[must_use]
    pub fn column(&self, type_id: ComponentId) -> Option<&Column> {
        self.column_index(type_id).map(|idx| &self.columns[idx])
    }

    /// Returns the column storing the given component type, mutably.
    #[must_use]
    pub fn column_mut(&mut self, type_id: ComponentId) -> Option<&mut Column> {
        self.column_index(type_id).map(|idx| &mut self.columns[idx])
    }

    /// The function tables of every stored component, in column order.
    #[must_use]
    pub fn metas(&self) -> Vec<ComponentMeta> {
        self.columns.iter().map(|col| *col.meta()).collect()
    }

    /// Find the row index for a given entity by linear scan.
    #[must_use]
    pub fn entity_row(&self, entity: EntityId) -> Option<usize> {
        self.entities.iter().position(|&e| e == entity)
    }

    /// The structural epoch at which rows were last added or removed.
    #[must_use]
    pub fn changed_at(&self) -> u64 {
        self.changed_at
    }

    /// Record that rows were added or removed at `epoch`.
    pub fn mark_changed(&mut self, epoch: u64) {
        self.changed_at = epoch;
    }

    /// Returns `true` if every column has exactly one slot per entity.
    #[must_use]
    pub fn is_dense(&self) -> bool {
        self.columns.iter().all(|col| col.len() == self.entities.len())
    }

    /// Remove the row at `row`, dropping its components.
    ///
    /// The last row is moved into the vacated slot; the entity that moved is
    /// returned so its record can be updated.
    pub fn swap_remove(&mut self, row: usize) -> Option<EntityId> {
        debug_assert!(row < self.len(), "row {row} out of bounds in {}", self.id);
        for col in &mut self.columns {
            col.swap_remove(row);
        }
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    /// Move the row at `row` into `dst`.
    ///
    /// Components that `dst` also stores are moved; components it lacks are
    /// dropped. Columns of `dst` that this archetype lacks are left one slot
    /// short and must be filled by the caller before the next read.
    pub fn move_row(&mut self, row: usize, dst: &mut ArchetypeTable) -> MovedRow {
        debug_assert!(row < self.len(), "row {row} out of bounds in {}", self.id);
        let entity = self.entities[row];

        for col in &mut self.columns {
            match dst.column_index(col.type_id) {
                Some(idx) => col.move_row_into(row, &mut dst.columns[idx]),
                None => col.swap_remove(row),
            }
        }

        self.entities.swap_remove(row);
        dst.entities.push(entity);

        MovedRow {
            row: dst.entities.len() - 1,
            swapped: self.entities.get(row).copied(),
        }
    }

    /// Append a copy of the row at `row` owned by `entity`. Returns the new row.
    pub fn clone_row(&mut self, row: usize, entity: EntityId) -> usize {
        debug_assert!(row < self.len(), "row {row} out of bounds in {}", self.id);
        for col in &mut self.columns {
            col.clone_row(row);
        }
        self.entities.push(entity);
        self.entities.len() - 1
    }
}
