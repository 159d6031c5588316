//! Cached query results.
//!
//! Each distinct [`QueryDescriptor`] gets one cache entry holding the
//! archetypes it matches and the entity list built from them. New archetypes
//! are checked incrementally. The entity list is rebuilt only when a matched
//! archetype gained or lost rows since the list was built.

use std::collections::HashMap;
use std::sync::Arc;

use flex_component::{ArchetypeId, ArchetypeTable, EntityId, QueryDescriptor};
use tracing::trace;

/// Snapshot of the entities matching a query.
///
/// The snapshot is cheap to clone and stays readable after the scene
/// changes, but it then describes the old scene. Use
/// [`Scene::is_stale`](crate::Scene::is_stale) to check.
#[derive(Debug, Clone)]
pub struct QueryResult {
    entities: Arc<[EntityId]>,
    epoch: u64,
}

impl QueryResult {
    pub(crate) fn new(entities: Arc<[EntityId]>, epoch: u64) -> Self {
        Self { entities, epoch }
    }

    /// The matched entities, grouped by archetype.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Iterate the matched entities.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, EntityId>> {
        self.entities.iter().copied()
    }

    /// Number of matched entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns `true` if `entity` matched.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(&entity)
    }

    /// The scene epoch the snapshot was taken at.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = EntityId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, EntityId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug)]
struct CacheEntry {
    matched: Vec<ArchetypeId>,
    scanned: usize,
    built_at: Option<u64>,
    entities: Arc<[EntityId]>,
}

impl CacheEntry {
    fn new() -> Self {
        Self {
            matched: Vec::new(),
            scanned: 0,
            built_at: None,
            entities: Arc::from(Vec::new()),
        }
    }
}

/// Memoised entity lists keyed by query descriptor.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryDescriptor, CacheEntry>,
    hits: u64,
    rebuilds: u64,
}

impl QueryCache {
    /// Return the entities matching `desc`, rebuilding the list only if a
    /// matched archetype changed after `built_at`.
    pub fn get_or_build(
        &mut self,
        desc: &QueryDescriptor,
        archetypes: &[ArchetypeTable],
        epoch: u64,
    ) -> Arc<[EntityId]> {
        let entry = self
            .entries
            .entry(desc.clone())
            .or_insert_with(CacheEntry::new);

        let mut stale = entry.built_at.is_none();
        for table in archetypes.iter().skip(entry.scanned) {
            if desc.matches(&table.component_types) {
                entry.matched.push(table.id);
                stale |= !table.is_empty();
            }
        }
        entry.scanned = archetypes.len();

        if let Some(built_at) = entry.built_at {
            stale |= entry
                .matched
                .iter()
                .any(|id| archetypes[id.index()].changed_at() > built_at);
        }

        if stale {
            entry.entities = entry
                .matched
                .iter()
                .flat_map(|id| archetypes[id.index()].entities.iter().copied())
                .collect();
            entry.built_at = Some(epoch);
            self.rebuilds += 1;
            trace!(epoch, matched = entry.matched.len(), "rebuilt cached query");
        } else {
            self.hits += 1;
        }

        Arc::clone(&entry.entities)
    }

    /// Drop every cached entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered without rebuilding.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that rebuilt their entity list.
    #[must_use]
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}
