//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is a lightweight `u64` handle with no inherent data. The
//! low 32 bits hold a slot index and the high 32 bits a generation, so a
//! handle to a destroyed entity never aliases the entity that reuses its slot.

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
///
/// Entities are pure identifiers; components are attached to them through a
/// scene. Slot 0 is reserved, which makes [`EntityId::NULL`] distinct from
/// every allocated handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The null / invalid entity sentinel.
    pub const NULL: EntityId = EntityId(0);

    /// Create an entity from a raw `u64` identifier.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Pack a slot index and generation into an identifier.
    #[must_use]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// The slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// How many times the slot was recycled before this handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns `true` unless this is [`EntityId::NULL`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.index() != 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.index(), self.generation())
    }
}

/// Allocates entity IDs, recycling destroyed slots with a bumped generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityAllocator {
    /// Current generation per slot. Slot 0 is the reserved null slot.
    generations: Vec<u32>,
    /// Whether each slot is currently handed out.
    alive: Vec<bool>,
    /// Destroyed slots available for reuse, most recent last.
    free: Vec<u32>,
}

impl EntityAllocator {
    /// Creates a new allocator with only the reserved null slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            generations: vec![0],
            alive: vec![false],
            free: Vec::new(),
        }
    }

    /// Allocates an entity ID, reusing a freed slot when one is available.
    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return EntityId::from_parts(index, self.generations[slot]);
        }

        let index = u32::try_from(self.generations.len()).unwrap_or(u32::MAX);
        self.generations.push(0);
        self.alive.push(true);
        EntityId::from_parts(index, 0)
    }

    /// Releases an entity ID. Returns `false` if it was not alive.
    pub fn free(&mut self, entity: EntityId) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = entity.index() as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(entity.index());
        true
    }

    /// Returns `true` if `entity` was allocated and not freed since.
    #[must_use]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        let slot = entity.index() as usize;
        entity.is_valid()
            && self.alive.get(slot).copied().unwrap_or(false)
            && self.generations.get(slot) == Some(&entity.generation())
    }

    /// Returns `true` if the internal tables agree with each other. Used to
    /// validate allocator state read from a saved scene.
    ///
    /// Every free slot must be a dead, non-null slot listed once; a repeated
    /// slot would be handed out twice.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if self.generations.is_empty()
            || self.generations.len() != self.alive.len()
            || self.alive[0]
        {
            return false;
        }
        let mut free = self.free.clone();
        free.sort_unstable();
        free.dedup();
        free.len() == self.free.len()
            && free.iter().all(|&index| {
                let slot = index as usize;
                slot != 0 && slot < self.alive.len() && !self.alive[slot]
            })
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.alive.iter().filter(|&&alive| alive).count()
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
