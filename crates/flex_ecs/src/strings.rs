//! Per-scene string storage.
//!
//! Components hold a [`StringIndex`] instead of a `String` so they stay cheap
//! to copy. The backing text lives in the scene's [`StringStorage`] and is
//! saved with it. Slot 0 always holds the empty string.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Handle to a string in a scene's [`StringStorage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringIndex(pub usize);

impl StringIndex {
    /// The reserved empty string.
    pub const NULL: StringIndex = StringIndex(0);

    /// Returns `true` if this is the reserved empty-string slot.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Indexed string table with slot reuse.
///
/// Freed slots hold `None` (saved as `null`) until [`StringStorage::insert`]
/// hands them out again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringStorage {
    strings: Vec<Option<String>>,
    #[serde(default)]
    free: Vec<usize>,
}

impl StringStorage {
    /// Storage holding only the empty string.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strings: vec![Some(String::new())],
            free: Vec::new(),
        }
    }

    /// Store `value` and return its handle. Freed slots are reused first.
    pub fn insert(&mut self, value: impl Into<String>) -> StringIndex {
        let value = Some(value.into());
        if let Some(slot) = self.free.pop() {
            self.strings[slot] = value;
            return StringIndex(slot);
        }
        self.strings.push(value);
        StringIndex(self.strings.len() - 1)
    }

    /// The string behind `index`, or `None` if the slot is out of range or
    /// was freed.
    #[must_use]
    pub fn get(&self, index: StringIndex) -> Option<&str> {
        self.strings.get(index.0)?.as_deref()
    }

    /// Mutable access to the string behind `index`. The null slot is
    /// read-only.
    #[must_use]
    pub fn get_mut(&mut self, index: StringIndex) -> Option<&mut String> {
        if index.is_null() {
            return None;
        }
        self.strings.get_mut(index.0)?.as_mut()
    }

    /// Free the slot behind `index`. Components still holding the handle
    /// will read `None` until the slot is reused.
    pub fn remove(&mut self, index: StringIndex) -> Option<String> {
        let taken = if index.is_null() {
            None
        } else {
            self.strings.get_mut(index.0).and_then(Option::take)
        };
        match taken {
            Some(value) => {
                self.free.push(index.0);
                Some(value)
            }
            None => {
                warn!(index = index.0, "ignoring removal of an unused string slot");
                None
            }
        }
    }

    /// Number of slots in use, including the empty string.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len() - self.free.len()
    }

    /// Returns `true` if only the empty string is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Returns `true` if slot 0 is the empty string and the free list names
    /// exactly the vacant slots, each once. Used to validate loaded storage.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let mut free = self.free.clone();
        free.sort_unstable();
        free.dedup();
        let vacant = self.strings.iter().filter(|slot| slot.is_none()).count();
        self.strings.first().is_some_and(|slot| slot.as_deref() == Some(""))
            && free.len() == self.free.len()
            && free.len() == vacant
            && free
                .iter()
                .all(|&slot| self.strings.get(slot).is_some_and(Option::is_none))
    }
}

impl Default for StringStorage {
    fn default() -> Self {
        Self::new()
    }
}
