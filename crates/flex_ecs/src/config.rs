//! Scene configuration.

use serde::{Deserialize, Serialize};

/// How cached queries notice structural changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryInvalidation {
    /// Each archetype remembers the epoch of its last row change. A cached
    /// query is rebuilt only when one of its matched archetypes changed.
    #[default]
    ArchetypeEpoch,
    /// Every structural change drops every cached query.
    ClearAll,
}

/// Configuration for a [`Scene`](crate::Scene).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Name given to entities created without one.
    pub default_entity_name: String,
    /// Cached query invalidation policy.
    pub invalidation: QueryInvalidation,
    /// Abort loading on an unknown component or a bad field instead of
    /// skipping the column or keeping the default value.
    pub strict_load: bool,
}

impl SceneConfig {
    /// The default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the name given to unnamed entities.
    #[must_use]
    pub fn with_default_entity_name(mut self, name: impl Into<String>) -> Self {
        self.default_entity_name = name.into();
        self
    }

    /// Choose the cached query invalidation policy.
    #[must_use]
    pub fn with_invalidation(mut self, invalidation: QueryInvalidation) -> Self {
        self.invalidation = invalidation;
        self
    }

    /// Make loading fail on the first unreadable column or field.
    #[must_use]
    pub fn with_strict_load(mut self, strict: bool) -> Self {
        self.strict_load = strict;
        self
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            default_entity_name: "New Entity".to_string(),
            invalidation: QueryInvalidation::default(),
            strict_load: false,
        }
    }
}
