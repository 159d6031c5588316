//! Query descriptors for system data access declarations.
//!
//! A [`QueryDescriptor`] names the component types an entity must have
//! (`with`) and must not have (`without`) to be matched. Descriptors are
//! ordered sets, so `(A, B)` and `(B, A)` describe the same query and share a
//! cache slot.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentId};

/// Describes which archetypes a query matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// Component types every matched entity has.
    pub with: BTreeSet<ComponentId>,
    /// Component types no matched entity has.
    pub without: BTreeSet<ComponentId>,
}

impl QueryDescriptor {
    /// Create a new empty query descriptor. It matches every entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a descriptor requiring every component of the set `Q`.
    #[must_use]
    pub fn of<Q: ComponentSet>() -> Self {
        Self {
            with: Q::component_ids().into_iter().collect(),
            without: BTreeSet::new(),
        }
    }

    /// Add a required component.
    #[must_use]
    pub fn with(mut self, type_id: ComponentId) -> Self {
        self.with.insert(type_id);
        self
    }

    /// Add an excluded component.
    #[must_use]
    pub fn without(mut self, type_id: ComponentId) -> Self {
        self.without.insert(type_id);
        self
    }

    /// Apply a filter.
    #[must_use]
    pub fn filter(self, f: QueryFilter) -> Self {
        match f {
            QueryFilter::With(id) => self.with(id),
            QueryFilter::Without(id) => self.without(id),
        }
    }

    /// Returns `true` if an archetype with the given component set matches:
    /// it is a superset of `with` and disjoint from `without`.
    #[must_use]
    pub fn matches(&self, component_types: &BTreeSet<ComponentId>) -> bool {
        self.with.is_subset(component_types) && self.without.is_disjoint(component_types)
    }
}

/// A filter that narrows the set of entities matched by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryFilter {
    /// Only match entities that have this component.
    With(ComponentId),
    /// Only match entities that do NOT have this component.
    Without(ComponentId),
}

/// A statically known set of component types, implemented for tuples of up
/// to eight components.
pub trait ComponentSet {
    /// The IDs of every component in the set, in declaration order.
    fn component_ids() -> Vec<ComponentId>;
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn component_ids() -> Vec<ComponentId> {
                vec![$($name::component_id()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
