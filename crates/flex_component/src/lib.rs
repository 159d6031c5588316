//! # flex_component
//!
//! Storage primitives for the archetype ECS: what a component is, how a
//! column of them is laid out, and how values are reflected to and from JSON.
//!
//! This crate provides:
//!
//! - [`Component`] trait, the contract all scene data must satisfy.
//! - [`EntityId`] handles and the generational [`EntityAllocator`].
//! - [`ArchetypeTable`], dense column storage grouped by component set.
//! - [`QueryDescriptor`], declarative with/without requirements.
//! - [`TypeRegistry`] and [`TypeDescriptor`] for runtime reflection.
//!
//! Scenes, indices and persistence live in `flex_ecs`.

pub mod archetype;
pub mod column;
pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod reflect;

pub use archetype::{ArchetypeEdge, ArchetypeId, ArchetypeTable, MovedRow};
pub use column::{Column, ErasedColumn};
pub use component::{Component, ComponentId, ComponentMeta};
pub use entity::{EntityAllocator, EntityId};
pub use error::ReflectError;
pub use query::{ComponentSet, QueryDescriptor, QueryFilter};
pub use reflect::{TypeDescriptor, TypeRegistry};
