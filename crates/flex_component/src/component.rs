//! Core [`Component`] trait and associated metadata.
//!
//! Every piece of data stored in a scene must implement [`Component`]. The
//! trait requires plain-data semantics (`Clone + Default`) so rows can be
//! cloned between entities and reset when a saved field fails to load.
//!
//! ## Name-derived Type Identity
//!
//! [`ComponentId`] is derived from the component's **registered name** using
//! the FNV-1a 64-bit hash algorithm. The same name always yields the same ID,
//! which keeps saved scenes stable across builds.

use std::alloc::Layout;
use std::any::{Any, TypeId};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::column::ErasedColumn;
use crate::error::ReflectError;
use crate::reflect::descriptor::{downcast_mut, downcast_ref, record_data, write_record};

/// A unique identifier for a component type, derived from its registered
/// name using the FNV-1a 64-bit hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl ComponentId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Hash a registered name. XOR each byte into the state, then multiply
    /// by the prime. Usable in `const` context, so IDs of well-known names
    /// can be computed at compile time.
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Compute the [`ComponentId`] for a Rust component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Per-type function table used by type-erased storage and reflection.
///
/// A `ComponentMeta` is everything a scene needs to create a column for a
/// component, move rows in and out of it, and dump, serialise or deserialise
/// one instance without knowing the concrete type.
#[derive(Debug, Clone, Copy)]
pub struct ComponentMeta {
    /// The unique type identifier.
    pub id: ComponentId,
    /// The registered name of the component (e.g. `"Position"`).
    pub name: &'static str,
    /// Size and alignment of one component instance.
    pub layout: Layout,
    /// The Rust type backing this component. Two different Rust types must
    /// never share a registered name.
    pub rust_type: TypeId,
    /// Create an empty column able to hold this component.
    pub new_column: fn() -> Box<dyn ErasedColumn>,
    /// Render one instance as debug text.
    pub dump_fn: fn(&dyn Any) -> Result<String, ReflectError>,
    /// Append one instance as a `{"type":..,"data":..}` record.
    pub serialize_fn: fn(&dyn Any, &mut String) -> Result<(), ReflectError>,
    /// Overwrite one instance from a `{"type":..,"data":..}` record.
    pub deserialize_fn: fn(&mut dyn Any, &Value) -> Result<(), ReflectError>,
}

impl ComponentMeta {
    /// Size of one component instance in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.layout.size()
    }
}

/// Data that can live in a scene column.
///
/// ```rust
/// use flex_component::{Component, ComponentId};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Layer(i32);
///
/// impl Component for Layer {
///     fn type_name() -> &'static str { "Layer" }
/// }
///
/// assert_eq!(Layer::component_id(), ComponentId::from_name("Layer"));
/// ```
pub trait Component:
    Clone + Default + fmt::Debug + Send + Sync + 'static + Serialize + for<'de> Deserialize<'de>
{
    /// The registered name for this component type. Saved scenes refer to
    /// components by this name.
    fn type_name() -> &'static str;

    /// Returns the [`ComponentId`] for this component.
    fn component_id() -> ComponentId {
        ComponentId::from_name(Self::type_name())
    }

    /// Returns the [`ComponentMeta`] function table for this component type.
    fn meta() -> ComponentMeta {
        ComponentMeta {
            id: Self::component_id(),
            name: Self::type_name(),
            layout: Layout::new::<Self>(),
            rust_type: TypeId::of::<Self>(),
            new_column: || Box::new(Vec::<Self>::new()),
            dump_fn: |obj| {
                let value = downcast_ref::<Self>(obj, Self::type_name())?;
                Ok(format!("{value:?}"))
            },
            serialize_fn: |obj, out| {
                let value = downcast_ref::<Self>(obj, Self::type_name())?;
                let data = serde_json::to_string(value)?;
                write_record(out, Self::type_name(), &data);
                Ok(())
            },
            deserialize_fn: |obj, record| {
                let data = record_data(record, Self::type_name())?;
                let value = Self::deserialize(data).map_err(|e| ReflectError::InvalidData {
                    type_name: Self::type_name().to_string(),
                    message: e.to_string(),
                })?;
                *downcast_mut::<Self>(obj, Self::type_name())? = value;
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[test]
    fn test_component_id_matches_from_name() {
        assert_eq!(Health::component_id(), ComponentId::from_name("Health"));
        assert_eq!(ComponentId::of::<Health>(), Health::component_id());
    }

    #[test]
    fn test_component_id_differs_between_names() {
        assert_ne!(
            ComponentId::from_name("Health"),
            ComponentId::from_name("Velocity")
        );
    }

    #[test]
    fn test_fnv1a_known_vector() {
        // FNV-1a 64-bit of the empty string is the offset basis itself.
        assert_eq!(
            ComponentId::from_name(""),
            ComponentId(0xcbf2_9ce4_8422_2325)
        );
    }

    #[test]
    fn test_component_meta_layout() {
        let meta = Health::meta();
        assert_eq!(meta.name, "Health");
        assert_eq!(meta.layout, Layout::new::<Health>());
        assert_eq!(meta.size(), std::mem::size_of::<Health>());
        assert_eq!(meta.rust_type, TypeId::of::<Health>());
    }

    #[test]
    fn test_meta_serialize_roundtrip() {
        let meta = Health::meta();
        let health = Health {
            current: 80.0,
            max: 100.0,
        };
        let mut out = String::new();
        (meta.serialize_fn)(&health, &mut out).unwrap();
        assert_eq!(out, r#"{"type":"Health","data":{"current":80.0,"max":100.0}}"#);

        let record: Value = serde_json::from_str(&out).unwrap();
        let mut restored = Health::default();
        (meta.deserialize_fn)(&mut restored, &record).unwrap();
        assert_eq!(health, restored);
    }

    #[test]
    fn test_meta_rejects_wrong_record_type() {
        let meta = Health::meta();
        let record = serde_json::json!({"type": "Velocity", "data": {"current": 1.0, "max": 1.0}});
        let mut restored = Health::default();
        let err = (meta.deserialize_fn)(&mut restored, &record).unwrap_err();
        assert!(matches!(err, ReflectError::TypeMismatch { .. }));
        assert_eq!(restored, Health::default());
    }

    #[test]
    fn test_meta_rejects_wrong_rust_type() {
        let meta = Health::meta();
        let mut out = String::new();
        let err = (meta.serialize_fn)(&5_i32, &mut out).unwrap_err();
        assert!(matches!(err, ReflectError::WrongRustType { .. }));
        assert!(out.is_empty());
    }
}
