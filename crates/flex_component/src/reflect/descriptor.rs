//! The [`TypeDescriptor`] trait and record helpers.
//!
//! Every reflected value is written as a record of the shape
//! `{"type":"<name>","data":<value>}`. A descriptor reads and writes values
//! through `&dyn Any`, so callers holding only a type-erased reference (a
//! column row, an inspector field) can still round-trip it.

use std::any::Any;

use serde_json::Value;

use crate::component::ComponentMeta;
use crate::error::ReflectError;
use crate::reflect::escape;

/// Reflection record describing how to size, dump, serialise and
/// deserialise one type.
pub trait TypeDescriptor: Send + Sync {
    /// The registered name, used as the record's `"type"` tag.
    fn name(&self) -> &'static str;

    /// Size of one instance in bytes.
    fn size(&self) -> usize;

    /// Render `obj` as debug text.
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::WrongRustType`] if `obj` is not the described type.
    fn dump(&self, obj: &dyn Any) -> Result<String, ReflectError>;

    /// Append `obj` to `out` as a `{"type":..,"data":..}` record.
    ///
    /// # Errors
    ///
    /// Returns an error if `obj` is not the described type or cannot be
    /// represented in JSON.
    fn serialize(&self, obj: &dyn Any, out: &mut String) -> Result<(), ReflectError>;

    /// Overwrite `obj` from a parsed record. `obj` is left untouched on error.
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::TypeMismatch`] if the record's tag names a
    /// different type, or [`ReflectError::InvalidData`] if the payload does
    /// not fit.
    fn deserialize(&self, obj: &mut dyn Any, record: &Value) -> Result<(), ReflectError>;

    /// The component function table, if this descriptor describes a component.
    fn component(&self) -> Option<&ComponentMeta> {
        None
    }

    /// Serialise `obj` into a fresh string.
    ///
    /// # Errors
    ///
    /// See [`TypeDescriptor::serialize`].
    fn to_record(&self, obj: &dyn Any) -> Result<String, ReflectError> {
        let mut out = String::new();
        self.serialize(obj, &mut out)?;
        Ok(out)
    }

    /// Parse `text` as a record and deserialise it into `obj`.
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::Json`] if `text` is not JSON, otherwise see
    /// [`TypeDescriptor::deserialize`].
    fn from_record(&self, obj: &mut dyn Any, text: &str) -> Result<(), ReflectError> {
        let record: Value = serde_json::from_str(text)?;
        self.deserialize(obj, &record)
    }
}

/// Descriptor for a registered component, backed by its [`ComponentMeta`].
#[derive(Debug, Clone, Copy)]
pub struct ComponentDescriptor {
    meta: ComponentMeta,
}

impl ComponentDescriptor {
    /// Wrap a component function table.
    #[must_use]
    pub fn new(meta: ComponentMeta) -> Self {
        Self { meta }
    }
}

impl TypeDescriptor for ComponentDescriptor {
    fn name(&self) -> &'static str {
        self.meta.name
    }

    fn size(&self) -> usize {
        self.meta.size()
    }

    fn dump(&self, obj: &dyn Any) -> Result<String, ReflectError> {
        (self.meta.dump_fn)(obj)
    }

    fn serialize(&self, obj: &dyn Any, out: &mut String) -> Result<(), ReflectError> {
        (self.meta.serialize_fn)(obj, out)
    }

    fn deserialize(&self, obj: &mut dyn Any, record: &Value) -> Result<(), ReflectError> {
        (self.meta.deserialize_fn)(obj, record)
    }

    fn component(&self) -> Option<&ComponentMeta> {
        Some(&self.meta)
    }
}

/// Append a `{"type":"<name>","data":<data>}` record to `out`. `data` must
/// already be valid JSON.
pub fn write_record(out: &mut String, name: &str, data: &str) {
    out.push_str(r#"{"type":""#);
    escape::write_escaped(out, name);
    out.push_str(r#"","data":"#);
    out.push_str(data);
    out.push('}');
}

/// The `"type"` tag of a record.
///
/// # Errors
///
/// Returns [`ReflectError::MissingField`] if the tag is absent or not a string.
pub fn record_type(record: &Value) -> Result<&str, ReflectError> {
    record
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ReflectError::MissingField("type"))
}

/// The `"data"` payload of a record whose tag must equal `expected`.
///
/// # Errors
///
/// Returns [`ReflectError::TypeMismatch`] or [`ReflectError::MissingField`].
pub fn record_data<'a>(record: &'a Value, expected: &str) -> Result<&'a Value, ReflectError> {
    let found = record_type(record)?;
    if found != expected {
        return Err(ReflectError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    record.get("data").ok_or(ReflectError::MissingField("data"))
}

pub(crate) fn downcast_ref<'a, T: 'static>(
    obj: &'a dyn Any,
    type_name: &str,
) -> Result<&'a T, ReflectError> {
    obj.downcast_ref::<T>()
        .ok_or_else(|| ReflectError::WrongRustType {
            type_name: type_name.to_string(),
        })
}

pub(crate) fn downcast_mut<'a, T: 'static>(
    obj: &'a mut dyn Any,
    type_name: &str,
) -> Result<&'a mut T, ReflectError> {
    obj.downcast_mut::<T>()
        .ok_or_else(|| ReflectError::WrongRustType {
            type_name: type_name.to_string(),
        })
}
