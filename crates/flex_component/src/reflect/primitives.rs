//! Descriptors for primitive field types.
//!
//! Dumps look like `i32{5}` and records like `{"type":"i32","data":5}`.
//! Floats that are not finite cannot be written; integers that do not fit the
//! target width are rejected on read.

use std::any::Any;
use std::fmt::Display;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReflectError;
use crate::reflect::descriptor::{
    TypeDescriptor, downcast_mut, downcast_ref, record_data, write_record,
};
use crate::reflect::escape;

/// A primitive value with a fixed registered name.
pub trait Primitive: Serialize + DeserializeOwned + Display + Send + Sync + 'static {
    /// Registered name, used as the record tag.
    const NAME: &'static str;

    /// Append the value's JSON text to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::InvalidData`] if the value has no JSON form.
    fn write_json(&self, out: &mut String) -> Result<(), ReflectError> {
        out.push_str(&serde_json::to_string(self)?);
        Ok(())
    }
}

macro_rules! impl_primitive {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(impl Primitive for $ty {
            const NAME: &'static str = $name;
        })+
    };
}

impl_primitive!(
    bool => "bool",
    i32 => "i32",
    u32 => "u32",
    i64 => "i64",
    u64 => "u64",
);

macro_rules! impl_float_primitive {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(impl Primitive for $ty {
            const NAME: &'static str = $name;

            fn write_json(&self, out: &mut String) -> Result<(), ReflectError> {
                if !self.is_finite() {
                    return Err(ReflectError::InvalidData {
                        type_name: $name.to_string(),
                        message: format!("{self} has no JSON representation"),
                    });
                }
                out.push_str(&serde_json::to_string(self)?);
                Ok(())
            }
        })+
    };
}

impl_float_primitive!(f32 => "f32", f64 => "f64");

impl Primitive for String {
    const NAME: &'static str = "String";

    fn write_json(&self, out: &mut String) -> Result<(), ReflectError> {
        out.push('"');
        escape::write_escaped(out, self);
        out.push('"');
        Ok(())
    }
}

/// Descriptor for any [`Primitive`] type.
pub struct PrimitiveDescriptor<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> PrimitiveDescriptor<T> {
    /// Create the descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for PrimitiveDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Primitive> TypeDescriptor for PrimitiveDescriptor<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    fn dump(&self, obj: &dyn Any) -> Result<String, ReflectError> {
        let value = downcast_ref::<T>(obj, T::NAME)?;
        Ok(format!("{}{{{value}}}", T::NAME))
    }

    fn serialize(&self, obj: &dyn Any, out: &mut String) -> Result<(), ReflectError> {
        let value = downcast_ref::<T>(obj, T::NAME)?;
        let mut data = String::new();
        value.write_json(&mut data)?;
        write_record(out, T::NAME, &data);
        Ok(())
    }

    fn deserialize(&self, obj: &mut dyn Any, record: &Value) -> Result<(), ReflectError> {
        let data = record_data(record, T::NAME)?;
        let value = T::deserialize(data).map_err(|e| ReflectError::InvalidData {
            type_name: T::NAME.to_string(),
            message: e.to_string(),
        })?;
        *downcast_mut::<T>(obj, T::NAME)? = value;
        Ok(())
    }
}

/// Descriptors for every built-in primitive.
#[must_use]
pub fn all() -> Vec<Box<dyn TypeDescriptor>> {
    vec![
        Box::new(PrimitiveDescriptor::<bool>::new()),
        Box::new(PrimitiveDescriptor::<i32>::new()),
        Box::new(PrimitiveDescriptor::<u32>::new()),
        Box::new(PrimitiveDescriptor::<i64>::new()),
        Box::new(PrimitiveDescriptor::<u64>::new()),
        Box::new(PrimitiveDescriptor::<f32>::new()),
        Box::new(PrimitiveDescriptor::<f64>::new()),
        Box::new(PrimitiveDescriptor::<String>::new()),
    ]
}
