//! Runtime reflection: descriptors that dump, serialise and deserialise
//! values through `&dyn Any`, plus the registry that finds them by name.

pub mod descriptor;
pub mod escape;
pub mod primitives;
pub mod registry;

pub use descriptor::{ComponentDescriptor, TypeDescriptor};
pub use primitives::{Primitive, PrimitiveDescriptor};
pub use registry::TypeRegistry;
