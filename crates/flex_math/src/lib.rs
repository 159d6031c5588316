//! # flex_math
//!
//! Math types for the FlexECS storage engine. Re-exports [`glam`] for linear
//! algebra and defines the spatial engine components, which implement
//! [`Component`](flex_component::Component).

pub mod transform;

// Re-export glam types for convenience.
pub use glam::{EulerRot, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

pub use transform::{Position, Rotation, Scale, Transform, register};
