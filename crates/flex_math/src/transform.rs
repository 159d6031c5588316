//! Spatial engine components.
//!
//! Position, rotation and scale are separate components so systems can query
//! exactly what they touch. [`Transform`] caches the model matrix built from
//! them.

use flex_component::{Component, TypeRegistry};
use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World-space position.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// Position in world units.
    pub position: Vec3,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
        }
    }
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

/// Euler rotation in degrees, applied X then Y then Z.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rotation {
    /// Rotation about each axis, in degrees.
    pub rotation: Vec3,
}

impl Rotation {
    /// The rotation as a unit quaternion.
    #[must_use]
    pub fn to_quat(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x.to_radians(),
            self.rotation.y.to_radians(),
            self.rotation.z.to_radians(),
        )
    }
}

impl Component for Rotation {
    fn type_name() -> &'static str {
        "Rotation"
    }
}

/// Per-axis scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Scale {
    /// Scale factor per axis.
    pub scale: Vec3,
}

impl Default for Scale {
    fn default() -> Self {
        Self { scale: Vec3::ONE }
    }
}

impl Component for Scale {
    fn type_name() -> &'static str {
        "Scale"
    }
}

/// Cached model matrix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    /// Model matrix built from position, rotation and scale.
    pub transform: Mat4,
    /// Inactive transforms are skipped by consumers.
    pub is_active: bool,
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        transform: Mat4::IDENTITY,
        is_active: true,
    };

    /// Build the model matrix from its parts.
    #[must_use]
    pub fn from_parts(position: &Position, rotation: &Rotation, scale: &Scale) -> Self {
        Self {
            transform: Mat4::from_scale_rotation_translation(
                scale.scale,
                rotation.to_quat(),
                position.position,
            ),
            is_active: true,
        }
    }

    /// The translation part of the matrix.
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform {
    fn type_name() -> &'static str {
        "Transform"
    }
}

/// Register every spatial component with `registry`.
pub fn register(registry: &mut TypeRegistry) {
    registry
        .register::<Position>()
        .register::<Rotation>()
        .register::<Scale>()
        .register::<Transform>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(Position::default().position, Vec3::ZERO);
        assert_eq!(Rotation::default().rotation, Vec3::ZERO);
        assert_eq!(Scale::default().scale, Vec3::ONE);
        assert_eq!(Transform::default().transform, Mat4::IDENTITY);
        assert!(Transform::default().is_active);
    }

    #[test]
    fn test_from_parts_identity() {
        let t = Transform::from_parts(&Position::default(), &Rotation::default(), &Scale::default());
        assert_eq!(t.transform, Mat4::IDENTITY);
    }

    #[test]
    fn test_from_parts_translation() {
        let t = Transform::from_parts(
            &Position::new(1.0, 2.0, 3.0),
            &Rotation::default(),
            &Scale::default(),
        );
        assert_eq!(t.translation(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let r = Rotation {
            rotation: Vec3::new(0.0, 0.0, 90.0),
        };
        let turned = r.to_quat() * Vec3::X;
        assert!(turned.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let p = Position::new(1.0, -2.5, 3.0);
        let text = serde_json::to_string(&p).unwrap();
        assert_eq!(text, r#"{"position":[1.0,-2.5,3.0]}"#);
        let restored: Position = serde_json::from_str(&text).unwrap();
        assert_eq!(p, restored);
    }

    #[test]
    fn test_register() {
        let mut registry = TypeRegistry::new();
        register(&mut registry);
        assert_eq!(registry.names(), vec!["Position", "Rotation", "Scale", "Transform"]);
    }
}
