//! Gameplay component definitions for FlexECS scenes.
//!
//! Asset paths are held as [`StringIndex`] handles into the owning scene's
//! string storage, so every component here stays cheap to clone.

use flex_component::{Component, EntityId, TypeRegistry};
use flex_ecs::StringIndex;
use flex_math::Vec2;
use serde::{Deserialize, Serialize};

/// A textured quad.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sprite {
    /// Texture path in the scene's string storage.
    pub sprite_handle: StringIndex,
    /// Size in pixels.
    pub scale: Vec2,
    /// Draw centred on the entity's position instead of from its corner.
    pub center_aligned: bool,
    /// Opacity between 0 and 1.
    pub opacity: f32,
}

impl Sprite {
    /// A fully opaque sprite of the default size.
    #[must_use]
    pub fn new(sprite_handle: StringIndex) -> Self {
        Self {
            sprite_handle,
            ..Self::default()
        }
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            sprite_handle: StringIndex::NULL,
            scale: Vec2::new(100.0, 100.0),
            center_aligned: false,
            opacity: 1.0,
        }
    }
}

impl Component for Sprite {
    fn type_name() -> &'static str {
        "Sprite"
    }
}

/// A health component with current and maximum hit points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Health {
    /// Current hit points.
    pub current: f32,
    /// Maximum hit points.
    pub max: f32,
}

impl Health {
    /// Create a new health component at full HP.
    #[must_use]
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }
}

impl Component for Health {
    fn type_name() -> &'static str {
        "Health"
    }
}

/// Draw order; higher values are drawn on top.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ZIndex {
    /// Depth layer.
    pub z: i32,
}

impl Component for ZIndex {
    fn type_name() -> &'static str {
        "ZIndex"
    }
}

/// Scene graph parent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Parent {
    /// The parent entity, or [`EntityId::NULL`] for a root.
    pub parent: EntityId,
}

impl Component for Parent {
    fn type_name() -> &'static str {
        "Parent"
    }
}

/// A sound emitter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Audio {
    /// Audio file path in the scene's string storage.
    pub audio_file: StringIndex,
    /// Start playback on the next audio update.
    pub should_play: bool,
    /// Restart when playback ends.
    pub is_looping: bool,
}

impl Component for Audio {
    fn type_name() -> &'static str {
        "Audio"
    }
}

/// Register every gameplay component, plus the spatial components from
/// `flex_math`, with `registry`.
pub fn register(registry: &mut TypeRegistry) {
    flex_math::register(registry);
    registry
        .register::<Sprite>()
        .register::<Health>()
        .register::<ZIndex>()
        .register::<Parent>()
        .register::<Audio>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use flex_ecs::Scene;

    #[test]
    fn test_sprite_defaults() {
        let sprite = Sprite::default();
        assert_eq!(sprite.scale, Vec2::new(100.0, 100.0));
        assert_eq!(sprite.opacity, 1.0);
        assert!(sprite.sprite_handle.is_null());
    }

    #[test]
    fn test_health_full_saves_both_fields() {
        let health = Health::full(100.0);
        assert_eq!(health.current, health.max);
        assert_eq!(
            serde_json::to_value(health).unwrap(),
            serde_json::json!({"current": 100.0, "max": 100.0})
        );
    }

    #[test]
    fn test_parent_serializes_entity_as_number() {
        let p = Parent {
            parent: EntityId::from_parts(2, 1),
        };
        let text = serde_json::to_string(&p).unwrap();
        assert_eq!(text, format!(r#"{{"parent":{}}}"#, (1_u64 << 32) | 2));
    }

    #[test]
    fn test_register_includes_spatial_components() {
        let mut registry = TypeRegistry::new();
        register(&mut registry);
        assert!(registry.component("Position").is_some());
        assert!(registry.component("Sprite").is_some());
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn test_sprite_handle_resolves_through_scene() {
        let mut scene = Scene::new();
        let handle = scene.intern("assets/slime.png");
        let e = scene.create_entity(Some("Slime"));
        scene.add_component(e, Sprite::new(handle)).unwrap();

        let sprite = scene.try_get_component::<Sprite>(e).unwrap();
        assert_eq!(scene.string(sprite.sprite_handle), Some("assets/slime.png"));
    }
}
