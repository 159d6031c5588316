//! Components shared by the integration tests.

#![allow(dead_code)]

use flex_component::{Component, TypeRegistry};
use flex_ecs::StringIndex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub sprite_handle: StringIndex,
}

impl Component for Sprite {
    fn type_name() -> &'static str {
        "Sprite"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
}

impl Component for Health {
    fn type_name() -> &'static str {
        "Health"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
}

impl Component for Label {
    fn type_name() -> &'static str {
        "Label"
    }
}

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::with_primitives();
    flex_math::register(&mut registry);
    registry
        .register::<Sprite>()
        .register::<Health>()
        .register::<Label>();
    registry
}
