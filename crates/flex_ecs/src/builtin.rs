//! Components the scene itself attaches.

use flex_component::Component;
use serde::{Deserialize, Serialize};

use crate::strings::StringIndex;

/// Display name of an entity, stored in the scene's string storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityName(pub StringIndex);

impl Component for EntityName {
    fn type_name() -> &'static str {
        "EntityName"
    }
}
