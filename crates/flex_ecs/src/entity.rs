//! Entity views bound to a scene.
//!
//! [`EntityRef`] and [`EntityMut`] pair an [`EntityId`] with a borrow of its
//! scene, so component calls read `player.get::<Health>()` instead of passing
//! the handle around. A view can only be obtained for a live entity, and the
//! borrow keeps the scene from changing underneath it.

use flex_component::{Component, ComponentMeta, EntityId};

use crate::error::{EcsError, EcsResult};
use crate::scene::Scene;

/// Read-only view of a live entity.
#[derive(Debug, Clone, Copy)]
pub struct EntityRef<'s> {
    scene: &'s Scene,
    id: EntityId,
}

impl<'s> EntityRef<'s> {
    /// The entity's handle.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Borrow the entity's `T`.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&'s T> {
        self.scene.try_get_component::<T>(self.id)
    }

    /// Returns `true` if the entity carries a `T`.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.scene.has_component::<T>(self.id)
    }

    /// The entity's display name.
    #[must_use]
    pub fn name(&self) -> Option<&'s str> {
        self.scene.entity_name(self.id)
    }

    /// Function tables of every component on the entity.
    #[must_use]
    pub fn components(&self) -> Vec<ComponentMeta> {
        self.scene.components_of(self.id).unwrap_or_default()
    }
}

impl PartialEq for EntityRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.scene, other.scene)
    }
}

/// Mutable view of a live entity.
#[derive(Debug)]
pub struct EntityMut<'s> {
    scene: &'s mut Scene,
    id: EntityId,
}

impl EntityMut<'_> {
    /// The entity's handle.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Attach `value`. Returns `Ok(false)` if a `T` is already attached.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NameCollision`] if `T`'s name belongs to another type.
    pub fn add<T: Component>(&mut self, value: T) -> EcsResult<bool> {
        self.scene.add_component(self.id, value)
    }

    /// Detach and return the entity's `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NameCollision`] if `T`'s name belongs to another type.
    pub fn remove<T: Component>(&mut self) -> EcsResult<Option<T>> {
        self.scene.remove_component::<T>(self.id)
    }

    /// Borrow the entity's `T`.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.scene.try_get_component::<T>(self.id)
    }

    /// Mutably borrow the entity's `T`.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.scene.get_component_mut::<T>(self.id).ok().flatten()
    }

    /// Returns `true` if the entity carries a `T`.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.scene.has_component::<T>(self.id)
    }

    /// Create a copy of the entity and return its handle.
    ///
    /// # Errors
    ///
    /// Never fails for a live view; the signature matches [`Scene::clone_entity`].
    pub fn duplicate(&mut self) -> EcsResult<EntityId> {
        self.scene.clone_entity(self.id)
    }

    /// Destroy the entity, consuming the view.
    ///
    /// # Errors
    ///
    /// Never fails for a live view; the signature matches [`Scene::destroy_entity`].
    pub fn destroy(self) -> EcsResult<()> {
        self.scene.destroy_entity(self.id)
    }

    /// Downgrade to a read-only view.
    #[must_use]
    pub fn as_readonly(&self) -> EntityRef<'_> {
        EntityRef {
            scene: &*self.scene,
            id: self.id,
        }
    }
}

impl Scene {
    /// A read-only view of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for a stale handle.
    pub fn entity(&self, id: EntityId) -> EcsResult<EntityRef<'_>> {
        if !self.is_alive(id) {
            return Err(EcsError::EntityNotFound(id));
        }
        Ok(EntityRef { scene: self, id })
    }

    /// A mutable view of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for a stale handle.
    pub fn entity_mut(&mut self, id: EntityId) -> EcsResult<EntityMut<'_>> {
        if !self.is_alive(id) {
            return Err(EcsError::EntityNotFound(id));
        }
        Ok(EntityMut { scene: self, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
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
    fn test_entity_mut_roundtrip() {
        let mut scene = Scene::new();
        let id = scene.create_entity(Some("Slime"));
        {
            let mut slime = scene.entity_mut(id).unwrap();
            assert!(slime.add(Health { current: 5.0, max: 5.0 }).unwrap());
            slime.get_mut::<Health>().unwrap().current = 2.0;
            assert!(slime.has::<Health>());
            assert_eq!(slime.as_readonly().name(), Some("Slime"));
        }

        let slime = scene.entity(id).unwrap();
        assert_eq!(slime.get::<Health>().map(|h| h.current), Some(2.0));
        assert_eq!(slime.components().len(), 2);
        assert_eq!(slime, scene.entity(id).unwrap());
    }

    #[test]
    fn test_destroy_through_view() {
        let mut scene = Scene::new();
        let id = scene.create_empty_entity();
        scene.entity_mut(id).unwrap().destroy().unwrap();
        assert!(matches!(scene.entity(id), Err(EcsError::EntityNotFound(_))));
        assert!(scene.entity_mut(id).is_err());
    }
}
