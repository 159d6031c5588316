//! Name-keyed registry of type descriptors.
//!
//! Loading a saved scene needs to turn a stored name (`"Position"`) back into
//! a column factory. The registry holds that mapping. It is an explicit value
//! handed to whoever needs it rather than process-wide state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::component::{Component, ComponentId, ComponentMeta};
use crate::error::ReflectError;
use crate::reflect::descriptor::{ComponentDescriptor, TypeDescriptor, record_type};
use crate::reflect::primitives;

/// Maps registered names to [`TypeDescriptor`]s.
#[derive(Default, Clone)]
pub struct TypeRegistry {
    descriptors: HashMap<&'static str, Arc<dyn TypeDescriptor>>,
    components: HashMap<ComponentId, &'static str>,
}

impl TypeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the primitive descriptors.
    #[must_use]
    pub fn with_primitives() -> Self {
        let mut registry = Self::new();
        for desc in primitives::all() {
            registry.register_descriptor(Arc::from(desc));
        }
        registry
    }

    /// Register an arbitrary descriptor. Returns `false` and leaves the
    /// existing entry in place if the name is already taken.
    pub fn register_descriptor(&mut self, desc: Arc<dyn TypeDescriptor>) -> bool {
        let name = desc.name();
        if self.descriptors.contains_key(name) {
            warn!(name, "type name already registered, keeping the first descriptor");
            return false;
        }
        if let Some(meta) = desc.component() {
            self.components.insert(meta.id, name);
        }
        self.descriptors.insert(name, desc);
        debug!(name, "registered type");
        true
    }

    /// Register component `T`. Registering the same type twice is a no-op.
    pub fn register<T: Component>(&mut self) -> &mut Self {
        let meta = T::meta();
        let registered = self
            .component(meta.name)
            .is_some_and(|existing| existing.rust_type == meta.rust_type);
        if !registered {
            self.register_descriptor(Arc::new(ComponentDescriptor::new(meta)));
        }
        self
    }

    /// Look up a descriptor by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn TypeDescriptor> {
        self.descriptors.get(name).map(|desc| desc.as_ref())
    }

    /// Look up a component's function table by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&ComponentMeta> {
        self.get(name).and_then(|desc| desc.component())
    }

    /// Look up a component's function table by ID.
    #[must_use]
    pub fn component_by_id(&self, id: ComponentId) -> Option<&ComponentMeta> {
        self.components.get(&id).and_then(|name| self.component(name))
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.descriptors.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Deserialise a record into `obj`, dispatching on the record's type tag.
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::UnknownType`] if the tag is not registered.
    pub fn deserialize(
        &self,
        obj: &mut dyn std::any::Any,
        record: &Value,
    ) -> Result<(), ReflectError> {
        let name = record_type(record)?;
        let desc = self
            .get(name)
            .ok_or_else(|| ReflectError::UnknownType(name.to_string()))?;
        desc.deserialize(obj, record)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.names())
            .finish()
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

    #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
    struct FakeHealth(u8);
    impl Component for FakeHealth {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[test]
    fn test_primitives_are_registered() {
        let registry = TypeRegistry::with_primitives();
        assert_eq!(registry.len(), 8);
        assert!(registry.get("f64").is_some());
        assert!(registry.component("f64").is_none());
    }

    #[test]
    fn test_register_component() {
        let mut registry = TypeRegistry::new();
        registry.register::<Health>().register::<Health>();
        assert_eq!(registry.len(), 1);
        let meta = registry.component("Health").unwrap();
        assert_eq!(meta.id, Health::component_id());
        assert_eq!(
            registry.component_by_id(Health::component_id()).map(|m| m.name),
            Some("Health")
        );
    }

    #[test]
    fn test_name_collision_keeps_first() {
        let mut registry = TypeRegistry::new();
        registry.register::<Health>().register::<FakeHealth>();
        let meta = registry.component("Health").unwrap();
        assert_eq!(meta.rust_type, std::any::TypeId::of::<Health>());
    }

    #[test]
    fn test_dispatch_on_record_tag() {
        let mut registry = TypeRegistry::with_primitives();
        registry.register::<Health>();

        let mut health = Health::default();
        let record = serde_json::json!({"type": "Health", "data": {"current": 3.0, "max": 5.0}});
        registry.deserialize(&mut health, &record).unwrap();
        assert_eq!(health, Health { current: 3.0, max: 5.0 });

        let unknown = serde_json::json!({"type": "Mana", "data": 1});
        assert!(matches!(
            registry.deserialize(&mut health, &unknown),
            Err(ReflectError::UnknownType(name)) if name == "Mana"
        ));
    }
}
