//! Type registry.
//!
//! Maps an entity type name to a [`TypeInfo`]: a factory for fresh instances,
//! the field setters (aliases included) and the cached reset routine. All of it
//! is derived from the type's [`EntitySchema`] once, at registration.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::coerce::CoercionError;
use crate::entity::{Entity, EntitySchema, Instance};
use crate::error::{Error, Result};
use crate::value::FieldValue;

/// Type-erased field setter.
pub type Setter = Arc<dyn Fn(&mut Instance, FieldValue) -> std::result::Result<(), CoercionError> + Send + Sync>;

type Factory = Arc<dyn Fn() -> Instance + Send + Sync>;
type Resetter = Arc<dyn Fn(&mut Instance) + Send + Sync>;

/// Everything the pipeline needs to know about one registered type.
pub struct TypeInfo {
    name: Arc<str>,
    factory: Factory,
    setters: HashMap<String, Setter>,
    field_names: Vec<String>,
    resetter: Resetter,
}

impl TypeInfo {
    fn build<T, F>(name: &str, factory: F, schema: EntitySchema<T>) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let name: Arc<str> = Arc::from(name);
        let mut setters: HashMap<String, Setter> = HashMap::new();
        let mut field_names = Vec::with_capacity(schema.fields.len());
        let mut resets = Vec::with_capacity(schema.fields.len());

        for spec in schema.fields {
            let set = spec.set;
            let type_name = name.clone();
            let setter: Setter = Arc::new(move |instance: &mut Instance, value: FieldValue| {
                match instance.downcast_mut::<T>() {
                    Some(target) => set(target, value),
                    None => Err(CoercionError::new(
                        &type_name,
                        crate::coerce::CoercionErrorKind::Mismatch {
                            from: "instance",
                            to: "registered type",
                        },
                    )),
                }
            });
            for alias in &spec.aliases {
                setters.insert(alias.clone(), setter.clone());
            }
            setters.insert(spec.name.clone(), setter);
            field_names.push(spec.name);
            resets.push(spec.reset);
        }

        let resetter: Resetter = Arc::new(move |instance: &mut Instance| {
            if let Some(target) = instance.downcast_mut::<T>() {
                for reset in &resets {
                    reset(target);
                }
            }
        });

        let factory_name = name.clone();
        let factory: Factory = Arc::new(move || Instance::new(factory_name.clone(), factory()));

        Self {
            name,
            factory,
            setters,
            field_names,
            resetter,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produce a fresh instance from the registered factory.
    pub fn new_instance(&self) -> Instance {
        (self.factory)()
    }

    /// Setter for a field name or one of its aliases.
    pub fn setter(&self, field: &str) -> Option<&Setter> {
        self.setters.get(field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.setters.contains_key(field)
    }

    /// Declared field names (aliases excluded).
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Reset every declared field of `instance` to its zero value.
    pub fn reset(&self, instance: &mut Instance) {
        (self.resetter)(instance)
    }

    /// Shareable reset routine, for holders that outlive a registry lookup.
    pub fn resetter(&self) -> Arc<dyn Fn(&mut Instance) + Send + Sync> {
        self.resetter.clone()
    }
}

impl std::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("fields", &self.field_names)
            .finish()
    }
}

/// Registry of entity types by name.
#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<TypeInfo>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type with an explicit factory and schema.
    ///
    /// Returns an error if the name is already taken.
    pub fn register<T, F>(&self, name: &str, factory: F, schema: EntitySchema<T>) -> Result<()>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let mut types = self.types.write();
        if types.contains_key(name) {
            return Err(Error::AlreadyRegistered(name.to_string()));
        }
        let info = TypeInfo::build(name, factory, schema);
        debug!(entity = name, fields = info.field_names.len(), "registered entity type");
        types.insert(name.to_string(), Arc::new(info));
        Ok(())
    }

    /// Register an [`Entity`] using its `Default` as the factory.
    pub fn register_entity<T: Entity>(&self, name: &str) -> Result<()> {
        self.register(name, T::default, T::schema())
    }

    pub fn get(&self, name: &str) -> Result<Arc<TypeInfo>> {
        self.types
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownEntityType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Host {
        mac_address: String,
        active: bool,
        ports: Vec<u16>,
    }

    impl Entity for Host {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::new()
                .field("MACAddress", |h: &mut Host| &mut h.mac_address)
                .alias("mac_address")
                .field("Active", |h: &mut Host| &mut h.active)
                .field("Ports", |h: &mut Host| &mut h.ports)
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = TypeRegistry::new();
        registry.register_entity::<Host>("host").unwrap();

        assert!(registry.contains("host"));
        assert_eq!(registry.names(), vec!["host".to_string()]);

        let info = registry.get("host").unwrap();
        assert_eq!(info.field_names(), &["MACAddress", "Active", "Ports"]);
        assert!(info.has_field("mac_address"));
        assert!(!info.has_field("Hostname"));
    }

    #[test]
    fn test_register_duplicate() {
        let registry = TypeRegistry::new();
        registry.register_entity::<Host>("host").unwrap();
        let result = registry.register_entity::<Host>("host");
        assert!(matches!(result, Err(Error::AlreadyRegistered(_))));
    }

    #[test]
    fn test_unknown_type() {
        let registry = TypeRegistry::new();
        assert!(matches!(registry.get("wifi"), Err(Error::UnknownEntityType(_))));
    }

    #[test]
    fn test_alias_shares_setter() {
        let registry = TypeRegistry::new();
        registry.register_entity::<Host>("host").unwrap();
        let info = registry.get("host").unwrap();

        let mut instance = info.new_instance();
        let setter = info.setter("mac_address").unwrap();
        setter(&mut instance, FieldValue::from("aa:bb")).unwrap();
        assert_eq!(instance.downcast_ref::<Host>().unwrap().mac_address, "aa:bb");
    }

    #[test]
    fn test_setter_coerces_and_reports() {
        let registry = TypeRegistry::new();
        registry.register_entity::<Host>("host").unwrap();
        let info = registry.get("host").unwrap();
        let mut instance = info.new_instance();

        info.setter("Active").unwrap()(&mut instance, FieldValue::Int(1)).unwrap();
        info.setter("Ports").unwrap()(
            &mut instance,
            FieldValue::List(vec![FieldValue::from("80"), FieldValue::UInt(443)]),
        )
        .unwrap();
        let host = instance.downcast_ref::<Host>().unwrap();
        assert!(host.active);
        assert_eq!(host.ports, vec![80, 443]);

        let err = info.setter("Ports").unwrap()(&mut instance, FieldValue::from("80")).unwrap_err();
        assert_eq!(err.field, "Ports");
    }

    #[test]
    fn test_reset_zeroes_every_field() {
        let registry = TypeRegistry::new();
        registry.register_entity::<Host>("host").unwrap();
        let info = registry.get("host").unwrap();

        let mut instance = info.new_instance();
        info.setter("MACAddress").unwrap()(&mut instance, FieldValue::from("x")).unwrap();
        info.setter("Active").unwrap()(&mut instance, FieldValue::Bool(true)).unwrap();

        info.reset(&mut instance);
        assert_eq!(instance.downcast_ref::<Host>().unwrap(), &Host::default());
    }
}
