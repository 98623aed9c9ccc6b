//! Entity capability interface.
//!
//! A type becomes mappable by describing its settable fields once, through an
//! [`EntitySchema`]. Each declaration yields a setter (coerce, then assign) and
//! a resetter (assign the field's zero value), so neither field writes nor pool
//! resets inspect types at call time.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::coerce::{CoercionError, FromFieldValue};
use crate::value::FieldValue;

pub(crate) type FieldSetter<T> =
    Arc<dyn Fn(&mut T, FieldValue) -> Result<(), CoercionError> + Send + Sync>;
pub(crate) type FieldResetter<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

/// One declared field of an entity type.
pub(crate) struct FieldSpec<T> {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) set: FieldSetter<T>,
    pub(crate) reset: FieldResetter<T>,
}

/// Field table for an entity type `T`.
pub struct EntitySchema<T> {
    pub(crate) fields: Vec<FieldSpec<T>>,
}

impl<T: 'static> EntitySchema<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declare a settable field reached through `accessor`.
    pub fn field<F>(mut self, name: impl Into<String>, accessor: fn(&mut T) -> &mut F) -> Self
    where
        F: FromFieldValue + Default + 'static,
    {
        let name = name.into();
        let label = name.clone();
        let set: FieldSetter<T> = Arc::new(move |target: &mut T, value: FieldValue| {
            *accessor(target) = F::from_field_value(value, &label)?;
            Ok(())
        });
        let reset: FieldResetter<T> = Arc::new(move |target: &mut T| {
            *accessor(target) = F::default();
        });
        self.fields.push(FieldSpec {
            name,
            aliases: Vec::new(),
            set,
            reset,
        });
        self
    }

    /// Attach an alternate serialized name to the most recently declared field.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.aliases.push(alias.into());
        }
        self
    }

    /// Declared field names, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T: 'static> Default for EntitySchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A record type that knows its own field table.
///
/// ```
/// use paramflow_core::{Entity, EntitySchema};
///
/// #[derive(Debug, Default)]
/// struct Host {
///     mac_address: String,
///     active: bool,
/// }
///
/// impl Entity for Host {
///     fn schema() -> EntitySchema<Self> {
///         EntitySchema::new()
///             .field("MACAddress", |h: &mut Host| &mut h.mac_address)
///             .alias("mac_address")
///             .field("Active", |h: &mut Host| &mut h.active)
///     }
/// }
/// ```
pub trait Entity: Default + Send + Sync + 'static {
    fn schema() -> EntitySchema<Self>;
}

/// A type-erased entity instance owned by the pool or the store.
pub struct Instance {
    type_name: Arc<str>,
    inner: Box<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T: Any + Send + Sync>(type_name: Arc<str>, value: T) -> Self {
        Self {
            type_name,
            inner: Box::new(value),
        }
    }

    /// Registered type name this instance was created for.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.inner).downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        (*self.inner).downcast_mut::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.inner).is::<T>()
    }

    /// Wrap into the shared handle the store hands out.
    pub fn into_shared(self) -> SharedInstance {
        Arc::new(Mutex::new(self))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Entity handle shared between concurrent writers and readers.
pub type SharedInstance = Arc<Mutex<Instance>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Wifi {
        ssid: String,
        channel: u16,
    }

    impl Entity for Wifi {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::new()
                .field("SSID", |w: &mut Wifi| &mut w.ssid)
                .alias("ssid")
                .field("Channel", |w: &mut Wifi| &mut w.channel)
        }
    }

    #[test]
    fn test_schema_declares_fields_and_aliases() {
        let schema = Wifi::schema();
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["SSID", "Channel"]);
        assert_eq!(schema.fields[0].aliases, vec!["ssid".to_string()]);
        assert!(schema.fields[1].aliases.is_empty());
    }

    #[test]
    fn test_setter_and_resetter() {
        let schema = Wifi::schema();
        let mut wifi = Wifi::default();

        (schema.fields[0].set)(&mut wifi, FieldValue::from("Home")).unwrap();
        (schema.fields[1].set)(&mut wifi, FieldValue::from("149")).unwrap();
        assert_eq!(wifi.ssid, "Home");
        assert_eq!(wifi.channel, 149);

        for field in &schema.fields {
            (field.reset)(&mut wifi);
        }
        assert_eq!(wifi, Wifi::default());
    }

    #[test]
    fn test_instance_downcast() {
        let mut instance = Instance::new(Arc::from("wifi"), Wifi::default());
        assert!(instance.is::<Wifi>());
        assert!(instance.downcast_ref::<String>().is_none());
        instance.downcast_mut::<Wifi>().unwrap().channel = 6;
        assert_eq!(instance.downcast_ref::<Wifi>().unwrap().channel, 6);
        assert_eq!(instance.type_name(), "wifi");
    }
}
