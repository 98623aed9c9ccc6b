//! Type registry tests.
//!
//! Tests schema-derived setters across scalar and collection fields, alias
//! resolution, reset, and configuration loading.

use std::collections::HashMap;

use pretty_assertions::assert_eq;

use paramflow_core::coerce::CoercionErrorKind;
use paramflow_core::{Entity, EntitySchema, Error, FieldValue, MapperConfig, TypeRegistry};

#[derive(Debug, Default, Clone, PartialEq)]
struct AccessPoint {
    ssid: String,
    channel: u8,
    tx_power: i16,
    utilization: f32,
    enabled: bool,
    allowed_macs: Vec<String>,
    counters: HashMap<String, u64>,
    vlan: Option<u16>,
}

impl Entity for AccessPoint {
    fn schema() -> EntitySchema<Self> {
        EntitySchema::new()
            .field("SSID", |a: &mut AccessPoint| &mut a.ssid)
            .alias("ssid")
            .field("Channel", |a: &mut AccessPoint| &mut a.channel)
            .field("TransmitPower", |a: &mut AccessPoint| &mut a.tx_power)
            .alias("tx_power")
            .field("Utilization", |a: &mut AccessPoint| &mut a.utilization)
            .field("Enable", |a: &mut AccessPoint| &mut a.enabled)
            .field("AllowedMACs", |a: &mut AccessPoint| &mut a.allowed_macs)
            .field("Counters", |a: &mut AccessPoint| &mut a.counters)
            .field("VLAN", |a: &mut AccessPoint| &mut a.vlan)
    }
}

/// Helper to create a registry with the access point type.
fn create_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    registry.register_entity::<AccessPoint>("access_point").unwrap();
    registry
}

#[test]
fn test_setters_coerce_every_field_kind() {
    let registry = create_registry();
    let info = registry.get("access_point").unwrap();
    let mut instance = info.new_instance();

    let writes = [
        ("ssid", FieldValue::from("lab")),
        ("Channel", FieldValue::from("11")),
        ("tx_power", FieldValue::Float(-3.7)),
        ("Utilization", FieldValue::Int(42)),
        ("Enable", FieldValue::from("True")),
        ("AllowedMACs", FieldValue::from(vec!["aa:bb", "cc:dd"])),
        (
            "Counters",
            FieldValue::Map(vec![(FieldValue::from("rx"), FieldValue::UInt(10))]),
        ),
        ("VLAN", FieldValue::Int(100)),
    ];
    for (field, value) in writes {
        info.setter(field).unwrap()(&mut instance, value).unwrap();
    }

    let ap = instance.downcast_ref::<AccessPoint>().unwrap();
    assert_eq!(
        ap,
        &AccessPoint {
            ssid: "lab".to_string(),
            channel: 11,
            tx_power: -3,
            utilization: 42.0,
            enabled: true,
            allowed_macs: vec!["aa:bb".to_string(), "cc:dd".to_string()],
            counters: HashMap::from([("rx".to_string(), 10)]),
            vlan: Some(100),
        }
    );
}

#[test]
fn test_setter_errors_name_the_field() {
    let registry = create_registry();
    let info = registry.get("access_point").unwrap();
    let mut instance = info.new_instance();

    let err = info.setter("Channel").unwrap()(&mut instance, FieldValue::Int(300)).unwrap_err();
    assert_eq!(err.field, "Channel");
    assert_eq!(err.kind, CoercionErrorKind::Overflow("u8"));

    let err = info.setter("Channel").unwrap()(&mut instance, FieldValue::Int(-1)).unwrap_err();
    assert_eq!(err.kind, CoercionErrorKind::Negative("u8"));

    let err = info.setter("AllowedMACs").unwrap()(
        &mut instance,
        FieldValue::List(vec![FieldValue::from("ok"), FieldValue::List(Vec::new())]),
    )
    .unwrap_err();
    assert_eq!(err.field, "AllowedMACs[1]");

    // Failed writes leave the previous value in place.
    assert_eq!(instance.downcast_ref::<AccessPoint>().unwrap().channel, 0);
}

#[test]
fn test_reset_restores_zero_values() {
    let registry = create_registry();
    let info = registry.get("access_point").unwrap();
    let mut instance = info.new_instance();

    info.setter("SSID").unwrap()(&mut instance, FieldValue::from("guest")).unwrap();
    info.setter("VLAN").unwrap()(&mut instance, FieldValue::Int(7)).unwrap();
    info.reset(&mut instance);

    assert_eq!(instance.downcast_ref::<AccessPoint>().unwrap(), &AccessPoint::default());
}

#[test]
fn test_registry_errors() {
    let registry = create_registry();
    assert!(matches!(
        registry.register_entity::<AccessPoint>("access_point"),
        Err(Error::AlreadyRegistered(_))
    ));
    assert!(matches!(registry.get("radio"), Err(Error::UnknownEntityType(_))));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_config_from_json() {
    let config = MapperConfig::from_json_str(r#"{"max_workers": 4, "strict": true}"#).unwrap();
    assert_eq!(config.max_workers, 4);
    assert!(config.strict);
    assert_eq!(config.parallel_threshold, 200);
    assert_eq!(config.workers_for(1_000), 4);

    let err = MapperConfig::from_json_str(r#"{"items_per_worker": 0}"#).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
