//! Mapping pipeline benchmarks using Criterion.rs
//!
//! Run with: cargo bench -p paramflow-mapper

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use paramflow_core::{Entity, EntitySchema, TypeRegistry};
use paramflow_mapper::{
    KeyExtractor, Mapper, Pattern, Router, Rule, SegmentCache, TransformRegistry,
};

#[derive(Default)]
struct Host {
    mac_address: String,
    host_name: String,
    ip_address: String,
    active: bool,
}

impl Entity for Host {
    fn schema() -> EntitySchema<Self> {
        EntitySchema::new()
            .field("MACAddress", |h: &mut Host| &mut h.mac_address)
            .field("HostName", |h: &mut Host| &mut h.host_name)
            .field("IPAddress", |h: &mut Host| &mut h.ip_address)
            .field("Active", |h: &mut Host| &mut h.active)
    }
}

const RULES: &[(&str, &str, &str)] = &[
    ("Device.Hosts.Host.*.PhysAddress", "MACAddress", "mac_normalize"),
    ("Device.Hosts.Host.*.HostName", "HostName", "trim"),
    ("Device.Hosts.Host.*.IPAddress", "IPAddress", "ip_validate"),
    ("Device.Hosts.Host.*.Active", "Active", "bool"),
];

fn create_mapper() -> Mapper {
    let registry = TypeRegistry::new();
    registry.register_entity::<Host>("host").unwrap();
    let mapper = Mapper::new(Arc::new(registry)).unwrap();
    for (pattern, field, transform) in RULES {
        mapper
            .add_rule(
                Rule::new(
                    *pattern,
                    Pattern::compile(pattern),
                    "host",
                    *field,
                    KeyExtractor::prefixed_segment("host:", 3),
                )
                .with_transform(*transform),
            )
            .unwrap();
    }
    mapper.seal();
    mapper
}

fn create_items(hosts: usize) -> Vec<(String, String)> {
    let mut items = Vec::with_capacity(hosts * 4);
    for i in 0..hosts {
        items.push((
            format!("Device.Hosts.Host.{}.PhysAddress", i),
            format!("00-11-22-33-{:02X}-{:02X}", i / 256 % 256, i % 256),
        ));
        items.push((format!("Device.Hosts.Host.{}.HostName", i), format!(" host-{} ", i)));
        items.push((
            format!("Device.Hosts.Host.{}.IPAddress", i),
            format!("10.0.{}.{}", i / 256 % 256, i % 256),
        ));
        items.push((format!("Device.Hosts.Host.{}.Active", i), "true".to_string()));
    }
    items
}

/// Benchmark routing alone across the tiers
fn bench_router(c: &mut Criterion) {
    let router = Router::new();
    for (pattern, _, _) in RULES {
        router.add(Pattern::compile(pattern));
    }
    router.add(Pattern::compile("Device.DeviceInfo.SerialNumber"));
    router.add(Pattern::compile("*.WiFi.SSID.*.SSID"));
    router.add(Pattern::compile("*.Stats.*"));

    c.bench_function("route_exact", |b| {
        b.iter(|| black_box(router.route(black_box("Device.DeviceInfo.SerialNumber"))))
    });
    c.bench_function("route_prefix", |b| {
        b.iter(|| black_box(router.route(black_box("Device.Hosts.Host.17.HostName"))))
    });
    c.bench_function("route_suffix", |b| {
        b.iter(|| black_box(router.route(black_box("Device.WiFi.SSID.2.SSID"))))
    });
    c.bench_function("route_miss", |b| {
        b.iter(|| black_box(router.route(black_box("Device.Ethernet.Interface.1.Enable"))))
    });
}

/// Benchmark key extraction with and without the segment cache
fn bench_extractor(c: &mut Criterion) {
    let extractor = KeyExtractor::compile("host:path[3]");
    let path = "Device.Hosts.Host.42.PhysAddress";

    let cached = SegmentCache::new(1_000);
    c.bench_function("extract_cached", |b| {
        b.iter(|| black_box(extractor.extract(black_box(path), "", &cached)))
    });

    let uncached = SegmentCache::disabled();
    c.bench_function("extract_uncached", |b| {
        b.iter(|| black_box(extractor.extract(black_box(path), "", &uncached)))
    });
}

/// Benchmark transforms, memoized and direct
fn bench_transform(c: &mut Criterion) {
    let transforms = TransformRegistry::with_builtins();

    c.bench_function("transform_bool_cached", |b| {
        b.iter(|| black_box(transforms.apply_cached("bool", black_box("true"))))
    });
    c.bench_function("transform_mac_direct", |b| {
        b.iter(|| black_box(transforms.apply("mac_normalize", black_box("00-11-22-33-44-55"))))
    });
    c.bench_function("transform_chain", |b| {
        b.iter(|| black_box(transforms.apply_cached("trim|int", black_box(" 1,200 "))))
    });
}

/// Benchmark the whole pipeline
fn bench_process(c: &mut Criterion) {
    let mapper = create_mapper();
    c.bench_function("process_single", |b| {
        b.iter(|| {
            mapper
                .process(
                    black_box("Device.Hosts.Host.1.PhysAddress"),
                    black_box("00-11-22-33-44-55"),
                )
                .unwrap()
        })
    });

    let small = create_items(25);
    c.bench_function("process_batch_100_sequential", |b| {
        b.iter(|| mapper.process_batch(black_box(&small)).unwrap())
    });

    let large = create_items(1_000);
    c.bench_function("process_batch_4000_parallel", |b| {
        b.iter(|| mapper.process_batch(black_box(&large)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_router,
    bench_extractor,
    bench_transform,
    bench_process
);
criterion_main!(benches);
