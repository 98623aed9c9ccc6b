//! Per-type reservoirs of reusable entity instances.
//!
//! Instances are reset before they become available again, using the reset
//! routine the type registry derived from the entity schema. An instance is
//! owned by exactly one holder at a time (it moves into and out of the pool),
//! so the same instance can never be reset and handed out concurrently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use paramflow_core::{Instance, TypeInfo};

struct Reservoir {
    idle: Mutex<Vec<Instance>>,
    reset: Arc<dyn Fn(&mut Instance) + Send + Sync>,
    capacity: Option<usize>,
    dropped: AtomicU64,
}

/// Object pool keyed by entity type name.
pub struct ObjectPool {
    reservoirs: RwLock<HashMap<String, Arc<Reservoir>>>,
    capacity: Option<usize>,
}

impl ObjectPool {
    /// Unbounded pool.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Pool keeping at most `capacity` idle instances per type.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            reservoirs: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Create the reservoir for `info` if it does not exist yet.
    pub fn register(&self, info: &TypeInfo) {
        if self.is_registered(info.name()) {
            return;
        }
        let mut reservoirs = self.reservoirs.write();
        reservoirs.entry(info.name().to_string()).or_insert_with(|| {
            debug!(entity = info.name(), "registered pool reservoir");
            Arc::new(Reservoir {
                idle: Mutex::new(Vec::new()),
                reset: info.resetter(),
                capacity: self.capacity,
                dropped: AtomicU64::new(0),
            })
        });
    }

    pub fn is_registered(&self, entity: &str) -> bool {
        self.reservoirs.read().contains_key(entity)
    }

    fn reservoir(&self, entity: &str) -> Option<Arc<Reservoir>> {
        self.reservoirs.read().get(entity).cloned()
    }

    /// Take a clean instance, or `None` when the caller must allocate.
    pub fn get(&self, entity: &str) -> Option<Instance> {
        self.reservoir(entity)?.idle.lock().pop()
    }

    /// Reset `instance` and make it available again.
    ///
    /// Instances of unregistered types, and instances beyond the reservoir
    /// capacity, are dropped.
    pub fn put(&self, mut instance: Instance) {
        let Some(reservoir) = self.reservoir(instance.type_name()) else {
            trace!(entity = instance.type_name(), "dropping instance of unpooled type");
            return;
        };
        (reservoir.reset)(&mut instance);

        let mut idle = reservoir.idle.lock();
        if reservoir.capacity.is_some_and(|cap| idle.len() >= cap) {
            reservoir.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        idle.push(instance);
    }

    /// Idle instances available for `entity`.
    pub fn available(&self, entity: &str) -> usize {
        self.reservoir(entity).map_or(0, |r| r.idle.lock().len())
    }

    /// Instances discarded because the reservoir was full.
    pub fn dropped(&self, entity: &str) -> u64 {
        self.reservoir(entity)
            .map_or(0, |r| r.dropped.load(Ordering::Relaxed))
    }
}

impl Default for ObjectPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObjectPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<String> = self.reservoirs.read().keys().cloned().collect();
        types.sort();
        f.debug_struct("ObjectPool")
            .field("types", &types)
            .field("capacity", &self.capacity)
            .finish()
    }
}
