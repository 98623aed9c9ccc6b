//! Concurrent entity store: entity type -> key -> shared instance.
//!
//! A single reader/writer lock guards the whole two-level map. For a given
//! `(type, key)` the first installed instance wins and stays visible until
//! [`EntityStore::clear`].

use std::collections::HashMap;

use anyhow::Context;
use parking_lot::RwLock;

use paramflow_core::{Instance, SharedInstance};

type TypeMap = HashMap<String, HashMap<String, SharedInstance>>;

/// Outcome of [`EntityStore::install`].
#[derive(Debug)]
pub struct Installed {
    /// The instance now visible for the key
    pub entity: SharedInstance,
    /// The caller's candidate, handed back when another instance was already
    /// installed
    pub rejected: Option<Instance>,
}

/// Entity store.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: RwLock<TypeMap>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing entity for `(entity_type, key)`, or the factory's result,
    /// installed. The factory runs at most once and only when no entity is
    /// present.
    pub fn upsert<F>(&self, entity_type: &str, key: &str, factory: F) -> SharedInstance
    where
        F: FnOnce() -> SharedInstance,
    {
        if let Some(existing) = self.get(entity_type, key) {
            return existing;
        }
        let mut entities = self.entities.write();
        entities
            .entry(entity_type.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert_with(factory)
            .clone()
    }

    /// Install `candidate` unless an entity already exists for the key, in
    /// which case the candidate is handed back untouched.
    pub fn install(&self, entity_type: &str, key: &str, candidate: Instance) -> Installed {
        if let Some(entity) = self.get(entity_type, key) {
            return Installed {
                entity,
                rejected: Some(candidate),
            };
        }
        let mut entities = self.entities.write();
        let by_key = entities.entry(entity_type.to_string()).or_default();
        if let Some(entity) = by_key.get(key) {
            return Installed {
                entity: entity.clone(),
                rejected: Some(candidate),
            };
        }
        let entity = candidate.into_shared();
        by_key.insert(key.to_string(), entity.clone());
        Installed {
            entity,
            rejected: None,
        }
    }

    pub fn get(&self, entity_type: &str, key: &str) -> Option<SharedInstance> {
        self.entities.read().get(entity_type)?.get(key).cloned()
    }

    /// Snapshot of every entity of `entity_type`.
    pub fn get_all(&self, entity_type: &str) -> HashMap<String, SharedInstance> {
        self.entities
            .read()
            .get(entity_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Visit every `(type, key, entity)` triple of a snapshot taken up front.
    /// The lock is not held while `f` runs; the first error aborts the walk.
    pub fn for_each<F>(&self, mut f: F) -> anyhow::Result<()>
    where
        F: FnMut(&str, &str, &SharedInstance) -> anyhow::Result<()>,
    {
        let snapshot: Vec<(String, String, SharedInstance)> = {
            let entities = self.entities.read();
            entities
                .iter()
                .flat_map(|(entity_type, by_key)| {
                    by_key
                        .iter()
                        .map(move |(key, entity)| (entity_type.clone(), key.clone(), entity.clone()))
                })
                .collect()
        };
        for (entity_type, key, entity) in &snapshot {
            f(entity_type.as_str(), key.as_str(), entity)
                .with_context(|| format!("error processing {}[{}]", entity_type, key))?;
        }
        Ok(())
    }

    /// Entity type names present in the store, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.entities.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// Total number of stored entities.
    pub fn len(&self) -> usize {
        self.entities.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entity.
    pub fn clear(&self) {
        self.entities.write().clear();
    }
}
