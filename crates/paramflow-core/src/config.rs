//! Pipeline configuration.
//!
//! Defaults live in [`defaults`]; every knob can be overridden through the
//! `PARAMFLOW_*` environment variables listed in [`env_vars`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default values.
pub mod defaults {
    /// Batches at or above this size are fanned out to workers
    pub const PARALLEL_THRESHOLD: usize = 200;
    /// One worker per this many items
    pub const ITEMS_PER_WORKER: usize = 100;
    /// Worker ceiling regardless of batch size
    pub const MAX_WORKERS: usize = 10;
    /// Distinct paths kept in the key extractor's segment cache
    pub const SEGMENT_CACHE_CAPACITY: u64 = 100_000;
}

/// Environment variable names.
pub mod env_vars {
    pub const PARALLEL_THRESHOLD: &str = "PARAMFLOW_PARALLEL_THRESHOLD";
    pub const ITEMS_PER_WORKER: &str = "PARAMFLOW_ITEMS_PER_WORKER";
    pub const MAX_WORKERS: &str = "PARAMFLOW_MAX_WORKERS";
    pub const SEGMENT_CACHE_CAPACITY: &str = "PARAMFLOW_SEGMENT_CACHE_CAPACITY";
    pub const POOL_CAPACITY: &str = "PARAMFLOW_POOL_CAPACITY";
    pub const STRICT: &str = "PARAMFLOW_STRICT";
    pub const LOG_JSON: &str = "PARAMFLOW_LOG_JSON";
}

/// Tunables for the mapping pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Batches at or above this size are processed by a worker pool
    pub parallel_threshold: usize,
    /// Worker count is `ceil(len / items_per_worker)`
    pub items_per_worker: usize,
    /// Upper bound on batch workers
    pub max_workers: usize,
    /// Bound of the path segmentation cache (0 disables caching)
    pub segment_cache_capacity: u64,
    /// Idle instances kept per entity type (`None` keeps all)
    pub pool_capacity: Option<usize>,
    /// Reject unknown transforms, unknown fields and constant extractors at registration
    pub strict: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: defaults::PARALLEL_THRESHOLD,
            items_per_worker: defaults::ITEMS_PER_WORKER,
            max_workers: defaults::MAX_WORKERS,
            segment_cache_capacity: defaults::SEGMENT_CACHE_CAPACITY,
            pool_capacity: None,
            strict: false,
        }
    }
}

impl MapperConfig {
    /// Defaults overlaid with any `PARAMFLOW_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Parse a JSON document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse(env_vars::PARALLEL_THRESHOLD) {
            self.parallel_threshold = v;
        }
        if let Some(v) = env_parse(env_vars::ITEMS_PER_WORKER) {
            self.items_per_worker = v;
        }
        if let Some(v) = env_parse(env_vars::MAX_WORKERS) {
            self.max_workers = v;
        }
        if let Some(v) = env_parse(env_vars::SEGMENT_CACHE_CAPACITY) {
            self.segment_cache_capacity = v;
        }
        if let Some(v) = env_parse(env_vars::POOL_CAPACITY) {
            self.pool_capacity = Some(v);
        }
        if let Some(v) = env_parse(env_vars::STRICT) {
            self.strict = v;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::Config("max_workers must be at least 1".to_string()));
        }
        if self.items_per_worker == 0 {
            return Err(Error::Config(
                "items_per_worker must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of workers for a batch of `len` items.
    pub fn workers_for(&self, len: usize) -> usize {
        len.div_ceil(self.items_per_worker.max(1))
            .clamp(1, self.max_workers.max(1))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
