//! Mapping orchestrator.
//!
//! Wires routing, key extraction, pooling, the entity store and transforms:
//!
//! ```text
//! (path, value) -> Router -> Rule -> key -> pool/factory -> Store
//!                                 -> transform -> setter -> entity field
//! ```
//!
//! Unmatched paths are counted and skipped. Transform and setter failures are
//! reported to the error handler and stop only the item at hand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, error, info, trace, warn};

use paramflow_core::{FieldValue, MapperConfig, SharedInstance, TypeRegistry};

use crate::cancel::CancelToken;
use crate::error::{MapperError, Result};
use crate::extractor::SegmentCache;
use crate::pattern::{Pattern, PatternId};
use crate::pool::ObjectPool;
use crate::router::Router;
use crate::rule::{CompiledRule, Rule};
use crate::stats::{MapperStats, StatsSnapshot};
use crate::store::EntityStore;
use crate::transform::TransformRegistry;

/// Callback receiving per-item transform and setter failures.
pub type ErrorHandler = Arc<dyn Fn(&MapperError) + Send + Sync>;

fn log_error(err: &MapperError) {
    if err.is_item_error() {
        warn!(error = %err, "mapping failed");
    } else {
        error!(error = %err, "mapper error");
    }
}

/// Builder for [`Mapper`].
pub struct MapperBuilder {
    registry: Arc<TypeRegistry>,
    config: MapperConfig,
    transforms: Option<TransformRegistry>,
    error_handler: Option<ErrorHandler>,
}

impl MapperBuilder {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            config: MapperConfig::default(),
            transforms: None,
            error_handler: None,
        }
    }

    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `transforms` instead of a fresh registry of builtins.
    pub fn with_transforms(mut self, transforms: TransformRegistry) -> Self {
        self.transforms = Some(transforms);
        self
    }

    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&MapperError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Mapper> {
        self.config.validate()?;

        let pool = ObjectPool::with_capacity(self.config.pool_capacity);
        for name in self.registry.names() {
            pool.register(&*self.registry.get(&name)?);
        }

        Ok(Mapper {
            router: Router::new(),
            rules: RwLock::new(Vec::new()),
            store: EntityStore::new(),
            pool,
            transforms: self.transforms.unwrap_or_default(),
            segments: SegmentCache::new(self.config.segment_cache_capacity),
            stats: MapperStats::new(),
            error_handler: self
                .error_handler
                .unwrap_or_else(|| Arc::new(log_error) as ErrorHandler),
            sealed: AtomicBool::new(false),
            registry: self.registry,
            config: self.config,
        })
    }
}

/// The mapping pipeline.
pub struct Mapper {
    router: Router,
    /// Indexed by [`PatternId`]
    rules: RwLock<Vec<Arc<CompiledRule>>>,
    registry: Arc<TypeRegistry>,
    store: EntityStore,
    pool: ObjectPool,
    transforms: TransformRegistry,
    segments: SegmentCache,
    stats: MapperStats,
    error_handler: ErrorHandler,
    config: MapperConfig,
    sealed: AtomicBool,
}

impl Mapper {
    pub fn builder(registry: Arc<TypeRegistry>) -> MapperBuilder {
        MapperBuilder::new(registry)
    }

    /// Mapper with the default configuration and builtin transforms.
    pub fn new(registry: Arc<TypeRegistry>) -> Result<Self> {
        MapperBuilder::new(registry).build()
    }

    /// Register a rule and return its routing identifier.
    ///
    /// Fails when the entity type is not registered or the mapper is sealed.
    /// In strict mode undeclared fields, unknown transforms and constant key
    /// extractors are rejected too; otherwise they are logged and tolerated.
    pub fn add_rule(&self, rule: Rule) -> Result<PatternId> {
        if self.is_sealed() {
            return Err(MapperError::Sealed(format!("rule {}", rule.name)));
        }
        let strict = self.config.strict;
        let type_info = self.registry.get(&rule.entity)?;

        let setter = type_info.setter(&rule.field).cloned();
        if setter.is_none() {
            if strict {
                return Err(paramflow_core::Error::UnknownField {
                    entity: rule.entity.clone(),
                    field: rule.field.clone(),
                }
                .into());
            }
            warn!(
                rule = %rule.name,
                entity = %rule.entity,
                field = %rule.field,
                "field not declared by entity type, values will be dropped"
            );
        }

        if let Some(name) = &rule.transform {
            if !self.transforms.contains(name) {
                if strict {
                    return Err(MapperError::UnknownTransform {
                        rule: rule.name.clone(),
                        name: name.clone(),
                    });
                }
                warn!(rule = %rule.name, transform = %name, "unknown transform, values pass through");
            }
        }

        if rule.extractor.is_constant() {
            if strict {
                return Err(MapperError::ConstantExtractor {
                    rule: rule.name.clone(),
                    expr: rule.extractor.to_string(),
                });
            }
            warn!(rule = %rule.name, key = %rule.extractor, "key extractor is constant");
        }

        self.pool.register(&type_info);

        let mut pattern = rule.pattern.clone();
        pattern.entity = rule.entity.clone();
        pattern.field = rule.field.clone();

        // Holding the rules lock keeps pattern ids aligned with rule indices
        // and orders registration against seal().
        let mut rules = self.rules.write();
        if self.is_sealed() {
            return Err(MapperError::Sealed(format!("rule {}", rule.name)));
        }
        let id = self.router.add(pattern);
        debug_assert_eq!(id.index(), rules.len());
        debug!(rule = %rule.name, %id, entity = %rule.entity, field = %rule.field, "added rule");
        rules.push(Arc::new(CompiledRule {
            id,
            rule,
            type_info,
            setter,
        }));
        Ok(id)
    }

    /// Register several rules, stopping at the first failure.
    pub fn add_rules<I>(&self, rules: I) -> Result<Vec<PatternId>>
    where
        I: IntoIterator<Item = Rule>,
    {
        rules.into_iter().map(|rule| self.add_rule(rule)).collect()
    }

    /// Freeze rule and transform registration.
    pub fn seal(&self) {
        let rules = self.rules.write();
        self.sealed.store(true, Ordering::Release);
        self.transforms.seal();
        info!(rules = rules.len(), "mapper sealed");
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Map one `(path, value)` pair.
    pub fn process(&self, path: &str, value: &str) -> Result<()> {
        let start = Instant::now();

        let Some(pattern) = self.router.route(path) else {
            trace!(path, "no rule matched");
            self.stats.record_unmatched();
            return Ok(());
        };
        self.stats.record_matched();

        let result = self.apply(&pattern, path, value);
        self.stats.record_processed(start.elapsed());
        result
    }

    /// [`process`](Self::process), unless `cancel` has already fired.
    pub fn process_with_cancel(&self, path: &str, value: &str, cancel: &CancelToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(MapperError::Cancelled);
        }
        self.process(path, value)
    }

    fn apply(&self, pattern: &Pattern, path: &str, value: &str) -> Result<()> {
        let rule = self.rule_for(pattern)?;
        let key = rule.rule.extractor.extract(path, value, &self.segments);
        let entity = self.resolve_entity(&rule, &key);

        let field_value = match &rule.rule.transform {
            Some(name) => match self.transforms.apply_cached(name, value) {
                Ok(transformed) => transformed,
                Err(source) => {
                    self.report(MapperError::Transform {
                        name: name.clone(),
                        value: value.to_string(),
                        source,
                    });
                    return Ok(());
                }
            },
            None => FieldValue::String(value.to_string()),
        };

        let Some(setter) = &rule.setter else {
            trace!(path, field = %rule.rule.field, "no setter for field");
            return Ok(());
        };
        let outcome = setter(&mut *entity.lock(), field_value);
        if let Err(source) = outcome {
            self.report(MapperError::Setter {
                entity: rule.rule.entity.clone(),
                field: rule.rule.field.clone(),
                source,
            });
        }
        Ok(())
    }

    fn rule_for(&self, pattern: &Pattern) -> Result<Arc<CompiledRule>> {
        pattern
            .id
            .and_then(|id| self.rules.read().get(id.index()).cloned())
            .ok_or_else(|| MapperError::RuleNotFound(pattern.text.clone()))
    }

    /// Pool first, factory second; a candidate that loses the install race
    /// goes back to the pool.
    fn resolve_entity(&self, rule: &CompiledRule, key: &str) -> SharedInstance {
        let entity_type = rule.type_info.name();
        let candidate = match self.pool.get(entity_type) {
            Some(instance) => {
                self.stats.record_reuse();
                instance
            }
            None => {
                self.stats.record_allocation();
                rule.type_info.new_instance()
            }
        };

        let installed = self.store.install(entity_type, key, candidate);
        if let Some(rejected) = installed.rejected {
            self.pool.put(rejected);
        }
        installed.entity
    }

    fn report(&self, err: MapperError) {
        self.stats.record_failed();
        (self.error_handler)(&err);
    }

    /// Map a batch of `(path, value)` pairs.
    pub fn process_batch<P, V>(&self, items: &[(P, V)]) -> Result<()>
    where
        P: AsRef<str> + Sync,
        V: AsRef<str> + Sync,
    {
        self.process_batch_with_cancel(items, &CancelToken::new())
    }

    /// Map a batch, checking `cancel` before each item.
    ///
    /// Batches below the configured threshold run in order on the calling
    /// thread. Larger ones are spread over a bounded set of worker threads in
    /// no particular order; the first error seen by any worker is returned
    /// after all workers stop. Writes already applied are kept.
    pub fn process_batch_with_cancel<P, V>(&self, items: &[(P, V)], cancel: &CancelToken) -> Result<()>
    where
        P: AsRef<str> + Sync,
        V: AsRef<str> + Sync,
    {
        if items.len() < self.config.parallel_threshold {
            for (done, (path, value)) in items.iter().enumerate() {
                if cancel.is_cancelled() {
                    debug!(done, remaining = items.len() - done, "batch cancelled");
                    return Err(MapperError::Cancelled);
                }
                self.process(path.as_ref(), value.as_ref())?;
            }
            return Ok(());
        }
        self.process_parallel(items, cancel)
    }

    fn process_parallel<P, V>(&self, items: &[(P, V)], cancel: &CancelToken) -> Result<()>
    where
        P: AsRef<str> + Sync,
        V: AsRef<str> + Sync,
    {
        let workers = self.config.workers_for(items.len());
        debug!(items = items.len(), workers, "processing batch in parallel");

        let (work_tx, work_rx) = async_channel::bounded::<usize>(workers * 2);
        let (err_tx, err_rx) = async_channel::bounded::<MapperError>(1);

        thread::scope(|scope| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let err_tx = err_tx.clone();
                scope.spawn(move || {
                    let mut done = 0usize;
                    while let Ok(index) = work_rx.recv_blocking() {
                        if cancel.is_cancelled() {
                            let _ = err_tx.try_send(MapperError::Cancelled);
                            break;
                        }
                        let (path, value) = &items[index];
                        if let Err(err) = self.process(path.as_ref(), value.as_ref()) {
                            let _ = err_tx.try_send(err);
                            break;
                        }
                        done += 1;
                    }
                    debug!(done, "batch worker finished");
                });
            }
            drop(work_rx);

            for index in 0..items.len() {
                if cancel.is_cancelled() {
                    debug!(queued = index, "batch cancelled");
                    let _ = err_tx.try_send(MapperError::Cancelled);
                    break;
                }
                // Fails only once every worker has stopped.
                if work_tx.send_blocking(index).is_err() {
                    break;
                }
            }
            drop(work_tx);
        });

        match err_rx.try_recv() {
            Ok(err) => Err(err),
            Err(_) => Ok(()),
        }
    }

    /// Best matching pattern for `path`, without processing anything.
    pub fn route(&self, path: &str) -> Option<Arc<Pattern>> {
        self.router.route(path)
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn pool(&self) -> &ObjectPool {
        &self.pool
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.transforms.cache_stats())
    }

    /// Zero the pipeline and transform cache counters.
    pub fn reset_stats(&self) {
        self.stats.reset();
        self.transforms.reset_cache_stats();
    }

    /// Drop every stored entity and zero the counters. Rules stay registered.
    pub fn reset(&self) {
        self.store.clear();
        self.reset_stats();
        info!("mapper reset");
    }
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("rules", &self.rule_count())
            .field("entities", &self.store.len())
            .field("sealed", &self.is_sealed())
            .field("config", &self.config)
            .finish()
    }
}
