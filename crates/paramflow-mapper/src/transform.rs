//! Named value transforms with per-transform result memoization.
//!
//! Each registered transform owns its cache, so lookups key on the raw value
//! only. Caches are unbounded: the expected input is a stream where a small
//! set of literal values (`"true"`, `"Up"`, `"0"`) recurs across thousands of
//! entities. Only successful results are cached.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use paramflow_core::coerce::parse_bool_literal;
use paramflow_core::FieldValue;

use crate::error::{MapperError, TransformError};

/// Transform function signature.
pub type TransformFn =
    Arc<dyn Fn(&str) -> std::result::Result<FieldValue, TransformError> + Send + Sync>;

/// Separator for chained transform names, e.g. `trim|int`.
pub const CHAIN_SEPARATOR: char = '|';

struct TransformEntry {
    func: TransformFn,
    cache: DashMap<String, FieldValue>,
}

fn insert_entry(entries: &mut HashMap<String, Arc<TransformEntry>>, name: &str, func: TransformFn) {
    entries.insert(
        name.to_string(),
        Arc::new(TransformEntry {
            func,
            cache: DashMap::new(),
        }),
    );
}

/// Transform cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Registry of named transforms, owned by a mapper.
pub struct TransformRegistry {
    entries: RwLock<HashMap<String, Arc<TransformEntry>>>,
    sealed: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TransformRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sealed: AtomicBool::new(false),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Registry seeded with the builtin transforms.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for (name, func) in builtins() {
            registry.insert(name, func);
        }
        registry
    }

    /// Register or replace a transform.
    pub fn register<F>(&self, name: &str, func: F) -> Result<(), MapperError>
    where
        F: Fn(&str) -> std::result::Result<FieldValue, TransformError> + Send + Sync + 'static,
    {
        let func = transform(func);
        // Checked under the entries lock so registration is ordered against seal().
        let mut entries = self.entries.write();
        if self.is_sealed() {
            return Err(MapperError::Sealed(format!("transform {}", name)));
        }
        insert_entry(&mut entries, name, func);
        drop(entries);
        debug!(transform = name, "Registered transform");
        Ok(())
    }

    fn insert(&self, name: &str, func: TransformFn) {
        insert_entry(&mut self.entries.write(), name, func);
    }

    /// True when `name` resolves; for chains, when every link does.
    pub fn contains(&self, name: &str) -> bool {
        let entries = self.entries.read();
        name.split(CHAIN_SEPARATOR)
            .all(|part| entries.contains_key(part.trim()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn entry(&self, name: &str) -> Option<Arc<TransformEntry>> {
        self.entries.read().get(name).cloned()
    }

    /// Apply `name` to `value` without touching the cache. Unknown names pass
    /// the value through as a string.
    pub fn apply(&self, name: &str, value: &str) -> std::result::Result<FieldValue, TransformError> {
        match self.entry(name) {
            Some(entry) => (entry.func)(value),
            None => Ok(FieldValue::String(value.to_string())),
        }
    }

    /// Apply a transform or chain, consulting and filling the result cache.
    pub fn apply_cached(
        &self,
        name: &str,
        value: &str,
    ) -> std::result::Result<FieldValue, TransformError> {
        if name.contains(CHAIN_SEPARATOR) {
            return self.apply_chain(name, value);
        }
        self.apply_one_cached(name, value)
    }

    fn apply_one_cached(
        &self,
        name: &str,
        value: &str,
    ) -> std::result::Result<FieldValue, TransformError> {
        let Some(entry) = self.entry(name) else {
            return Ok(FieldValue::String(value.to_string()));
        };
        if let Some(cached) = entry.cache.get(value) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.value().clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = (entry.func)(value)?;
        entry.cache.insert(value.to_string(), result.clone());
        Ok(result)
    }

    /// Links run left to right; intermediate results are rendered back to
    /// text and unknown links are skipped.
    fn apply_chain(&self, chain: &str, value: &str) -> std::result::Result<FieldValue, TransformError> {
        let mut current = FieldValue::String(value.to_string());
        for link in chain.split(CHAIN_SEPARATOR).map(str::trim) {
            if link.is_empty() || self.entry(link).is_none() {
                continue;
            }
            current = self.apply_one_cached(link, &current.to_string())?;
        }
        Ok(current)
    }

    /// Forbid further registration. Registrations already holding the
    /// entries lock complete first.
    pub fn seal(&self) {
        let _entries = self.entries.write();
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn reset_cache_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Drop every memoized result and zero the cache counters.
    pub fn clear_cache(&self) {
        for entry in self.entries.read().values() {
            entry.cache.clear();
        }
        self.reset_cache_stats();
    }

    /// Total memoized results across transforms.
    pub fn cached_len(&self) -> usize {
        self.entries.read().values().map(|e| e.cache.len()).sum()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.names())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

fn transform<F>(func: F) -> TransformFn
where
    F: Fn(&str) -> std::result::Result<FieldValue, TransformError> + Send + Sync + 'static,
{
    Arc::new(func)
}

fn builtins() -> Vec<(&'static str, TransformFn)> {
    vec![
        ("mac_normalize", transform(|v| Ok(FieldValue::String(mac_normalize(v))))),
        ("ip_validate", transform(|v| Ok(FieldValue::String(v.trim().to_string())))),
        ("ip_strict", transform(ip_strict)),
        ("bool", transform(|v| parse_bool(v).map(FieldValue::Bool))),
        ("int", transform(|v| parse_int(v).map(FieldValue::Int))),
        ("float", transform(|v| parse_float(v).map(FieldValue::Float))),
        ("lower", transform(|v| Ok(FieldValue::String(v.to_lowercase())))),
        ("upper", transform(|v| Ok(FieldValue::String(v.to_uppercase())))),
        ("trim", transform(|v| Ok(FieldValue::String(v.trim().to_string())))),
        (
            "percent_strip",
            transform(|v| {
                let trimmed = v.trim();
                let stripped = trimmed.strip_suffix('%').unwrap_or(trimmed);
                Ok(FieldValue::String(stripped.trim_end().to_string()))
            }),
        ),
    ]
}

/// Lowercase colon-separated MAC, or `raw` unchanged when it is not 12 hex
/// digits once separators are removed.
pub fn mac_normalize(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return raw.to_string();
    }
    let mut out = String::with_capacity(17);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 2 == 0 {
            out.push(':');
        }
        out.push(c);
    }
    out
}

fn ip_strict(raw: &str) -> std::result::Result<FieldValue, TransformError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<IpAddr>()
        .map(|_| FieldValue::String(trimmed.to_string()))
        .map_err(|_| TransformError::InvalidAddress(raw.to_string()))
}

/// Boolean with the common device spellings (`yes`, `on`, `enabled`, ...).
pub fn parse_bool(raw: &str) -> std::result::Result<bool, TransformError> {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => return Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => return Ok(false),
        _ => {}
    }
    parse_bool_literal(trimmed).ok_or_else(|| TransformError::InvalidBool(raw.to_string()))
}

/// Base-10 integer; thousands separators are dropped and a fractional value
/// is truncated. Blank input is 0.
pub fn parse_int(raw: &str) -> std::result::Result<i64, TransformError> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return Ok(0);
    }
    if cleaned.contains('.') {
        return match cleaned.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(f.trunc() as i64),
            _ => Err(TransformError::InvalidInteger(raw.to_string())),
        };
    }
    cleaned
        .parse::<i64>()
        .map_err(|_| TransformError::InvalidInteger(raw.to_string()))
}

/// Float with thousands separators and a trailing `%` dropped. Blank input
/// is 0.
pub fn parse_float(raw: &str) -> std::result::Result<f64, TransformError> {
    let trimmed = raw.trim();
    let cleaned = trimmed
        .strip_suffix('%')
        .unwrap_or(trimmed)
        .trim_end()
        .replace(',', "");
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    cleaned
        .parse::<f64>()
        .map_err(|_| TransformError::InvalidFloat(raw.to_string()))
}
