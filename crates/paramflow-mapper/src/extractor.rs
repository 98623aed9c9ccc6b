//! Entity key extraction.
//!
//! Extractors are compiled from a small expression language over the input
//! path and value:
//!
//! | Expression | Key |
//! |------------|-----|
//! | `value` | the whole value |
//! | `path[N]` | the Nth (zero-based) non-empty path segment, empty if out of range |
//! | `a+b` | operands concatenated without separator |
//! | `a:b` | operands joined with `:` |
//! | anything else | the expression text itself, as a constant |
//!
//! Key segmentation skips empty segments, so `path[1]` of both `A..B` and
//! `.A.B` is `B`. Routing keeps them; see [`crate::path`].
//!
//! Segment lookups go through a [`SegmentCache`] so that a literal path
//! recurring across many values is split once.

use std::sync::Arc;

use moka::sync::Cache;

use crate::path;

/// Bounded memo of path segmentation, keyed by the exact path string.
///
/// Spans are byte ranges into the path, so lookups hand back slices of the
/// caller's own input.
#[derive(Clone)]
pub struct SegmentCache {
    spans: Option<Cache<String, Arc<[(usize, usize)]>>>,
}

impl SegmentCache {
    /// Cache holding at most `capacity` distinct paths; 0 disables caching.
    pub fn new(capacity: u64) -> Self {
        let spans = (capacity > 0).then(|| Cache::new(capacity));
        Self { spans }
    }

    pub fn disabled() -> Self {
        Self { spans: None }
    }

    /// The `index`th segment of `path`.
    pub fn segment<'p>(&self, path: &'p str, index: usize) -> Option<&'p str> {
        let Some(cache) = &self.spans else {
            return key_spans(path).nth(index).map(|(start, end)| &path[start..end]);
        };
        let spans = match cache.get(path) {
            Some(spans) => spans,
            None => {
                let spans: Arc<[(usize, usize)]> = key_spans(path).collect();
                cache.insert(path.to_string(), spans.clone());
                spans
            }
        };
        spans.get(index).map(|&(start, end)| &path[start..end])
    }

    /// Approximate number of cached paths.
    pub fn entry_count(&self) -> u64 {
        self.spans.as_ref().map_or(0, |cache| {
            cache.run_pending_tasks();
            cache.entry_count()
        })
    }
}

/// Byte ranges of the non-empty segments of `path`.
fn key_spans(path: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut start = 0;
    path.split(path::SEPARATOR).filter_map(move |segment| {
        let span = (start, start + segment.len());
        start = span.1 + 1;
        (!segment.is_empty()).then_some(span)
    })
}

impl std::fmt::Debug for SegmentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentCache")
            .field("enabled", &self.spans.is_some())
            .finish()
    }
}

/// Compiled key extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyExtractor {
    /// The whole value string
    Value,
    /// One path segment, optionally prefixed; empty when out of range
    Segment {
        position: usize,
        prefix: Option<String>,
    },
    /// The last `n` segments of the path, or the whole path if it has fewer
    LastSegments(usize),
    /// Sub-extractors joined by `separator`
    Composite {
        parts: Vec<KeyExtractor>,
        separator: String,
    },
    /// A fixed key
    Static(String),
}

impl KeyExtractor {
    /// Compile an extractor expression. Never fails; unrecognized text
    /// becomes a constant key.
    pub fn compile(expr: &str) -> Self {
        if expr == "value" {
            return Self::Value;
        }

        if let Some(position) = expr
            .strip_prefix("path[")
            .and_then(|rest| rest.strip_suffix(']'))
            .and_then(|index| index.parse::<i64>().ok())
        {
            // Negative indices never resolve to a segment.
            let position = usize::try_from(position).unwrap_or(usize::MAX);
            return Self::Segment {
                position,
                prefix: None,
            };
        }

        for separator in ["+", ":"] {
            if expr.contains(separator) {
                let parts = expr
                    .split(separator)
                    .map(|part| Self::compile(part.trim()))
                    .collect();
                return Self::Composite {
                    parts,
                    separator: if separator == "+" {
                        String::new()
                    } else {
                        separator.to_string()
                    },
                };
            }
        }

        Self::Static(expr.to_string())
    }

    /// Segment extractor without prefix.
    pub fn segment(position: usize) -> Self {
        Self::Segment {
            position,
            prefix: None,
        }
    }

    /// Segment extractor with a literal prefix, e.g. `host:` + `path[3]`.
    pub fn prefixed_segment(prefix: impl Into<String>, position: usize) -> Self {
        Self::Segment {
            position,
            prefix: Some(prefix.into()),
        }
    }

    /// True when the key never depends on the path or value.
    pub fn is_constant(&self) -> bool {
        match self {
            Self::Static(_) => true,
            Self::Composite { parts, .. } => parts.iter().all(Self::is_constant),
            _ => false,
        }
    }

    /// Compute the key for one `(path, value)` pair.
    pub fn extract(&self, path: &str, value: &str, cache: &SegmentCache) -> String {
        match self {
            Self::Value => value.to_string(),
            Self::Static(key) => key.clone(),
            _ => {
                let mut key = String::new();
                self.write_key(&mut key, path, value, cache);
                key
            }
        }
    }

    fn write_key(&self, out: &mut String, path: &str, value: &str, cache: &SegmentCache) {
        match self {
            Self::Value => out.push_str(value),
            Self::Static(key) => out.push_str(key),
            Self::Segment { position, prefix } => {
                if let Some(segment) = cache.segment(path, *position) {
                    if let Some(prefix) = prefix {
                        out.push_str(prefix);
                    }
                    out.push_str(segment);
                }
            }
            Self::LastSegments(count) => out.push_str(last_segments(path, *count)),
            Self::Composite { parts, separator } => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push_str(separator);
                    }
                    part.write_key(out, path, value, cache);
                }
            }
        }
    }
}

impl std::fmt::Display for KeyExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value => f.write_str("value"),
            Self::Segment { position, prefix } => {
                write!(f, "{}path[{}]", prefix.as_deref().unwrap_or(""), position)
            }
            Self::LastSegments(count) => write!(f, "last[{}]", count),
            Self::Composite { parts, separator } => {
                let separator = if separator.is_empty() { "+" } else { separator };
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
            Self::Static(key) => f.write_str(key),
        }
    }
}

fn last_segments(path: &str, count: usize) -> &str {
    if count == 0 {
        return path;
    }
    match path.rmatch_indices('.').nth(count - 1) {
        Some((dot, _)) if dot + 1 < path.len() => &path[dot + 1..],
        _ => path,
    }
}

/// The segment immediately following `after` in `path`, or empty.
///
/// `extract_instance("Device.WiFi.Radio.2.Channel", "Radio")` is `"2"`.
pub fn extract_instance<'p>(path: &'p str, after: &str) -> &'p str {
    let Some(idx) = path.find(after) else {
        return "";
    };
    let mut start = idx + after.len();
    if path[start..].starts_with('.') {
        start += 1;
    }
    let rest = &path[start..];
    match rest.find('.') {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// The text between the first `prefix` and the next `suffix`, or empty.
pub fn extract_between<'p>(path: &'p str, prefix: &str, suffix: &str) -> &'p str {
    let Some(idx) = path.find(prefix) else {
        return "";
    };
    let rest = &path[idx + prefix.len()..];
    match rest.find(suffix) {
        Some(end) => &rest[..end],
        None => "",
    }
}
