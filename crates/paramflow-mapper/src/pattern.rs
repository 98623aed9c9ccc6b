//! Pattern compiler.
//!
//! A pattern is a dotted path where a segment equal to `*` matches exactly one
//! segment. Compilation records the literal text before the first wildcard
//! (prefix) and after the last one (suffix), which the router indexes, plus the
//! full fixed-arity segment list used for verification.

use std::fmt;

use crate::path;

/// Wildcard segment marker.
pub const WILDCARD: &str = "*";

/// Routing identifier assigned when a pattern is added to a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(pub(crate) usize);

impl PatternId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One segment of a wildcard pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Wildcard,
}

/// Compiled, matchable form of a dotted path template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    /// Assigned by the router on registration
    pub id: Option<PatternId>,
    /// Original pattern text
    pub text: String,
    /// Literal text before the first wildcard, separator included
    pub prefix: String,
    /// Literal text after the last wildcard, leading separator included
    pub suffix: String,
    /// Substrings the path must contain (programmatic patterns only)
    pub contains: Vec<String>,
    /// Fixed-arity segment list; empty for exact patterns
    pub segments: Vec<Segment>,
    /// Inclusive segment-count bounds
    pub segment_bounds: Option<(usize, usize)>,
    /// Positions of wildcard segments
    pub wildcard_positions: Vec<usize>,
    /// Entity type bound by the owning rule
    pub entity: String,
    /// Field bound by the owning rule
    pub field: String,
}

impl Pattern {
    /// Compile a dotted wildcard path. Every input is accepted.
    pub fn compile(text: &str) -> Self {
        let parts: Vec<&str> = text.split(path::SEPARATOR).collect();
        let wildcard_positions: Vec<usize> = parts
            .iter()
            .enumerate()
            .filter(|(_, part)| **part == WILDCARD)
            .map(|(i, _)| i)
            .collect();

        let (Some(&first), Some(&last)) = (wildcard_positions.first(), wildcard_positions.last())
        else {
            return Self {
                text: text.to_string(),
                prefix: text.to_string(),
                ..Self::default()
            };
        };

        let prefix = if first > 0 {
            let mut prefix = parts[..first].join(".");
            prefix.push(path::SEPARATOR);
            prefix
        } else {
            String::new()
        };

        let suffix = if last + 1 < parts.len() {
            format!(".{}", parts[last + 1..].join("."))
        } else {
            String::new()
        };

        let segments = parts
            .iter()
            .map(|part| {
                if *part == WILDCARD {
                    Segment::Wildcard
                } else {
                    Segment::Literal(part.to_string())
                }
            })
            .collect();

        Self {
            id: None,
            text: text.to_string(),
            prefix,
            suffix,
            contains: Vec::new(),
            segments,
            segment_bounds: Some((parts.len(), parts.len())),
            wildcard_positions,
            entity: String::new(),
            field: String::new(),
        }
    }

    /// Start a programmatic pattern with only a label; add constraints with `with_*`.
    pub fn custom(label: impl Into<String>) -> Self {
        Self {
            text: label.into(),
            ..Self::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_contains(mut self, substring: impl Into<String>) -> Self {
        self.contains.push(substring.into());
        self
    }

    pub fn with_segment_bounds(mut self, min: usize, max: usize) -> Self {
        self.segment_bounds = Some((min, max));
        self
    }

    /// True when the pattern carries at least one wildcard segment.
    pub fn has_wildcard(&self) -> bool {
        !self.wildcard_positions.is_empty()
    }

    /// Exact patterns are routed by whole-path lookup only.
    pub fn is_exact(&self) -> bool {
        !self.has_wildcard()
            && self.segments.is_empty()
            && self.suffix.is_empty()
            && self.contains.is_empty()
            && self.segment_bounds.is_none()
    }

    /// Full match predicate.
    pub fn matches(&self, path: &str) -> bool {
        if self.is_exact() {
            return path == self.prefix;
        }
        if !self.prefix.is_empty() && !path.starts_with(self.prefix.as_str()) {
            return false;
        }
        if !self.suffix.is_empty() && !path.ends_with(self.suffix.as_str()) {
            return false;
        }
        if !self
            .contains
            .iter()
            .all(|needle| path.contains(needle.as_str()))
        {
            return false;
        }
        if !self.segments.is_empty() {
            return self.matches_segments(path);
        }
        if let Some((min, max)) = self.segment_bounds {
            let count = path::segment_count(path);
            return count >= min && count <= max;
        }
        true
    }

    fn matches_segments(&self, path: &str) -> bool {
        let mut actual = path::segments(path);
        for expected in &self.segments {
            match (expected, actual.next()) {
                (_, None) => return false,
                (Segment::Literal(literal), Some(segment)) if literal != segment => return false,
                _ => {}
            }
        }
        actual.next().is_none()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
