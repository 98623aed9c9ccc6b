//! Dot-delimited path segmentation for routing.
//!
//! A single trailing separator is ignored (`A.B.` has two segments) and the
//! empty path has none. Other empty segments count, so `A..B` has three.
//! Segments are borrowed from the input.

/// Segment separator.
pub const SEPARATOR: char = '.';

/// Iterate the segments of `path` without allocating.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.strip_suffix(SEPARATOR).unwrap_or(path);
    let empty = trimmed.is_empty();
    trimmed.split(SEPARATOR).filter(move |_| !empty)
}

/// Number of segments in `path`.
pub fn segment_count(path: &str) -> usize {
    let trimmed = path.strip_suffix(SEPARATOR).unwrap_or(path);
    if trimmed.is_empty() {
        0
    } else {
        trimmed.bytes().filter(|b| *b == b'.').count() + 1
    }
}
