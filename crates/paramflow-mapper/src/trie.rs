//! Byte-indexed prefix trie over literal pattern prefixes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::pattern::Pattern;

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<u8, TrieNode>,
    /// Patterns whose literal prefix ends at this node, in registration order
    patterns: Vec<Arc<Pattern>>,
}

impl TrieNode {
    fn is_terminus(&self) -> bool {
        !self.patterns.is_empty()
    }
}

/// Prefix trie. Not synchronized; the router guards it.
#[derive(Debug, Default)]
pub struct Trie {
    root: TrieNode,
    len: usize,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `pattern` at the node reached by consuming `prefix`.
    pub fn insert(&mut self, prefix: &str, pattern: Arc<Pattern>) {
        let mut node = &mut self.root;
        for byte in prefix.bytes() {
            node = node.children.entry(byte).or_default();
        }
        node.patterns.push(pattern);
        self.len += 1;
    }

    /// Walk `path` byte by byte and hand every pattern stored at a terminus on
    /// the way (shorter prefixes first) to `f`, stopping at the first `Some`.
    pub fn find_map<R>(&self, path: &str, mut f: impl FnMut(&Arc<Pattern>) -> Option<R>) -> Option<R> {
        let mut node = &self.root;
        for byte in path.bytes() {
            if node.is_terminus() {
                if let Some(found) = node.patterns.iter().find_map(&mut f) {
                    return Some(found);
                }
            }
            match node.children.get(&byte) {
                Some(child) => node = child,
                None => return None,
            }
        }
        if node.is_terminus() {
            return node.patterns.iter().find_map(&mut f);
        }
        None
    }

    /// Number of stored patterns.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
