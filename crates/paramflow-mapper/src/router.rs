//! Multi-tier path router.
//!
//! Routing tries, in order, returning on the first verified candidate:
//!
//! 1. **Exact**: whole-path lookup for patterns without wildcards
//! 2. **Prefix**: trie walk over literal prefixes, every terminus on the way
//! 3. **Suffix**: lookup by the path's final `.segment`
//! 4. **Fallback**: linear scan over every non-exact pattern
//!
//! Within a tier candidates are verified in registration order (for the trie,
//! shorter prefixes first), so an exact match always pre-empts a wildcard one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::pattern::{Pattern, PatternId};
use crate::trie::Trie;

/// Which routing tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTier {
    Exact,
    Prefix,
    Suffix,
    Fallback,
}

#[derive(Debug, Default)]
struct RouterIndex {
    exact: HashMap<String, Arc<Pattern>>,
    prefixes: Trie,
    suffixes: HashMap<String, Vec<Arc<Pattern>>>,
    fallback: Vec<Arc<Pattern>>,
    registered: usize,
}

/// Path router. Registration takes the write lock; routing only reads.
#[derive(Debug, Default)]
pub struct Router {
    index: RwLock<RouterIndex>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `pattern` and assign its routing identifier.
    pub fn add(&self, mut pattern: Pattern) -> PatternId {
        let mut index = self.index.write();
        let id = PatternId(index.registered);
        index.registered += 1;
        pattern.id = Some(id);
        let pattern = Arc::new(pattern);

        if pattern.is_exact() {
            index.exact.insert(pattern.prefix.clone(), pattern);
            return id;
        }
        if !pattern.prefix.is_empty() {
            index.prefixes.insert(&pattern.prefix, pattern.clone());
        }
        if !pattern.suffix.is_empty() {
            index
                .suffixes
                .entry(pattern.suffix.clone())
                .or_default()
                .push(pattern.clone());
        }
        index.fallback.push(pattern);
        id
    }

    /// Best matching pattern for `path`.
    pub fn route(&self, path: &str) -> Option<Arc<Pattern>> {
        self.route_with_tier(path).map(|(pattern, _)| pattern)
    }

    /// Best matching pattern together with the tier that produced it.
    pub fn route_with_tier(&self, path: &str) -> Option<(Arc<Pattern>, RouteTier)> {
        let index = self.index.read();

        if let Some(pattern) = index.exact.get(path) {
            return Some((pattern.clone(), RouteTier::Exact));
        }

        if let Some(pattern) = index
            .prefixes
            .find_map(path, |p| p.matches(path).then(|| p.clone()))
        {
            return Some((pattern, RouteTier::Prefix));
        }

        if let Some(dot) = path.rfind('.').filter(|dot| *dot > 0) {
            if let Some(candidates) = index.suffixes.get(&path[dot..]) {
                if let Some(pattern) = candidates.iter().find(|p| p.matches(path)) {
                    return Some((pattern.clone(), RouteTier::Suffix));
                }
            }
        }

        if let Some(pattern) = index.fallback.iter().find(|p| p.matches(path)) {
            return Some((pattern.clone(), RouteTier::Fallback));
        }

        trace!(path, "no route");
        None
    }

    /// Number of registered patterns, exact ones included.
    pub fn len(&self) -> usize {
        self.index.read().registered
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(patterns: &[&str]) -> Router {
        let router = Router::new();
        for p in patterns {
            router.add(Pattern::compile(p));
        }
        router
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let router = Router::new();
        assert_eq!(router.add(Pattern::compile("A.*")), PatternId(0));
        assert_eq!(router.add(Pattern::compile("B.C")), PatternId(1));
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_exact_preempts_wildcard() {
        let router = router(&["Device.Hosts.Host.*.HostName", "Device.Hosts.Host.1.HostName"]);
        let (pattern, tier) = router.route_with_tier("Device.Hosts.Host.1.HostName").unwrap();
        assert_eq!(tier, RouteTier::Exact);
        assert_eq!(pattern.text, "Device.Hosts.Host.1.HostName");

        let (pattern, tier) = router.route_with_tier("Device.Hosts.Host.2.HostName").unwrap();
        assert_eq!(tier, RouteTier::Prefix);
        assert_eq!(pattern.id, Some(PatternId(0)));
    }

    #[test]
    fn test_suffix_tier() {
        let router = router(&["*.Hosts.*.MACAddress"]);
        let (pattern, tier) = router.route_with_tier("Device.Hosts.7.MACAddress").unwrap();
        assert_eq!(tier, RouteTier::Suffix);
        assert_eq!(pattern.text, "*.Hosts.*.MACAddress");
        assert!(router.route("Device.Hosts.7.8.MACAddress").is_none());
    }

    #[test]
    fn test_fallback_tier_for_multi_segment_suffix() {
        let router = router(&["*.WiFi.AccessPoint.*.Security.KeyPassphrase"]);
        let (_, tier) = router
            .route_with_tier("Device.WiFi.AccessPoint.2.Security.KeyPassphrase")
            .unwrap();
        assert_eq!(tier, RouteTier::Fallback);
    }

    #[test]
    fn test_fallback_tier_for_bare_wildcards() {
        let router = router(&["*.*"]);
        let (_, tier) = router.route_with_tier("A.B").unwrap();
        assert_eq!(tier, RouteTier::Fallback);
        assert!(router.route("A.B.C").is_none());
    }

    #[test]
    fn test_first_registered_wins_within_tier() {
        let router = router(&["Device.*.Enable", "Device.*.*"]);
        let pattern = router.route("Device.Radio.Enable").unwrap();
        assert_eq!(pattern.text, "Device.*.Enable");
    }

    #[test]
    fn test_no_match() {
        let router = router(&["Device.Hosts.Host.*.IPAddress"]);
        assert!(router.route("NoMatch.Path.Here").is_none());
        assert!(router.route("").is_none());
    }

    #[test]
    fn test_programmatic_pattern_routes_through_fallback() {
        let router = Router::new();
        router.add(Pattern::custom("radio stats").with_contains(".Radio.").with_segment_bounds(4, 5));
        let (_, tier) = router.route_with_tier("Device.WiFi.Radio.1").unwrap();
        assert_eq!(tier, RouteTier::Fallback);
        assert!(router.route("Device.WiFi.Radio").is_none());
    }
}
