//! Adaptive path-template normalizer.
//!
//! # Data Flow
//! ```text
//! raw path (+ query)
//!     → strip query / fragment
//!     → cache.rs (hit: return stored template)
//!     → trie.rs (miss: walk + learn, maybe promote)
//!     → cache.rs (remember template)
//!     → template, e.g. /api/resource/:param
//! ```
//!
//! # Design Decisions
//! - One instance is shared by all request handlers via `Arc`; learning
//!   only converges if traffic aggregates in one place
//! - No global: each test or deployment unit builds its own instance
//! - One `Mutex` covers trie and cache for a whole call, so the
//!   count → promote → descend sequence is atomic
//! - Cached templates are not invalidated by later promotions; they age
//!   out through LRU eviction

pub mod cache;
pub mod trie;

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::config::NormalizerConfig;
use crate::observability::metrics;

use self::cache::TemplateCache;
use self::trie::{SegmentKind, Trie};

/// Token substituted for promoted path positions.
pub const PARAM_PLACEHOLDER: &str = ":param";

struct State {
    trie: Trie,
    cache: TemplateCache,
}

/// Learns route shapes from traffic and rewrites paths into templates.
pub struct PathNormalizer {
    state: Mutex<State>,
}

/// Point-in-time view of normalizer occupancy.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NormalizerStats {
    pub cache_entries: usize,
    pub cache_capacity: usize,
    pub trie_nodes: usize,
    pub promoted_nodes: usize,
    pub max_trie_nodes: Option<usize>,
    pub promotion_threshold: usize,
}

/// Classification of a single segment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SegmentShape {
    pub segment: String,
    pub kind: SegmentKind,
}

/// Read-only view of how the trie currently sees a path.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PathShape {
    pub path: String,
    /// Template for the known portion; unseen segments are shown verbatim.
    pub template: String,
    pub cached: Option<String>,
    pub segments: Vec<SegmentShape>,
}

impl PathNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            state: Mutex::new(State {
                trie: Trie::new(config.promotion_threshold, config.max_trie_nodes),
                cache: TemplateCache::new(config.max_cache_size),
            }),
        }
    }

    /// Rewrite `raw` into its route template, learning from it.
    ///
    /// Never fails. Anything after the first `?` or `#` is ignored.
    pub fn normalize(&self, raw: &str) -> String {
        let path = strip_query(raw);
        let mut state = self.lock();

        if let Some(template) = state.cache.get(path) {
            metrics::record_template_cache_hit();
            return template.to_string();
        }
        metrics::record_template_cache_miss();

        let walk = state.trie.walk(path);
        if walk.promotions > 0 {
            metrics::record_promotions(walk.promotions);
        }

        if let Some(evicted) = state.cache.insert(path.to_string(), walk.template.clone()) {
            tracing::trace!(evicted = %evicted, "Evicted template cache entry");
        }
        metrics::record_normalizer_size(state.cache.len(), state.trie.counts().nodes);

        walk.template
    }

    /// Show how `raw` would be classified, without learning or caching.
    pub fn inspect(&self, raw: &str) -> PathShape {
        let path = strip_query(raw);
        let state = self.lock();

        let segments: Vec<SegmentShape> = state
            .trie
            .inspect(path)
            .into_iter()
            .map(|(segment, kind)| SegmentShape {
                segment: segment.to_string(),
                kind,
            })
            .collect();
        let template = segments
            .iter()
            .map(|s| match s.kind {
                SegmentKind::Param => PARAM_PLACEHOLDER,
                SegmentKind::Literal | SegmentKind::Unseen => s.segment.as_str(),
            })
            .collect::<Vec<_>>()
            .join("/");

        PathShape {
            path: path.to_string(),
            template,
            cached: state.cache.peek(path).map(str::to_string),
            segments,
        }
    }

    pub fn stats(&self) -> NormalizerStats {
        let state = self.lock();
        let counts = state.trie.counts();
        NormalizerStats {
            cache_entries: state.cache.len(),
            cache_capacity: state.cache.capacity(),
            trie_nodes: counts.nodes,
            promoted_nodes: counts.promoted,
            max_trie_nodes: state.trie.max_nodes(),
            promotion_threshold: state.trie.threshold(),
        }
    }

    // Every mutation leaves trie and cache structurally valid, so a
    // panic elsewhere while holding the lock is not a reason to stop.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

impl std::fmt::Debug for PathNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathNormalizer")
            .field("stats", &self.stats())
            .finish()
    }
}

fn strip_query(raw: &str) -> &str {
    match raw.find(|c| c == '?' || c == '#') {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer_with_cache(max_cache_size: usize) -> PathNormalizer {
        PathNormalizer::new(&NormalizerConfig {
            max_cache_size,
            ..NormalizerConfig::default()
        })
    }

    #[test]
    fn test_resource_ids_collapse() {
        let n = PathNormalizer::default();
        assert_eq!(n.normalize("/api/resource/123"), "/api/resource/123");
        assert_eq!(n.normalize("/api/resource/567"), "/api/resource/:param");
        assert_eq!(n.normalize("/api/resource/789"), "/api/resource/:param");
    }

    #[test]
    fn test_nested_versions_and_ids() {
        let n = PathNormalizer::default();
        assert_eq!(n.normalize("/api/v1/users/123"), "/api/v1/users/123");
        assert_eq!(n.normalize("/api/v1/users/567"), "/api/v1/users/:param");
        assert_eq!(n.normalize("/api/v2/users/789"), "/api/:param/users/789");
        assert_eq!(n.normalize("/api/v2/users/101"), "/api/:param/users/:param");
    }

    #[test]
    fn test_cache_bounded() {
        let n = normalizer_with_cache(3);
        n.normalize("/alpha");
        n.normalize("/alpha/beta");
        n.normalize("/alpha/beta/gamma");
        assert_eq!(n.stats().cache_entries, 3);

        n.normalize("/alpha/beta/gamma/delta");
        assert!(n.stats().cache_entries <= 3);
        assert_eq!(n.stats().cache_capacity, 3);
    }

    #[test]
    fn test_query_string_stripped() {
        let n = PathNormalizer::default();
        assert_eq!(n.normalize("/api/users?page=1&limit=10"), "/api/users");
        assert_eq!(n.inspect("/api/users").cached.as_deref(), Some("/api/users"));
        // cached under the path-only key, so a different query is a hit
        assert_eq!(n.normalize("/api/users?page=2"), "/api/users");
        assert_eq!(n.stats().cache_entries, 1);
    }

    #[test]
    fn test_fragment_stripped() {
        let n = PathNormalizer::default();
        assert_eq!(n.normalize("/docs/intro#install"), "/docs/intro");
        assert_eq!(n.normalize("/docs/intro#x?y=1"), "/docs/intro");
    }

    #[test]
    fn test_root_and_health_stay_literal() {
        let n = PathNormalizer::default();
        assert_eq!(n.normalize("/"), "/");
        assert_eq!(n.normalize("/health"), "/health");
        assert_eq!(n.normalize("/"), "/");
        assert_eq!(n.normalize("/health"), "/health");
    }

    #[test]
    fn test_degenerate_inputs_never_fail() {
        let deep = "/x".repeat(500);
        let cases = [
            ("", ""),
            ("?only=query", ""),
            ("//", "//"),
            ("/a//b/", "/a//b/"),
            ("/ünïcödé/パス", "/ünïcödé/パス"),
            (deep.as_str(), deep.as_str()),
        ];
        for (input, expected) in cases {
            let n = PathNormalizer::default();
            assert_eq!(n.normalize(input), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_promotion_is_monotonic() {
        let n = PathNormalizer::default();
        n.normalize("/orders/1");
        n.normalize("/orders/2");

        for i in 0..50 {
            let shape = n.inspect(&format!("/orders/{}", i));
            assert_eq!(shape.segments[2].kind, SegmentKind::Param);
        }
        // a previously seen literal is also generalized now (uncached path)
        assert_eq!(n.normalize("/orders/1/"), "/orders/:param/");
    }

    #[test]
    fn test_stale_cache_entry_survives_promotion() {
        let n = PathNormalizer::default();
        assert_eq!(n.normalize("/a/b/1"), "/a/b/1");
        assert_eq!(n.normalize("/a/c/1"), "/a/:param/1");

        // "/a/b/1" was cached before the "/a" position was promoted
        assert_eq!(n.normalize("/a/b/1"), "/a/b/1");
        assert_eq!(n.inspect("/a/b/1").template, "/a/:param/1");
    }

    #[test]
    fn test_steady_state_idempotent() {
        let n = normalizer_with_cache(1);
        n.normalize("/shop/items/1");
        n.normalize("/shop/items/2");

        // cache of one forces re-walks; the template must not drift
        for _ in 0..10 {
            assert_eq!(n.normalize("/shop/items/77"), "/shop/items/:param");
            assert_eq!(n.normalize("/shop/items/88"), "/shop/items/:param");
        }
    }

    #[test]
    fn test_inspect_reports_without_learning() {
        let n = PathNormalizer::default();
        let before = n.stats();
        let shape = n.inspect("/never/seen?q=1");

        assert_eq!(shape.path, "/never/seen");
        assert_eq!(shape.template, "/never/seen");
        assert!(shape.cached.is_none());
        assert!(shape.segments.iter().all(|s| s.kind == SegmentKind::Unseen));
        assert_eq!(n.stats(), before);
    }

    #[test]
    fn test_node_ceiling_holds() {
        let n = PathNormalizer::new(&NormalizerConfig {
            max_trie_nodes: Some(64),
            promotion_threshold: 1_000,
            ..NormalizerConfig::default()
        });
        for i in 0..500 {
            n.normalize(&format!("/t{}/u{}/v{}", i, i, i));
            assert!(n.stats().trie_nodes <= 64);
        }
    }
}
