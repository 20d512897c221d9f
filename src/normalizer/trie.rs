//! Learning trie over path segments.
//!
//! # Responsibilities
//! - Track, per ancestor chain, which literal segments have been seen
//! - Promote a position to a wildcard once enough distinct literals collide
//! - Bound total node count
//!
//! # Design Decisions
//! - A node's children are either literal-keyed or a single wildcard,
//!   never both; the enum makes that structural
//! - Promotion is one-way and starts the wildcard subtree empty
//! - Empty segments are positional but never count toward promotion
//! - Nodes are only ever freed as a side effect of promotion, and freed
//!   iteratively so arbitrarily deep subtrees cannot exhaust the stack

use std::collections::HashMap;

use serde::Serialize;

use super::PARAM_PLACEHOLDER;

#[derive(Debug)]
enum Children {
    Literal(HashMap<String, TrieNode>),
    Wildcard(Box<TrieNode>),
}

/// Dispatch state for one position reached via one ancestor chain.
#[derive(Debug)]
pub struct TrieNode {
    children: Children,
}

impl Default for TrieNode {
    fn default() -> Self {
        Self {
            children: Children::Literal(HashMap::new()),
        }
    }
}

impl Drop for TrieNode {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

/// Live node totals for a trie or subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrieCounts {
    pub nodes: usize,
    pub promoted: usize,
}

/// How a segment position is currently classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// Known literal at this position.
    Literal,
    /// Promoted position; any value maps to the placeholder.
    Param,
    /// Never observed at this position.
    Unseen,
}

#[derive(Debug, Clone, Copy)]
struct TrieLimits {
    threshold: usize,
    max_nodes: Option<usize>,
}

impl TrieLimits {
    fn at_ceiling(&self, nodes: usize) -> bool {
        self.max_nodes.is_some_and(|max| nodes >= max)
    }
}

enum Step<'a> {
    Literal(&'a mut TrieNode),
    Param(&'a mut TrieNode),
    Promoted(&'a mut TrieNode),
    Overflow,
}

enum Action {
    Descend,
    Promote,
}

impl TrieNode {
    /// Advance one segment, learning as needed.
    fn step<'a>(
        &'a mut self,
        segment: &str,
        limits: &TrieLimits,
        counts: &mut TrieCounts,
    ) -> Step<'a> {
        let action = match &self.children {
            Children::Wildcard(_) => Action::Descend,
            Children::Literal(map) if map.contains_key(segment) => Action::Descend,
            Children::Literal(map) => {
                let distinct = map.keys().filter(|k| !k.is_empty()).count()
                    + usize::from(!segment.is_empty());
                if limits.at_ceiling(counts.nodes) {
                    // an empty segment never forces a whole level to collapse
                    if map.is_empty() || segment.is_empty() {
                        return Step::Overflow;
                    }
                    Action::Promote
                } else if !segment.is_empty() && distinct >= limits.threshold {
                    Action::Promote
                } else {
                    Action::Descend
                }
            }
        };

        let promoted_now = matches!(action, Action::Promote);
        if promoted_now {
            self.promote(counts);
        }

        match &mut self.children {
            Children::Wildcard(child) => {
                if promoted_now {
                    Step::Promoted(child.as_mut())
                } else {
                    Step::Param(child.as_mut())
                }
            }
            Children::Literal(map) => {
                let child = map.entry(segment.to_owned()).or_insert_with(|| {
                    counts.nodes += 1;
                    TrieNode::default()
                });
                Step::Literal(child)
            }
        }
    }

    /// Drop all literal children and switch to a fresh wildcard child.
    fn promote(&mut self, counts: &mut TrieCounts) {
        let previous = std::mem::replace(
            &mut self.children,
            Children::Wildcard(Box::default()),
        );
        if let Children::Literal(map) = previous {
            let freed = map
                .values()
                .map(TrieNode::subtree_counts)
                .fold(TrieCounts::default(), |acc, c| TrieCounts {
                    nodes: acc.nodes + c.nodes,
                    promoted: acc.promoted + c.promoted,
                });
            counts.nodes = counts.nodes - freed.nodes + 1;
            counts.promoted = counts.promoted - freed.promoted + 1;
        }
    }

    /// Move every child out into `pending`, leaving this node childless.
    fn detach_children(&mut self, pending: &mut Vec<TrieNode>) {
        match std::mem::replace(&mut self.children, Children::Literal(HashMap::new())) {
            Children::Literal(map) => pending.extend(map.into_values()),
            Children::Wildcard(child) => pending.push(*child),
        }
    }

    fn subtree_counts(&self) -> TrieCounts {
        let mut counts = TrieCounts::default();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            counts.nodes += 1;
            match &node.children {
                Children::Literal(map) => stack.extend(map.values()),
                Children::Wildcard(child) => {
                    counts.promoted += 1;
                    stack.push(child.as_ref());
                }
            }
        }
        counts
    }
}

/// Outcome of a learning walk.
#[derive(Debug)]
pub struct Walk {
    pub template: String,
    pub promotions: usize,
    pub overflowed: bool,
}

/// The learning trie rooted at the position before the first segment.
#[derive(Debug)]
pub struct Trie {
    root: TrieNode,
    limits: TrieLimits,
    counts: TrieCounts,
    overflow_reported: bool,
}

impl Trie {
    /// `threshold` is clamped to at least one; `max_nodes` counts the root.
    pub fn new(threshold: usize, max_nodes: Option<usize>) -> Self {
        Self {
            root: TrieNode::default(),
            limits: TrieLimits {
                threshold: threshold.max(1),
                max_nodes: max_nodes.map(|m| m.max(1)),
            },
            counts: TrieCounts {
                nodes: 1,
                promoted: 0,
            },
            overflow_reported: false,
        }
    }

    pub fn counts(&self) -> TrieCounts {
        self.counts
    }

    pub fn threshold(&self) -> usize {
        self.limits.threshold
    }

    pub fn max_nodes(&self) -> Option<usize> {
        self.limits.max_nodes
    }

    /// Walk `path` (already query-stripped), learning from it, and build
    /// its template.
    pub fn walk(&mut self, path: &str) -> Walk {
        let limits = self.limits;
        let counts = &mut self.counts;
        let mut node = &mut self.root;
        let mut tokens: Vec<&str> = Vec::new();
        let mut promotions = 0;
        let mut overflowed = false;

        let mut segments = path.split('/').enumerate();
        while let Some((depth, segment)) = segments.next() {
            match node.step(segment, &limits, counts) {
                Step::Literal(next) => {
                    tokens.push(segment);
                    node = next;
                }
                Step::Param(next) => {
                    tokens.push(PARAM_PLACEHOLDER);
                    node = next;
                }
                Step::Promoted(next) => {
                    tracing::debug!(depth, segment, "Promoted path position to parameter");
                    promotions += 1;
                    tokens.push(PARAM_PLACEHOLDER);
                    node = next;
                }
                Step::Overflow => {
                    overflowed = true;
                    tokens.push(PARAM_PLACEHOLDER);
                    tokens.extend(segments.by_ref().map(|_| PARAM_PLACEHOLDER));
                    break;
                }
            }
        }

        if overflowed {
            if self.overflow_reported {
                tracing::debug!(path, "Trie node ceiling reached, emitting generic template");
            } else {
                self.overflow_reported = true;
                tracing::warn!(
                    max_nodes = ?self.limits.max_nodes,
                    "Trie node ceiling reached; unseen path shapes now fall back to generic templates"
                );
            }
        }

        Walk {
            template: tokens.join("/"),
            promotions,
            overflowed,
        }
    }

    /// Classify each segment of `path` without learning from it.
    pub fn inspect<'p>(&self, path: &'p str) -> Vec<(&'p str, SegmentKind)> {
        let mut node = Some(&self.root);
        path.split('/')
            .map(|segment| {
                let (kind, next) = match node.map(|n| &n.children) {
                    Some(Children::Wildcard(child)) => (SegmentKind::Param, Some(&**child)),
                    Some(Children::Literal(map)) => match map.get(segment) {
                        Some(child) => (SegmentKind::Literal, Some(child)),
                        None => (SegmentKind::Unseen, None),
                    },
                    None => (SegmentKind::Unseen, None),
                };
                node = next;
                (segment, kind)
            })
            .collect()
    }
}
