//! Bounded path → template cache.
//!
//! # Responsibilities
//! - O(1) lookup of previously normalized raw paths
//! - Hard bound on the number of remembered paths
//! - Least-recently-used eviction once full
//!
//! # Design Decisions
//! - Recency list is intrusive and index-based: entries live in a slab
//!   (`Vec<Entry>`) and link to each other by slot index, so no `unsafe`
//!   and no per-access allocation
//! - A full cache recycles the tail slot in place instead of freeing it
//! - Not synchronized; the owning normalizer holds the lock

use std::collections::HashMap;

#[derive(Debug)]
struct Entry {
    path: String,
    template: String,
    prev: Option<usize>,
    next: Option<usize>,
}

/// LRU cache from query-stripped path to its template.
#[derive(Debug)]
pub struct TemplateCache {
    capacity: usize,
    index: HashMap<String, usize>,
    slots: Vec<Entry>,
    /// Most recently used.
    head: Option<usize>,
    /// Least recently used; next to be evicted.
    tail: Option<usize>,
}

impl TemplateCache {
    /// Create an empty cache. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            index: HashMap::new(),
            slots: Vec::new(),
            head: None,
            tail: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Look up a path and mark it as most recently used.
    pub fn get(&mut self, path: &str) -> Option<&str> {
        let slot = *self.index.get(path)?;
        self.touch(slot);
        Some(self.slots[slot].template.as_str())
    }

    /// Look up a path without refreshing its recency.
    pub fn peek(&self, path: &str) -> Option<&str> {
        self.index
            .get(path)
            .map(|&slot| self.slots[slot].template.as_str())
    }

    /// Insert or overwrite a mapping.
    ///
    /// When a new path arrives at capacity, exactly one entry (the least
    /// recently used) is evicted and its path returned.
    pub fn insert(&mut self, path: String, template: String) -> Option<String> {
        if let Some(&slot) = self.index.get(&path) {
            self.slots[slot].template = template;
            self.touch(slot);
            return None;
        }

        if self.slots.len() < self.capacity {
            let slot = self.slots.len();
            self.slots.push(Entry {
                path: path.clone(),
                template,
                prev: None,
                next: None,
            });
            self.index.insert(path, slot);
            self.push_front(slot);
            return None;
        }

        // Full: recycle the LRU slot.
        let slot = self.tail?;
        self.unlink(slot);
        let entry = &mut self.slots[slot];
        let evicted = std::mem::replace(&mut entry.path, path.clone());
        entry.template = template;
        self.index.remove(&evicted);
        self.index.insert(path, slot);
        self.push_front(slot);
        Some(evicted)
    }

    fn touch(&mut self, slot: usize) {
        if self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.push_front(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let entry = &self.slots[slot];
            (entry.prev, entry.next)
        };
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        let entry = &mut self.slots[slot];
        entry.prev = None;
        entry.next = None;
    }

    fn push_front(&mut self, slot: usize) {
        self.slots[slot].next = self.head;
        self.slots[slot].prev = None;
        if let Some(h) = self.head {
            self.slots[h].prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }
}
