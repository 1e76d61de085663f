use crate::item::{ItemDetails, ItemId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

// Lazily populated id -> detail store. Entries are created on first fetch,
// overwritten by rename/tag push events, and only ever evicted wholesale
// when the result list is replaced. Repeated lookups of the same uncached id
// coalesce into one outstanding fetch.
#[derive(Debug, Default)]
pub struct DetailCache {
    entries: HashMap<ItemId, ItemDetails>,
    pending: HashSet<ItemId>,
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, id: ItemId) -> Option<&ItemDetails> {
        self.entries.get(&id)
    }

    // True exactly once per outstanding miss: the caller that sees true owns
    // issuing the fetch, everyone else renders a loading state.
    pub fn begin_fetch(&mut self, id: ItemId) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.pending.insert(id)
    }

    pub fn is_pending(&self, id: ItemId) -> bool {
        self.pending.contains(&id)
    }

    pub fn insert(&mut self, id: ItemId, details: ItemDetails) {
        self.pending.remove(&id);
        self.entries.insert(id, details);
    }

    // A failed fetch releases the pending slot so a later lookup can retry.
    pub fn fetch_failed(&mut self, id: ItemId) {
        self.pending.remove(&id);
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() || !self.pending.is_empty() {
            debug!(
                entries = self.entries.len(),
                pending = self.pending.len(),
                "clearing detail cache"
            );
        }
        self.entries.clear();
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn details(name: &str) -> ItemDetails {
        ItemDetails::new(PathBuf::from(name), BTreeSet::new())
    }

    #[test]
    fn begin_fetch_coalesces_concurrent_misses() {
        let mut cache = DetailCache::new();
        assert!(cache.begin_fetch(ItemId(1)));
        // Second miss for the same id while the fetch is outstanding.
        assert!(!cache.begin_fetch(ItemId(1)));
        assert!(cache.begin_fetch(ItemId(2)));
    }

    #[test]
    fn insert_resolves_pending_and_serves_lookups() {
        let mut cache = DetailCache::new();
        assert!(cache.begin_fetch(ItemId(1)));
        cache.insert(ItemId(1), details("a.txt"));
        assert_eq!(cache.lookup(ItemId(1)), Some(&details("a.txt")));
        // Cached now, so no new fetch starts.
        assert!(!cache.begin_fetch(ItemId(1)));
    }

    #[test]
    fn insert_overwrites_unconditionally() {
        let mut cache = DetailCache::new();
        cache.insert(ItemId(1), details("old.txt"));
        cache.insert(ItemId(1), details("new.txt"));
        assert_eq!(cache.lookup(ItemId(1)), Some(&details("new.txt")));
    }

    #[test]
    fn clear_while_fetch_outstanding_drops_pending_marker() {
        // A response that arrives after a structural clear must be
        // recognizable as stale.
        let mut cache = DetailCache::new();
        assert!(cache.begin_fetch(ItemId(1)));
        assert!(cache.is_pending(ItemId(1)));
        cache.clear();
        assert!(!cache.is_pending(ItemId(1)));
    }

    #[test]
    fn failed_fetch_allows_retry() {
        let mut cache = DetailCache::new();
        assert!(cache.begin_fetch(ItemId(1)));
        cache.fetch_failed(ItemId(1));
        assert!(cache.begin_fetch(ItemId(1)));
    }

    #[test]
    fn clear_drops_entries_and_pending_state() {
        let mut cache = DetailCache::new();
        cache.insert(ItemId(1), details("a.txt"));
        assert!(cache.begin_fetch(ItemId(2)));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.lookup(ItemId(1)), None);
        // Pending state is gone too; both ids fetch afresh.
        assert!(cache.begin_fetch(ItemId(1)));
        assert!(cache.begin_fetch(ItemId(2)));
    }
}
