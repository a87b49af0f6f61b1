//! # Cart Store
//!
//! Ordered, key-unique collection of entries. Iteration order is insertion
//! order. The store has no business rules: merging, quantity policy and
//! persistence belong to [`CartOperations`](crate::operations::CartOperations).
//!
//! Entries are held behind an `Arc<[CartEntry]>`. Every mutation builds a
//! fresh slice and swaps it in, so a reader holding a previous
//! [`entries`](CartStore::get_all) handle keeps a complete, unchanging view.

use crate::entry::CartEntry;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CartStore {
    entries: Arc<[CartEntry]>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::from(Vec::new()),
        }
    }

    /// Build a store from `entries`, see [`replace_all`](Self::replace_all)
    pub fn from_entries(entries: Vec<CartEntry>) -> Self {
        let mut store = Self::new();
        store.replace_all(entries);
        store
    }

    /// Shared handle to the current entries
    pub fn get_all(&self) -> Arc<[CartEntry]> {
        Arc::clone(&self.entries)
    }

    pub fn find_by_key(&self, key: &str) -> Option<&CartEntry> {
        self.entries.iter().find(|e| e.key() == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the contents. A duplicate key overwrites the earlier entry
    /// in place, keeping the position of its first occurrence.
    pub fn replace_all(&mut self, entries: Vec<CartEntry>) {
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(entries.len());
        let mut deduped: Vec<CartEntry> = Vec::with_capacity(entries.len());

        for entry in entries {
            if let Some(&idx) = positions.get(entry.key()) {
                deduped[idx] = entry;
                continue;
            }
            positions.insert(entry.key().to_string(), deduped.len());
            deduped.push(entry);
        }

        self.entries = Arc::from(deduped);
    }

    /// Insert, or overwrite the entry with the same key in place
    pub fn upsert(&mut self, entry: CartEntry) {
        let mut next = self.entries.to_vec();
        match next.iter().position(|e| e.key() == entry.key()) {
            Some(idx) => next[idx] = entry,
            None => next.push(entry),
        }
        self.entries = Arc::from(next);
    }

    /// Remove by key. Returns the removed entry, if any.
    pub fn remove(&mut self, key: &str) -> Option<CartEntry> {
        let idx = self.entries.iter().position(|e| e.key() == key)?;
        let mut next = self.entries.to_vec();
        let removed = next.remove(idx);
        self.entries = Arc::from(next);
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.entries = Arc::from(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{ItemNormalizer, RawProduct};
    use crate::price::Currency;

    fn entry(id: &str, quantity: u32) -> CartEntry {
        ItemNormalizer::new(Currency::USD)
            .normalize(&RawProduct::new(id, format!("Product {id}"), 1.0).into())
            .unwrap()
            .with_quantity(quantity)
    }

    fn keys(store: &CartStore) -> Vec<String> {
        store.get_all().iter().map(|e| e.key().to_string()).collect()
    }

    #[test]
    fn test_insertion_order() {
        let mut store = CartStore::new();
        store.upsert(entry("b", 1));
        store.upsert(entry("a", 1));
        store.upsert(entry("c", 1));

        assert_eq!(keys(&store), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let mut store = CartStore::new();
        store.upsert(entry("a", 1));
        store.upsert(entry("b", 1));
        store.upsert(entry("a", 7));

        assert_eq!(keys(&store), vec!["a", "b"]);
        assert_eq!(store.find_by_key("a").unwrap().quantity(), 7);
    }

    #[test]
    fn test_replace_all_dedupes() {
        let store = CartStore::from_entries(vec![entry("a", 1), entry("b", 2), entry("a", 3)]);

        assert_eq!(store.len(), 2);
        assert_eq!(keys(&store), vec!["a", "b"]);
        assert_eq!(store.find_by_key("a").unwrap().quantity(), 3);
    }

    #[test]
    fn test_remove() {
        let mut store = CartStore::from_entries(vec![entry("a", 1), entry("b", 1)]);

        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert_eq!(keys(&store), vec!["b"]);
    }

    #[test]
    fn test_old_handles_are_unaffected() {
        let mut store = CartStore::from_entries(vec![entry("a", 1)]);
        let before = store.get_all();

        store.upsert(entry("a", 9));
        store.clear();

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].quantity(), 1);
        assert!(store.is_empty());
    }
}
