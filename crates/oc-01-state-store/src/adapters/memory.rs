//! In-memory implementation of the store, used in tests and as the
//! reference for the external KV contract.

use crate::ports::{CacheView, KvRead, KvStore};
use parking_lot::RwLock;
use shared_types::OracleResult;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ordered in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Full sorted dump of the store. Feeding this back through
    /// [`InMemoryStore::import`] reproduces the exact same dump.
    pub fn export_sorted(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Replace the store content with an exported dump.
    pub fn import(&self, pairs: Vec<(Vec<u8>, Vec<u8>)>) {
        let mut entries = self.entries.write();
        entries.clear();
        entries.extend(pairs);
    }
}

impl KvRead for InMemoryStore {
    fn get(&self, key: &[u8]) -> OracleResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn has(&self, key: &[u8]) -> OracleResult<bool> {
        Ok(self.entries.read().contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> OracleResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl KvStore for InMemoryStore {
    fn set(&self, key: Vec<u8>, value: Vec<u8>) -> OracleResult<()> {
        self.entries.write().insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> OracleResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn cache_view(&self) -> OracleResult<CacheView> {
        let frozen = self.entries.read().clone();
        Ok(CacheView::new(Arc::new(frozen)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let store = InMemoryStore::new();
        store.set(vec![1, 2], vec![0xAA]).unwrap();

        assert_eq!(store.get(&[1, 2]).unwrap(), Some(vec![0xAA]));
        assert!(store.has(&[1, 2]).unwrap());

        store.delete(&[1, 2]).unwrap();
        assert_eq!(store.get(&[1, 2]).unwrap(), None);
    }

    #[test]
    fn test_prefix_scan_is_sorted_and_bounded() {
        let store = InMemoryStore::new();
        store.set(vec![1, 3], vec![3]).unwrap();
        store.set(vec![1, 1], vec![1]).unwrap();
        store.set(vec![1, 2], vec![2]).unwrap();
        store.set(vec![2, 1], vec![9]).unwrap();

        let scanned = store.prefix_scan(&[1]).unwrap();
        assert_eq!(
            scanned,
            vec![
                (vec![1, 1], vec![1]),
                (vec![1, 2], vec![2]),
                (vec![1, 3], vec![3]),
            ]
        );
    }

    #[test]
    fn test_cache_view_does_not_observe_later_writes() {
        let store = InMemoryStore::new();
        store.set(vec![1], vec![1]).unwrap();

        let view = store.cache_view().unwrap();
        store.set(vec![2], vec![2]).unwrap();
        store.delete(&[1]).unwrap();

        assert_eq!(view.get(&[1]).unwrap(), Some(vec![1]));
        assert_eq!(view.get(&[2]).unwrap(), None);
    }

    #[test]
    fn test_export_import_round_trip() {
        let store = InMemoryStore::new();
        store.set(vec![3], vec![30]).unwrap();
        store.set(vec![1], vec![10]).unwrap();
        store.set(vec![2], vec![20]).unwrap();

        let exported = store.export_sorted();

        let copy = InMemoryStore::new();
        copy.import(exported.clone());
        assert_eq!(copy.export_sorted(), exported);
    }
}
