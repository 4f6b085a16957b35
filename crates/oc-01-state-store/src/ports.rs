//! Storage abstractions consumed by every other subsystem.

use shared_types::OracleResult;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read surface of the store. Prefix scans deliver pairs in ascending
/// lexical key order.
pub trait KvRead {
    fn get(&self, key: &[u8]) -> OracleResult<Option<Vec<u8>>>;
    fn has(&self, key: &[u8]) -> OracleResult<bool>;
    fn prefix_scan(&self, prefix: &[u8]) -> OracleResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Full store surface.
pub trait KvStore: KvRead + Send + Sync {
    fn set(&self, key: Vec<u8>, value: Vec<u8>) -> OracleResult<()>;
    fn delete(&self, key: &[u8]) -> OracleResult<()>;

    /// Immutable point-in-time snapshot with no external visibility.
    /// Aggregation workers read only through such views.
    fn cache_view(&self) -> OracleResult<CacheView>;
}

/// Copy-on-write snapshot of the store at a single point in time.
///
/// Cloning is cheap; clones share the frozen map. No write can ever reach
/// a view, so parallel readers are race-free by construction.
#[derive(Debug, Clone)]
pub struct CacheView {
    frozen: Arc<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl CacheView {
    pub fn new(frozen: Arc<BTreeMap<Vec<u8>, Vec<u8>>>) -> Self {
        Self { frozen }
    }

    pub fn len(&self) -> usize {
        self.frozen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frozen.is_empty()
    }
}

impl KvRead for CacheView {
    fn get(&self, key: &[u8]) -> OracleResult<Option<Vec<u8>>> {
        Ok(self.frozen.get(key).cloned())
    }

    fn has(&self, key: &[u8]) -> OracleResult<bool> {
        Ok(self.frozen.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> OracleResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .frozen
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
