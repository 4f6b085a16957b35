//! # Amortized Outlier-History Cleanup
//!
//! History grows with every incident; deleting all expired entries in one
//! block would be unbounded work. Instead the keyspace of (validator,
//! asset) pairs is walked in slices: at offset `height % cycle`, only
//! pairs whose enumeration index lands on that offset are processed, at
//! most [`MAX_PAIRS_PER_BLOCK`] of them. Deletions are collected during
//! iteration and applied afterwards, so the scan never mutates what it is
//! iterating.

use crate::severity::MAX_OUTLIER_HISTORY_BLOCKS;
use oc_01_state_store::{keys, KvStore};
use shared_types::OracleResult;
use tracing::debug;

/// Blocks over which one full pass of the keyspace is spread.
pub const CLEANUP_CYCLE: u64 = 100;

/// Hard cap on pairs processed in a single block.
pub const MAX_PAIRS_PER_BLOCK: usize = 50;

/// Run the cleanup slice for `height`. Returns deleted entry count.
pub fn run_amortized_cleanup<S: KvStore>(store: &S, height: u64) -> OracleResult<u64> {
    let offset = height % CLEANUP_CYCLE;
    let horizon = height.saturating_sub(MAX_OUTLIER_HISTORY_BLOCKS);

    // Enumerate distinct (validator, asset) pairs in key order.
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, _) in store.prefix_scan(&keys::outlier_history_all())? {
        let (validator, asset, _) = keys::parse_outlier_history(&key)?;
        if pairs.last().map(|(v, a)| (v.as_str(), a.as_str()))
            != Some((validator.as_str(), asset.as_str()))
        {
            pairs.push((validator, asset));
        }
    }

    let mut stale_keys = Vec::new();
    let mut processed = 0usize;
    for (index, (validator, asset)) in pairs.iter().enumerate() {
        if index as u64 % CLEANUP_CYCLE != offset {
            continue;
        }
        if processed >= MAX_PAIRS_PER_BLOCK {
            break;
        }
        processed += 1;

        for (key, _) in store.prefix_scan(&keys::outlier_history_pair_prefix(validator, asset))? {
            let (_, _, entry_height) = keys::parse_outlier_history(&key)?;
            if entry_height < horizon {
                stale_keys.push(key);
            }
        }
    }

    let deleted = stale_keys.len() as u64;
    for key in stale_keys {
        store.delete(&key)?;
    }
    if deleted > 0 {
        debug!(height, deleted, processed, "outlier history cleanup slice");
    }
    Ok(deleted)
}
