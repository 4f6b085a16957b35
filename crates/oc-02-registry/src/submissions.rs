//! The submission log: latest price per (asset, validator), per-pair
//! trailing history, and rate-limit records.
//!
//! Latest rows drive aggregation; history rows feed the per-validator
//! consistency stage of the outlier filter. Both are range-swept by the
//! end-block pruning pass to bound gas.

use oc_01_state_store::{codec, keys, KvRead, KvStore};
use rust_decimal::Decimal;
use shared_types::{OracleResult, ValidatorPrice};
use std::collections::BTreeSet;

/// Blocks a submission (latest row, history row, rate-limit record)
/// survives before the end-block sweep removes it.
pub const SUBMISSION_RETENTION_BLOCKS: u64 = 10_000;

/// Record a submission: overwrites the latest row for the pair and appends
/// a history row at the submission height. Re-submitting the identical
/// price in the same block is idempotent in stored state.
pub fn record_price<S: KvStore>(store: &S, price: &ValidatorPrice) -> OracleResult<()> {
    let encoded = codec::encode(price)?;
    store.set(
        keys::submission_latest(&price.asset, &price.validator),
        encoded.clone(),
    )?;
    store.set(
        keys::submission_history(&price.validator, &price.asset, price.block_height),
        encoded,
    )
}

pub fn get_latest<S: KvRead>(
    store: &S,
    asset: &str,
    validator: &str,
) -> OracleResult<Option<ValidatorPrice>> {
    match store.get(&keys::submission_latest(asset, validator))? {
        Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
        None => Ok(None),
    }
}

/// Latest submissions for one asset, ascending by validator id. This is
/// the canonical submission order consumed by aggregation.
pub fn latest_for_asset<S: KvRead>(store: &S, asset: &str) -> OracleResult<Vec<ValidatorPrice>> {
    store
        .prefix_scan(&keys::submission_latest_prefix(asset))?
        .iter()
        .map(|(_, v)| codec::decode(v))
        .collect()
}

/// Distinct assets with at least one latest submission row.
pub fn assets_with_submissions<S: KvRead>(store: &S) -> OracleResult<BTreeSet<String>> {
    let mut assets = BTreeSet::new();
    for (key, _) in store.prefix_scan(&keys::submission_latest_all())? {
        let (asset, _) = keys::parse_submission_latest(&key)?;
        assets.insert(asset);
    }
    Ok(assets)
}

/// The validator's most recent `limit` historical prices for an asset,
/// strictly below `before_height`, oldest first.
pub fn trailing_prices<S: KvRead>(
    store: &S,
    validator: &str,
    asset: &str,
    before_height: u64,
    limit: usize,
) -> OracleResult<Vec<Decimal>> {
    let rows = store.prefix_scan(&keys::submission_history_prefix(validator, asset))?;
    let mut prices = Vec::new();
    for (key, value) in rows {
        let (_, _, height) = keys::parse_submission_history(&key)?;
        if height < before_height {
            let price: ValidatorPrice = codec::decode(&value)?;
            prices.push(price.price);
        }
    }
    if prices.len() > limit {
        prices.drain(..prices.len() - limit);
    }
    Ok(prices)
}

/// Range-swept removal of submission state older than `cutoff_height`.
/// Returns the number of deleted rows.
pub fn prune_older_than<S: KvStore>(store: &S, cutoff_height: u64) -> OracleResult<u64> {
    let mut deleted = 0;

    let mut stale_keys = Vec::new();
    for (key, _) in store.prefix_scan(&keys::submission_history_all())? {
        let (_, _, height) = keys::parse_submission_history(&key)?;
        if height < cutoff_height {
            stale_keys.push(key);
        }
    }
    for (key, value) in store.prefix_scan(&keys::submission_latest_all())? {
        let price: ValidatorPrice = codec::decode(&value)?;
        if price.block_height < cutoff_height {
            stale_keys.push(key);
        }
    }
    for key in stale_keys {
        store.delete(&key)?;
        deleted += 1;
    }
    Ok(deleted)
}

// =============================================================================
// RATE-LIMIT RECORDS
// =============================================================================

/// Record one submission occurrence for rate-limit accounting.
pub fn record_rate_limit<S: KvStore>(
    store: &S,
    validator: &str,
    asset: &str,
    height: u64,
) -> OracleResult<()> {
    store.set(keys::rate_limit(validator, asset, height), vec![1])
}

/// Submissions by a validator (across all assets) within
/// `[window_start, current]`.
pub fn rate_limit_count<S: KvRead>(
    store: &S,
    validator: &str,
    window_start: u64,
) -> OracleResult<u32> {
    let mut count = 0;
    for (key, _) in store.prefix_scan(&keys::rate_limit_validator_prefix(validator))? {
        let (_, _, height) = keys::parse_rate_limit(&key)?;
        if height >= window_start {
            count += 1;
        }
    }
    Ok(count)
}

/// Submissions by a validator for one asset within the window.
pub fn rate_limit_pair_count<S: KvRead>(
    store: &S,
    validator: &str,
    asset: &str,
    window_start: u64,
) -> OracleResult<u32> {
    let mut count = 0;
    for (key, _) in store.prefix_scan(&keys::rate_limit_pair_prefix(validator, asset))? {
        let (_, _, height) = keys::parse_rate_limit(&key)?;
        if height >= window_start {
            count += 1;
        }
    }
    Ok(count)
}

/// Drop rate-limit records older than `cutoff_height`.
pub fn prune_rate_limits<S: KvStore>(store: &S, cutoff_height: u64) -> OracleResult<u64> {
    let mut stale_keys = Vec::new();
    for (key, _) in store.prefix_scan(&keys::rate_limit_all())? {
        let (_, _, height) = keys::parse_rate_limit(&key)?;
        if height < cutoff_height {
            stale_keys.push(key);
        }
    }
    let deleted = stale_keys.len() as u64;
    for key in stale_keys {
        store.delete(&key)?;
    }
    Ok(deleted)
}
