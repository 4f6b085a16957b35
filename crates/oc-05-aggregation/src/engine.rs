//! # Aggregation Engine
//!
//! Fan-out/commit driver for one block's price collapse.
//!
//! ## Algorithm
//!
//! 1. Collect the asset set: tracked assets plus assets with submissions.
//! 2. Sort asset identifiers lexicographically; all later work preserves
//!    that order.
//! 3. Compute per asset against an immutable cache view: sequentially for
//!    up to two assets, otherwise on the bounded worker pool.
//! 4. Commit successes strictly sequentially in canonical order: slashes,
//!    breaker check, aggregated price, snapshot, snapshot pruning.
//!
//! A failing asset never fails the block, and never touches any other
//! asset's result.

use crate::median::weighted_median;
use crate::outlier::{self, filter_outliers};
use crate::stats;
use lazy_static::lazy_static;
use oc_01_state_store::{CacheView, KvStore};
use oc_02_registry::{params_store, powers, prices, submissions};
use oc_03_security::{breaker, gates};
use oc_04_slashing::engine as slashing;
use rayon::prelude::*;
use rust_decimal::Decimal;
use shared_types::{
    AggregatedPrice, ErrorKind, EventBag, FilteredOutlier, OracleError, OracleEvent,
    OracleParams, OracleResult, PriceSnapshot, ValidatorSetProvider,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, warn};

/// Asset count at which compute fans out to the worker pool.
pub const PARALLEL_THRESHOLD: usize = 3;

/// Worker pool size cap. Never elastic.
pub const MAX_WORKERS: usize = 4;

lazy_static! {
    static ref WORKER_POOL: rayon::ThreadPool = rayon::ThreadPoolBuilder::new()
        .num_threads(MAX_WORKERS)
        .thread_name(|i| format!("oracle-agg-{i}"))
        .build()
        .expect("aggregation worker pool");
}

/// Per-validator consensus powers used to weigh one block's submissions:
/// the vote period's frozen snapshot when one exists, else the live
/// bonded set.
struct PowerTable {
    powers: BTreeMap<String, u64>,
    total: u64,
}

fn build_power_table<V>(
    view: &CacheView,
    staking: &V,
    params: &OracleParams,
    height: u64,
) -> OracleResult<PowerTable>
where
    V: ValidatorSetProvider + ?Sized,
{
    let period = params.vote_period_index(height);
    if let Some(snapshot) = powers::get_power_snapshot(view, period)? {
        return Ok(PowerTable {
            total: snapshot.total_power,
            powers: snapshot.powers,
        });
    }

    let reduction = staking.power_reduction();
    let mut table = BTreeMap::new();
    for validator in staking.iterate_bonded() {
        table.insert(validator.id.clone(), validator.power(reduction));
    }
    let total = table.values().sum();
    Ok(PowerTable {
        powers: table,
        total,
    })
}

/// One worker's successful output, applied later on the commit path.
struct AssetSuccess {
    aggregated: AggregatedPrice,
    snapshot: PriceSnapshot,
    outliers: Vec<FilteredOutlier>,
    collusion: Option<(Decimal, Decimal)>,
    min_height: u64,
    dispersion: Decimal,
}

/// Read-only per-asset compute. Runs on worker threads; must not write.
fn compute_asset(
    view: &CacheView,
    asset: &str,
    table: &PowerTable,
    params: &OracleParams,
    height: u64,
    block_time: u64,
) -> OracleResult<AssetSuccess> {
    let fresh: Vec<_> = submissions::latest_for_asset(view, asset)?
        .into_iter()
        .filter(|s| block_time.saturating_sub(s.submitted_at) <= params.expiry_duration)
        .collect();
    if fresh.is_empty() {
        return Err(OracleError::NoSubmissions(asset.to_string()));
    }

    let submitted: u64 = fresh
        .iter()
        .map(|s| table.powers.get(&s.validator).copied().unwrap_or(0))
        .sum();
    // submitted/total >= threshold, kept as an exact decimal comparison.
    if table.total == 0
        || Decimal::from(submitted) < params.vote_threshold * Decimal::from(table.total)
    {
        return Err(OracleError::InsufficientPower {
            asset: asset.to_string(),
            submitted,
            total: table.total,
        });
    }

    let mut trailing = BTreeMap::new();
    for submission in &fresh {
        let history = submissions::trailing_prices(
            view,
            &submission.validator,
            asset,
            submission.block_height,
            outlier::HISTORY_DEPTH,
        )?;
        trailing.insert(submission.validator.clone(), history);
    }

    let outcome = filter_outliers(&fresh, &trailing);
    if outcome.valid.is_empty() {
        return Err(OracleError::AllFiltered(asset.to_string()));
    }

    let pairs: Vec<(Decimal, u64)> = outcome
        .valid
        .iter()
        .map(|s| {
            (
                s.price,
                table.powers.get(&s.validator).copied().unwrap_or(0),
            )
        })
        .collect();
    let price =
        weighted_median(&pairs).ok_or_else(|| OracleError::AllFiltered(asset.to_string()))?;

    let valid_prices: Vec<Decimal> = outcome.valid.iter().map(|s| s.price).collect();
    let dispersion = stats::std_dev_or_fallback(&valid_prices);
    let min_height = fresh
        .iter()
        .map(|s| s.block_height)
        .min()
        .unwrap_or(height);

    Ok(AssetSuccess {
        aggregated: AggregatedPrice {
            asset: asset.to_string(),
            price,
            block_height: height,
            block_time,
            contributors: outcome.valid.len() as u32,
        },
        snapshot: PriceSnapshot {
            asset: asset.to_string(),
            price,
            block_height: height,
            block_time,
        },
        outliers: outcome.outliers,
        collusion: outcome.collusion,
        min_height,
        dispersion,
    })
}

/// Sequential commit of one asset's result: slash events, breaker check,
/// canonical price, snapshot append, snapshot pruning.
fn commit_asset<S, V>(
    store: &S,
    staking: &V,
    params: &OracleParams,
    events: &mut EventBag,
    success: &AssetSuccess,
    height: u64,
) -> OracleResult<()>
where
    S: KvStore,
    V: ValidatorSetProvider + ?Sized,
{
    let asset = success.aggregated.asset.as_str();

    for outlier in &success.outliers {
        events.emit(OracleEvent::OutlierDetected {
            validator: outlier.validator.clone(),
            asset: outlier.asset.clone(),
            price: outlier.price,
            severity: outlier.severity,
            deviation: outlier.deviation,
            reason: outlier.reason,
        });
        slashing::handle_outlier(
            store,
            staking,
            events,
            outlier,
            params.slash_fraction,
            height,
        )?;
    }

    if let Some((price, share)) = success.collusion {
        events.emit(OracleEvent::CollusionSuspected {
            asset: asset.to_string(),
            price,
            share,
        });
    }

    if let Some(previous) = prices::get_aggregated_price(store, asset)? {
        if !previous.price.is_zero() {
            let deviation = ((success.aggregated.price - previous.price) / previous.price).abs();
            if deviation > gates::flash_loan_deviation() && !breaker::is_breaker_armed(store)? {
                breaker::arm_breaker(
                    store,
                    events,
                    asset,
                    &format!("aggregated price moved {deviation} in one update"),
                    height,
                )?;
            }
        }
    }

    prices::set_aggregated_price(store, &success.aggregated)?;
    prices::append_snapshot(store, &success.snapshot)?;
    prices::prune_snapshots_before(
        store,
        asset,
        height.saturating_sub(params.twap_lookback_window),
    )?;

    events.emit(OracleEvent::PricesAggregated {
        asset: asset.to_string(),
        price: success.aggregated.price,
        height,
        contributors: success.aggregated.contributors,
    });
    debug!(
        asset,
        price = %success.aggregated.price,
        contributors = success.aggregated.contributors,
        min_height = success.min_height,
        dispersion = %success.dispersion,
        "asset aggregated"
    );
    Ok(())
}

/// What one aggregation pass did, per asset.
#[derive(Debug, Default)]
pub struct AggregationSummary {
    pub aggregated: Vec<String>,
    pub skipped: Vec<(String, OracleError)>,
}

/// Run the full per-block aggregation pipeline.
pub fn run_aggregation<S, V>(
    store: &S,
    staking: &V,
    events: &mut EventBag,
    height: u64,
    block_time: u64,
) -> OracleResult<AggregationSummary>
where
    S: KvStore,
    V: ValidatorSetProvider + ?Sized,
{
    let params = params_store::get_params(store)?;

    let mut asset_set: BTreeSet<String> = prices::tracked_assets(store)?;
    asset_set.extend(submissions::assets_with_submissions(store)?);
    let assets: Vec<String> = asset_set.into_iter().collect();

    let mut summary = AggregationSummary::default();
    if assets.is_empty() {
        return Ok(summary);
    }

    let view = store.cache_view()?;
    let table = build_power_table(&view, staking, &params, height)?;

    let compute =
        |asset: &String| compute_asset(&view, asset, &table, &params, height, block_time);
    let results: Vec<(String, OracleResult<AssetSuccess>)> =
        if assets.len() < PARALLEL_THRESHOLD {
            assets.iter().map(|a| (a.clone(), compute(a))).collect()
        } else {
            WORKER_POOL.install(|| {
                assets
                    .par_iter()
                    .map(|a| (a.clone(), compute(a)))
                    .collect()
            })
        };

    for (asset, outcome) in results {
        match outcome {
            Ok(success) => match commit_asset(store, staking, &params, events, &success, height) {
                Ok(()) => summary.aggregated.push(asset),
                Err(e) => {
                    error!(%asset, error = %e, "aggregation commit failed");
                    summary.skipped.push((asset, e));
                }
            },
            Err(e) => {
                match e.kind() {
                    ErrorKind::Insufficient => {
                        debug!(%asset, error = %e, "asset skipped")
                    }
                    _ => warn!(%asset, error = %e, "asset compute failed"),
                }
                summary.skipped.push((asset, e));
            }
        }
    }
    Ok(summary)
}
