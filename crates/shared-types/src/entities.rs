//! # Core Domain Entities
//!
//! Defines the oracle entities persisted in the state store.
//!
//! ## Clusters
//!
//! - **Identity**: `ValidatorId`, `AccountId`, `Asset`
//! - **Submissions**: `ValidatorPrice`, `FeederDelegation`
//! - **Aggregation**: `AggregatedPrice`, `PriceSnapshot`
//! - **Reputation & Safety**: `OutlierSeverity`, `OutlierHistoryEntry`,
//!   `FilteredOutlier`, `CircuitBreakerState`
//! - **Voting Power**: `VotingPowerSnapshot`, `BondedValidator`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operator address of a staking validator (bech32 string).
pub type ValidatorId = String;

/// Account address permitted to submit on behalf of a validator.
pub type AccountId = String;

/// Asset identifier (e.g. "BTC", "ATOM"). Canonical ordering is lexical.
pub type Asset = String;

/// Block height.
pub type BlockHeight = u64;

// =============================================================================
// CLUSTER A: SUBMISSIONS
// =============================================================================

/// Per-validator oracle metadata row.
///
/// Created on first interaction, refreshed from the staking set each block,
/// deleted when the underlying validator unbonds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorOracle {
    pub validator: ValidatorId,
    /// Vote periods in which this validator failed to submit.
    pub miss_counter: u64,
    /// Lifetime accepted submissions.
    pub total_submissions: u64,
    /// Claimed geographic region. Never empty; defaults to "global".
    pub region: String,
    /// Claimed node IP, used by the Sybil checks.
    pub ip: String,
    /// Autonomous system number of the node.
    pub asn: u32,
    /// Whether the validator is currently part of the bonded set.
    pub active: bool,
}

impl ValidatorOracle {
    pub fn new(validator: ValidatorId) -> Self {
        Self {
            validator,
            miss_counter: 0,
            total_submissions: 0,
            region: "global".to_string(),
            ip: String::new(),
            asn: 0,
            active: true,
        }
    }
}

/// A single price submission by a validator for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorPrice {
    pub validator: ValidatorId,
    pub asset: Asset,
    pub price: Decimal,
    pub block_height: BlockHeight,
    /// Block time at submission (unix seconds). Drives staleness expiry.
    pub submitted_at: u64,
    /// Consensus power of the validator at submission time.
    pub voting_power: u64,
}

/// Validator -> delegate feeder account binding.
///
/// A delegate account maps to at most one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeederDelegation {
    pub validator: ValidatorId,
    pub delegate: AccountId,
}

// =============================================================================
// CLUSTER B: AGGREGATION
// =============================================================================

/// Canonical aggregated price for an asset, replaced on every successful
/// aggregation. Block height is monotone non-decreasing per asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPrice {
    pub asset: Asset,
    pub price: Decimal,
    pub block_height: BlockHeight,
    pub block_time: u64,
    /// Number of submissions that survived outlier filtering.
    pub contributors: u32,
}

/// Historical price point feeding the TWAP engine.
///
/// Snapshots per asset are strictly ordered by block height and pruned
/// outside the lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub asset: Asset,
    pub price: Decimal,
    pub block_height: BlockHeight,
    pub block_time: u64,
}

// =============================================================================
// CLUSTER C: REPUTATION & SAFETY
// =============================================================================

/// Outlier severity grades, ordered from mildest to worst.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum OutlierSeverity {
    Low,
    Moderate,
    High,
    Extreme,
}

impl OutlierSeverity {
    /// Bump severity one level, saturating at `Extreme`.
    pub fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Moderate,
            Self::Moderate => Self::High,
            Self::High => Self::Extreme,
            Self::Extreme => Self::Extreme,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }
}

/// Why a submission was filtered out of aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlierReason {
    /// Failed the absolute sanity bounds.
    SanityBounds,
    /// Flagged by the modified Z-score (MAD) stage.
    RobustZScore,
    /// Deviates too far from the validator's own trailing submissions.
    HistoricalInconsistency,
}

impl OutlierReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SanityBounds => "sanity_bounds",
            Self::RobustZScore => "robust_z_score",
            Self::HistoricalInconsistency => "historical_inconsistency",
        }
    }
}

/// A submission rejected by the outlier filter, with grading metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredOutlier {
    pub validator: ValidatorId,
    pub asset: Asset,
    pub price: Decimal,
    /// Height of the offending submission.
    pub block_height: BlockHeight,
    pub severity: OutlierSeverity,
    /// Robust deviation that triggered the flag (zero for sanity failures).
    pub deviation: Decimal,
    pub reason: OutlierReason,
}

/// Persisted record of one outlier incident.
///
/// Entries older than the history horizon are removed by the amortized
/// end-block cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlierHistoryEntry {
    pub validator: ValidatorId,
    pub asset: Asset,
    pub block_height: BlockHeight,
    pub severity: OutlierSeverity,
}

/// Global latch that flags the oracle as untrusted after extreme movement.
///
/// Invariant: while active, `recovery_height > triggered_height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerState {
    pub active: bool,
    pub triggered_by: Asset,
    pub reason: String,
    pub triggered_height: BlockHeight,
    pub recovery_height: BlockHeight,
}

// =============================================================================
// CLUSTER D: VOTING POWER
// =============================================================================

/// Frozen per-validator consensus powers for one vote period.
///
/// Invariant: `total_power` equals the sum of `powers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingPowerSnapshot {
    pub period: u64,
    pub powers: BTreeMap<ValidatorId, u64>,
    pub total_power: u64,
}

impl VotingPowerSnapshot {
    pub fn new(period: u64, powers: BTreeMap<ValidatorId, u64>) -> Self {
        let total_power = powers.values().sum();
        Self {
            period,
            powers,
            total_power,
        }
    }
}

/// Read-only view of one bonded validator from the staking subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondedValidator {
    /// Operator address (the oracle-facing identity).
    pub id: ValidatorId,
    /// Consensus address used for slashing and jailing.
    pub consensus_id: String,
    /// Staked tokens in base units.
    pub tokens: u128,
    pub bonded: bool,
}

impl BondedValidator {
    /// Integer consensus power derived from stake.
    pub fn power(&self, power_reduction: u128) -> u64 {
        if power_reduction == 0 {
            return 0;
        }
        (self.tokens / power_reduction).min(u64::MAX as u128) as u64
    }
}
