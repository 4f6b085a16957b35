//! # Governable Parameters
//!
//! The recognized oracle configuration, updated only through the
//! authority-gated parameter message. Invalid parameter sets are rejected
//! before anything is persisted.

use crate::errors::{OracleError, OracleResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Governable oracle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleParams {
    /// Blocks between slash-window evaluations; also the cadence for
    /// voting-power snapshots.
    pub vote_period: u64,
    /// Minimum submitted-power fraction for an aggregation to count.
    pub vote_threshold: Decimal,
    /// Base slash amount applied to misbehaving validators.
    pub slash_fraction: Decimal,
    /// Miss-vote accounting window in blocks.
    pub slash_window: u64,
    /// Tolerated misses per slash window.
    pub min_valid_per_window: u64,
    /// Snapshot retention horizon in blocks.
    pub twap_lookback_window: u64,
    /// Byzantine-tolerance minimum distinct regions.
    pub min_geographic_regions: u32,
    /// Gate validator registration by region.
    pub require_geographic_diversity: bool,
    /// Reject registrations that worsen the diversity score.
    pub enforce_runtime_diversity: bool,
    /// Blocks between diversity monitor runs; 0 disables the monitor.
    pub diversity_check_interval: u64,
    /// Diversity score below which a warning is emitted.
    pub diversity_warning_threshold: Decimal,
    /// Region allowlist.
    pub allowed_regions: BTreeSet<String>,
    /// Max validators sharing one IP; 0 disables the check.
    pub max_validators_per_ip: u32,
    /// Max validators sharing one ASN; 0 disables the check.
    pub max_validators_per_asn: u32,
    /// Minimum seconds between submissions per (validator, asset).
    pub update_interval: u64,
    /// Submission staleness cutoff in seconds.
    pub expiry_duration: u64,
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            vote_period: 10,
            vote_threshold: Decimal::new(67, 2), // 0.67
            slash_fraction: Decimal::new(1, 4),  // 0.0001
            slash_window: 10_000,
            min_valid_per_window: 50,
            twap_lookback_window: 3_600,
            min_geographic_regions: 3,
            require_geographic_diversity: false,
            enforce_runtime_diversity: false,
            diversity_check_interval: 100,
            diversity_warning_threshold: Decimal::new(40, 2), // 0.40
            allowed_regions: [
                "north_america",
                "south_america",
                "europe",
                "asia",
                "africa",
                "oceania",
                "middle_east",
                "global",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_validators_per_ip: 2,
            max_validators_per_asn: 5,
            update_interval: 0,
            expiry_duration: 600,
        }
    }
}

impl OracleParams {
    /// Validate every numeric parameter range. Nothing is persisted when
    /// this fails.
    pub fn validate(&self) -> OracleResult<()> {
        fn in_unit_interval(name: &'static str, value: Decimal) -> OracleResult<()> {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(OracleError::InvalidParam {
                    name,
                    reason: format!("{value} outside [0, 1]"),
                });
            }
            Ok(())
        }

        fn positive(name: &'static str, value: u64) -> OracleResult<()> {
            if value == 0 {
                return Err(OracleError::InvalidParam {
                    name,
                    reason: "must be positive".to_string(),
                });
            }
            Ok(())
        }

        in_unit_interval("vote_threshold", self.vote_threshold)?;
        in_unit_interval("slash_fraction", self.slash_fraction)?;
        in_unit_interval("diversity_warning_threshold", self.diversity_warning_threshold)?;

        positive("vote_period", self.vote_period)?;
        positive("slash_window", self.slash_window)?;
        positive("twap_lookback_window", self.twap_lookback_window)?;
        positive("expiry_duration", self.expiry_duration)?;

        if self.min_geographic_regions < 3 {
            return Err(OracleError::InvalidParam {
                name: "min_geographic_regions",
                reason: format!("{} below the Byzantine minimum of 3", self.min_geographic_regions),
            });
        }
        if self.require_geographic_diversity && self.allowed_regions.is_empty() {
            return Err(OracleError::InvalidParam {
                name: "allowed_regions",
                reason: "must be non-empty when geographic diversity is required".to_string(),
            });
        }
        Ok(())
    }

    /// Vote-period index for a block height.
    pub fn vote_period_index(&self, height: u64) -> u64 {
        height / self.vote_period
    }

    /// Whether `height` opens a new vote period.
    pub fn is_vote_period_start(&self, height: u64) -> bool {
        height % self.vote_period == 0
    }
}
