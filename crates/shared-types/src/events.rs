//! # Event Surface
//!
//! Typed events emitted by the oracle core. Engines append events to an
//! [`EventBag`] owned by the block transaction; the lifecycle driver drains
//! the bag once per block and hands the events to the host chain.

use crate::entities::{Asset, OutlierReason, OutlierSeverity, ValidatorId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Every event the oracle core can emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OracleEvent {
    PriceSubmitted {
        validator: ValidatorId,
        asset: Asset,
        price: Decimal,
        height: u64,
    },
    PricesAggregated {
        asset: Asset,
        price: Decimal,
        height: u64,
        contributors: u32,
    },
    OutlierDetected {
        validator: ValidatorId,
        asset: Asset,
        price: Decimal,
        severity: OutlierSeverity,
        deviation: Decimal,
        reason: OutlierReason,
    },
    SlashOutlier {
        validator: ValidatorId,
        asset: Asset,
        severity: OutlierSeverity,
        fraction: Decimal,
        jailed: bool,
    },
    ValidatorOutlierIncremented {
        validator: ValidatorId,
        outliers_in_window: u64,
    },
    CollusionSuspected {
        asset: Asset,
        price: Decimal,
        share: Decimal,
    },
    CircuitBreakerTriggered {
        asset: Asset,
        reason: String,
        triggered_height: u64,
        recovery_height: u64,
    },
    CircuitBreakerRecovered {
        height: u64,
    },
    GeographicDiversityStatus {
        score: Decimal,
        regions: u32,
    },
    GeographicDiversityWarning {
        score: Decimal,
        threshold: Decimal,
    },
    GeographicDiversityCritical {
        regions: u32,
        minimum: u32,
    },
    GeographicConcentrationWarning {
        region: String,
        share: Decimal,
    },
    IpDiversityViolation {
        ip: String,
        count: u32,
        max: u32,
    },
    AsnDiversityViolation {
        asn: u32,
        count: u32,
        max: u32,
    },
    VotingPowerSnapshot {
        period: u64,
        validators: u32,
        total_power: u64,
    },
    OracleBeginBlock {
        height: u64,
    },
    OracleEndBlock {
        height: u64,
    },
}

impl OracleEvent {
    /// Stable wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PriceSubmitted { .. } => "price_submitted",
            Self::PricesAggregated { .. } => "prices_aggregated",
            Self::OutlierDetected { .. } => "outlier_detected",
            Self::SlashOutlier { .. } => "slash_outlier",
            Self::ValidatorOutlierIncremented { .. } => "validator_outlier_incremented",
            Self::CollusionSuspected { .. } => "collusion_suspected",
            Self::CircuitBreakerTriggered { .. } => "circuit_breaker_triggered",
            Self::CircuitBreakerRecovered { .. } => "circuit_breaker_recovered",
            Self::GeographicDiversityStatus { .. } => "geographic_diversity_status",
            Self::GeographicDiversityWarning { .. } => "geographic_diversity_warning",
            Self::GeographicDiversityCritical { .. } => "geographic_diversity_critical",
            Self::GeographicConcentrationWarning { .. } => "geographic_concentration_warning",
            Self::IpDiversityViolation { .. } => "ip_diversity_violation",
            Self::AsnDiversityViolation { .. } => "asn_diversity_violation",
            Self::VotingPowerSnapshot { .. } => "voting_power_snapshot",
            Self::OracleBeginBlock { .. } => "oracle_begin_block",
            Self::OracleEndBlock { .. } => "oracle_end_block",
        }
    }
}

/// Ordered accumulator for events produced within one block transaction.
#[derive(Debug, Default)]
pub struct EventBag {
    events: Vec<OracleEvent>,
}

impl EventBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: OracleEvent) {
        self.events.push(event);
    }

    /// Take all accumulated events, leaving the bag empty.
    pub fn drain(&mut self) -> Vec<OracleEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Read-only view, used by tests.
    pub fn as_slice(&self) -> &[OracleEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_names_are_stable() {
        let e = OracleEvent::PricesAggregated {
            asset: "BTC".into(),
            price: dec!(100),
            height: 10,
            contributors: 9,
        };
        assert_eq!(e.name(), "prices_aggregated");
    }

    #[test]
    fn test_bag_drain_preserves_order() {
        let mut bag = EventBag::new();
        bag.emit(OracleEvent::OracleBeginBlock { height: 1 });
        bag.emit(OracleEvent::OracleEndBlock { height: 1 });

        let drained = bag.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].name(), "oracle_begin_block");
        assert_eq!(drained[1].name(), "oracle_end_block");
        assert!(bag.is_empty());
    }
}
