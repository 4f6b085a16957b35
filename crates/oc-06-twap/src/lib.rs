//! # OC-06 TWAP - Time-Weighted Average Prices
//!
//! ## Purpose
//!
//! Manipulation-resistant price reads over the snapshot series: five
//! estimators with different failure modes, a robust selector that medians
//! across them, and a cross-estimator consistency check.
//!
//! ## Estimators
//!
//! | Estimator | Shape | Guards against |
//! |-----------|-------|----------------|
//! | Standard | time-weighted mean | single-block spikes |
//! | Volume-weighted | time x volume weights | thin-interval noise |
//! | Exponential | EWMA, alpha 0.3 | stale tails |
//! | Trimmed | drop 10% price extremes | short manipulation bursts |
//! | Kalman | predict/correct filter | measurement noise |

pub mod estimators;
pub mod selector;

pub use estimators::{
    exponential_twap, kalman_twap, standard_twap, trimmed_twap, volume_weighted_twap,
    TwapMethod, TwapResult,
};
pub use selector::{check_consistency, compute_twap, robust_twap};
