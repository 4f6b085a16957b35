//! # OC-05 Aggregation - Per-Block Price Collapse
//!
//! ## Purpose
//!
//! Collapses each asset's validator submissions into one canonical price
//! per block: voting-power gating, multi-stage statistical outlier
//! filtering, weighted-median computation, and snapshot writes.
//!
//! ## Determinism Contract
//!
//! The final state is a pure function of the pre-block state plus the
//! sorted submission list, because:
//!
//! 1. Workers compute against immutable cache views and never mutate
//!    shared state.
//! 2. Results are committed strictly sequentially in ascending lexical
//!    asset order.
//! 3. Every arithmetic step is fixed-precision decimal.
//!
//! Parallelism is therefore an optimization invisible to state: at most
//! four workers fan out when more than two assets need computing, and a
//! two-asset block computes sequentially on the invoking thread.

pub mod engine;
pub mod median;
pub mod outlier;
pub mod stats;

pub use engine::{run_aggregation, AggregationSummary, MAX_WORKERS, PARALLEL_THRESHOLD};
pub use median::weighted_median;
pub use outlier::{filter_outliers, FilterOutcome};
