//! # OC-07 Lifecycle - Block Driver & Message Surface
//!
//! ## Purpose
//!
//! Orchestrates every other subsystem at block boundaries and exposes the
//! message-layer operations and queries. This is the only crate the host
//! chain wires in directly.
//!
//! ## Liveness Rule
//!
//! `begin_block` and `end_block` never return an error. Every step is
//! failure-isolated: a failing aggregation, monitor run, or pruning pass
//! is logged and the block proceeds. Per-asset and per-validator failures
//! are already isolated one level below.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use oc_07_lifecycle::{OracleKeeper, OracleDependencies};
//!
//! let mut keeper = OracleKeeper::new(OracleDependencies {
//!     store, staking, clock, geoip, authority: "gov".into(),
//! });
//!
//! keeper.begin_block();
//! keeper.submit_price("val-1", "val-1", "BTC", price)?;
//! keeper.end_block();
//! let events = keeper.drain_events();
//! ```

pub mod blocks;
pub mod keeper;

pub use keeper::{OracleDependencies, OracleKeeper};
