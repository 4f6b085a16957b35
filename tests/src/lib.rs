//! # Oracle-Chain Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Mock staking, manual clock, static GeoIP
//! └── integration/      # End-to-end block scenarios & invariants
//!     ├── scenarios.rs  # Honest majority, outliers, breaker, diversity
//!     └── invariants.rs # Determinism, ordering, round trips
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p oc-tests
//!
//! # By category
//! cargo test -p oc-tests integration::scenarios::
//! cargo test -p oc-tests integration::invariants::
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
