//! # OC-01 State Store - Ordered Key/Value Interface
//!
//! ## Purpose
//!
//! The single persistence surface of the oracle core: an ordered
//! byte-key/byte-value map with prefix iteration and deterministic
//! snapshots. Every entity the oracle owns lives in this namespace under a
//! stable single-byte prefix.
//!
//! ## Determinism Contract
//!
//! - `prefix_scan` delivers pairs in ascending lexical key order.
//! - `cache_view` produces an immutable point-in-time snapshot; parallel
//!   aggregation workers read only through such views and never observe
//!   each other's writes.
//! - Export of the full store is sorted, so export → import → export is
//!   byte-identical.

pub mod adapters;
pub mod codec;
pub mod keys;
pub mod ports;

pub use adapters::InMemoryStore;
pub use codec::{decode, encode};
pub use ports::{CacheView, KvRead, KvStore};
