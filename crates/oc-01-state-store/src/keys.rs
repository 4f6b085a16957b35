//! # Persisted Key Layout
//!
//! Every entity has a single-byte prefix followed by a canonical encoding
//! of its key fields with `0x00` as separator; heights and period indices
//! are big-endian 8 bytes so lexical key order equals numeric order.
//! Prefixes are stable across versions; reordering is forbidden.

use shared_types::{OracleError, OracleResult};

/// Separator between variable-length key fields.
pub const SEP: u8 = 0x00;

pub const AGGREGATED_PRICE: u8 = 0x01; // | asset
pub const PRICE_SNAPSHOT: u8 = 0x02; // | asset | 0x00 | height_be
pub const VALIDATOR_ORACLE: u8 = 0x03; // | validator
pub const SUBMISSION_LATEST: u8 = 0x04; // | asset | 0x00 | validator
pub const SUBMISSION_HISTORY: u8 = 0x05; // | validator | 0x00 | asset | 0x00 | height_be
pub const OUTLIER_HISTORY: u8 = 0x06; // | validator | 0x00 | asset | 0x00 | height_be
pub const CIRCUIT_BREAKER: u8 = 0x07; // singleton
pub const POWER_SNAPSHOT: u8 = 0x08; // | period_be
pub const FEEDER_DELEGATION: u8 = 0x09; // | validator
pub const FEEDER_REVERSE: u8 = 0x0A; // | delegate
pub const RATE_LIMIT: u8 = 0x0B; // | validator | 0x00 | asset | 0x00 | height_be
pub const PARAMS: u8 = 0x0C; // singleton
pub const TOTAL_POWER: u8 = 0x0D; // singleton
pub const IBC_NONCE: u8 = 0x0E; // | nonce

fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let mut key = Vec::with_capacity(parts.iter().map(|p| p.len()).sum::<usize>() + parts.len());
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            key.push(SEP);
        }
        key.extend_from_slice(part);
    }
    key
}

fn with_prefix(prefix: u8, rest: Vec<u8>) -> Vec<u8> {
    let mut key = Vec::with_capacity(rest.len() + 1);
    key.push(prefix);
    key.extend_from_slice(&rest);
    key
}

// =============================================================================
// BUILDERS
// =============================================================================

pub fn aggregated_price(asset: &str) -> Vec<u8> {
    with_prefix(AGGREGATED_PRICE, asset.as_bytes().to_vec())
}

pub fn aggregated_price_prefix() -> Vec<u8> {
    vec![AGGREGATED_PRICE]
}

pub fn price_snapshot(asset: &str, height: u64) -> Vec<u8> {
    with_prefix(
        PRICE_SNAPSHOT,
        concat(&[asset.as_bytes(), &height.to_be_bytes()]),
    )
}

/// Prefix covering all snapshots of one asset, ascending by height.
pub fn price_snapshot_prefix(asset: &str) -> Vec<u8> {
    let mut key = with_prefix(PRICE_SNAPSHOT, asset.as_bytes().to_vec());
    key.push(SEP);
    key
}

pub fn validator_oracle(validator: &str) -> Vec<u8> {
    with_prefix(VALIDATOR_ORACLE, validator.as_bytes().to_vec())
}

pub fn validator_oracle_prefix() -> Vec<u8> {
    vec![VALIDATOR_ORACLE]
}

pub fn submission_latest(asset: &str, validator: &str) -> Vec<u8> {
    with_prefix(
        SUBMISSION_LATEST,
        concat(&[asset.as_bytes(), validator.as_bytes()]),
    )
}

/// Prefix covering the latest submissions for one asset, ascending by
/// validator id. This iteration order is the canonical submission order.
pub fn submission_latest_prefix(asset: &str) -> Vec<u8> {
    let mut key = with_prefix(SUBMISSION_LATEST, asset.as_bytes().to_vec());
    key.push(SEP);
    key
}

pub fn submission_latest_all() -> Vec<u8> {
    vec![SUBMISSION_LATEST]
}

pub fn submission_history(validator: &str, asset: &str, height: u64) -> Vec<u8> {
    with_prefix(
        SUBMISSION_HISTORY,
        concat(&[validator.as_bytes(), asset.as_bytes(), &height.to_be_bytes()]),
    )
}

pub fn submission_history_prefix(validator: &str, asset: &str) -> Vec<u8> {
    let mut key = with_prefix(
        SUBMISSION_HISTORY,
        concat(&[validator.as_bytes(), asset.as_bytes()]),
    );
    key.push(SEP);
    key
}

pub fn submission_history_all() -> Vec<u8> {
    vec![SUBMISSION_HISTORY]
}

pub fn outlier_history(validator: &str, asset: &str, height: u64) -> Vec<u8> {
    with_prefix(
        OUTLIER_HISTORY,
        concat(&[validator.as_bytes(), asset.as_bytes(), &height.to_be_bytes()]),
    )
}

pub fn outlier_history_validator_prefix(validator: &str) -> Vec<u8> {
    let mut key = with_prefix(OUTLIER_HISTORY, validator.as_bytes().to_vec());
    key.push(SEP);
    key
}

pub fn outlier_history_pair_prefix(validator: &str, asset: &str) -> Vec<u8> {
    let mut key = with_prefix(
        OUTLIER_HISTORY,
        concat(&[validator.as_bytes(), asset.as_bytes()]),
    );
    key.push(SEP);
    key
}

pub fn outlier_history_all() -> Vec<u8> {
    vec![OUTLIER_HISTORY]
}

pub fn circuit_breaker() -> Vec<u8> {
    vec![CIRCUIT_BREAKER]
}

pub fn power_snapshot(period: u64) -> Vec<u8> {
    with_prefix(POWER_SNAPSHOT, period.to_be_bytes().to_vec())
}

pub fn power_snapshot_prefix() -> Vec<u8> {
    vec![POWER_SNAPSHOT]
}

pub fn feeder_delegation(validator: &str) -> Vec<u8> {
    with_prefix(FEEDER_DELEGATION, validator.as_bytes().to_vec())
}

pub fn feeder_reverse(delegate: &str) -> Vec<u8> {
    with_prefix(FEEDER_REVERSE, delegate.as_bytes().to_vec())
}

pub fn rate_limit(validator: &str, asset: &str, height: u64) -> Vec<u8> {
    with_prefix(
        RATE_LIMIT,
        concat(&[validator.as_bytes(), asset.as_bytes(), &height.to_be_bytes()]),
    )
}

pub fn rate_limit_validator_prefix(validator: &str) -> Vec<u8> {
    let mut key = with_prefix(RATE_LIMIT, validator.as_bytes().to_vec());
    key.push(SEP);
    key
}

pub fn rate_limit_pair_prefix(validator: &str, asset: &str) -> Vec<u8> {
    let mut key = with_prefix(RATE_LIMIT, concat(&[validator.as_bytes(), asset.as_bytes()]));
    key.push(SEP);
    key
}

pub fn rate_limit_all() -> Vec<u8> {
    vec![RATE_LIMIT]
}

pub fn params() -> Vec<u8> {
    vec![PARAMS]
}

pub fn total_power() -> Vec<u8> {
    vec![TOTAL_POWER]
}

pub fn ibc_nonce(nonce: &str) -> Vec<u8> {
    with_prefix(IBC_NONCE, nonce.as_bytes().to_vec())
}

pub fn ibc_nonce_all() -> Vec<u8> {
    vec![IBC_NONCE]
}

// =============================================================================
// PARSERS
// =============================================================================

fn be_u64(bytes: &[u8], prefix: u8) -> OracleResult<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| OracleError::MalformedKey { prefix })?;
    Ok(u64::from_be_bytes(arr))
}

fn utf8(bytes: &[u8], prefix: u8) -> OracleResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| OracleError::MalformedKey { prefix })
}

/// Split `prefix | a | 0x00 | b | 0x00 | height_be` into its fields.
fn parse_pair_height(key: &[u8], prefix: u8) -> OracleResult<(String, String, u64)> {
    let body = key
        .strip_prefix(&[prefix])
        .ok_or(OracleError::MalformedKey { prefix })?;
    if body.len() < 8 + 2 {
        return Err(OracleError::MalformedKey { prefix });
    }
    let (rest, height_bytes) = body.split_at(body.len() - 8);
    let rest = rest
        .strip_suffix(&[SEP])
        .ok_or(OracleError::MalformedKey { prefix })?;
    let sep_at = rest
        .iter()
        .position(|&b| b == SEP)
        .ok_or(OracleError::MalformedKey { prefix })?;
    Ok((
        utf8(&rest[..sep_at], prefix)?,
        utf8(&rest[sep_at + 1..], prefix)?,
        be_u64(height_bytes, prefix)?,
    ))
}

/// Parse `outlier_history` keys into (validator, asset, height).
pub fn parse_outlier_history(key: &[u8]) -> OracleResult<(String, String, u64)> {
    parse_pair_height(key, OUTLIER_HISTORY)
}

/// Parse `submission_history` keys into (validator, asset, height).
pub fn parse_submission_history(key: &[u8]) -> OracleResult<(String, String, u64)> {
    parse_pair_height(key, SUBMISSION_HISTORY)
}

/// Parse `rate_limit` keys into (validator, asset, height).
pub fn parse_rate_limit(key: &[u8]) -> OracleResult<(String, String, u64)> {
    parse_pair_height(key, RATE_LIMIT)
}

/// Parse `price_snapshot` keys into (asset, height).
pub fn parse_price_snapshot(key: &[u8]) -> OracleResult<(String, u64)> {
    let body = key
        .strip_prefix(&[PRICE_SNAPSHOT])
        .ok_or(OracleError::MalformedKey { prefix: PRICE_SNAPSHOT })?;
    if body.len() < 8 + 1 {
        return Err(OracleError::MalformedKey { prefix: PRICE_SNAPSHOT });
    }
    let (rest, height_bytes) = body.split_at(body.len() - 8);
    let asset = rest
        .strip_suffix(&[SEP])
        .ok_or(OracleError::MalformedKey { prefix: PRICE_SNAPSHOT })?;
    Ok((
        utf8(asset, PRICE_SNAPSHOT)?,
        be_u64(height_bytes, PRICE_SNAPSHOT)?,
    ))
}

/// Parse `aggregated_price` keys into the asset id.
pub fn parse_aggregated_price(key: &[u8]) -> OracleResult<String> {
    let body = key
        .strip_prefix(&[AGGREGATED_PRICE])
        .ok_or(OracleError::MalformedKey { prefix: AGGREGATED_PRICE })?;
    utf8(body, AGGREGATED_PRICE)
}

/// Parse `submission_latest` keys into (asset, validator).
pub fn parse_submission_latest(key: &[u8]) -> OracleResult<(String, String)> {
    let body = key
        .strip_prefix(&[SUBMISSION_LATEST])
        .ok_or(OracleError::MalformedKey { prefix: SUBMISSION_LATEST })?;
    let sep_at = body
        .iter()
        .position(|&b| b == SEP)
        .ok_or(OracleError::MalformedKey { prefix: SUBMISSION_LATEST })?;
    Ok((
        utf8(&body[..sep_at], SUBMISSION_LATEST)?,
        utf8(&body[sep_at + 1..], SUBMISSION_LATEST)?,
    ))
}
