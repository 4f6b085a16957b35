//! IP and ASN Sybil checks over the bonded set.
//!
//! A validator set where one IP or one autonomous system hosts more nodes
//! than the configured caps fails the check; each offending group also
//! emits a violation event.

use shared_types::{EventBag, OracleEvent, OracleParams, OracleResult, OracleError, ValidatorOracle};
use std::collections::BTreeMap;

/// Check the bonded validators' claimed IPs and ASNs against the caps.
/// A cap of zero disables the corresponding check.
pub fn check_sybil_limits(
    oracles: &[ValidatorOracle],
    params: &OracleParams,
    events: &mut EventBag,
) -> OracleResult<()> {
    let mut first_violation: Option<OracleError> = None;

    if params.max_validators_per_ip > 0 {
        let mut per_ip: BTreeMap<&str, u32> = BTreeMap::new();
        for row in oracles.iter().filter(|o| o.active && !o.ip.is_empty()) {
            *per_ip.entry(row.ip.as_str()).or_insert(0) += 1;
        }
        for (ip, count) in per_ip {
            if count > params.max_validators_per_ip {
                events.emit(OracleEvent::IpDiversityViolation {
                    ip: ip.to_string(),
                    count,
                    max: params.max_validators_per_ip,
                });
                first_violation.get_or_insert(OracleError::IpConcentration {
                    ip: ip.to_string(),
                    count: count as usize,
                    max: params.max_validators_per_ip as usize,
                });
            }
        }
    }

    if params.max_validators_per_asn > 0 {
        let mut per_asn: BTreeMap<u32, u32> = BTreeMap::new();
        for row in oracles.iter().filter(|o| o.active && o.asn != 0) {
            *per_asn.entry(row.asn).or_insert(0) += 1;
        }
        for (asn, count) in per_asn {
            if count > params.max_validators_per_asn {
                events.emit(OracleEvent::AsnDiversityViolation {
                    asn,
                    count,
                    max: params.max_validators_per_asn,
                });
                first_violation.get_or_insert(OracleError::AsnConcentration {
                    asn,
                    count: count as usize,
                    max: params.max_validators_per_asn as usize,
                });
            }
        }
    }

    match first_violation {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle(id: &str, ip: &str, asn: u32) -> ValidatorOracle {
        let mut row = ValidatorOracle::new(id.to_string());
        row.ip = ip.to_string();
        row.asn = asn;
        row
    }

    #[test]
    fn test_distinct_hosts_pass() {
        let rows = vec![
            oracle("val-1", "10.0.0.1", 100),
            oracle("val-2", "10.0.0.2", 200),
            oracle("val-3", "10.0.0.3", 300),
        ];
        let mut events = EventBag::new();
        assert!(check_sybil_limits(&rows, &OracleParams::default(), &mut events).is_ok());
        assert!(events.is_empty());
    }

    #[test]
    fn test_shared_ip_over_cap_fails() {
        let rows = vec![
            oracle("val-1", "10.0.0.1", 100),
            oracle("val-2", "10.0.0.1", 200),
            oracle("val-3", "10.0.0.1", 300),
        ];
        let mut events = EventBag::new();
        let err = check_sybil_limits(&rows, &OracleParams::default(), &mut events).unwrap_err();
        assert!(matches!(err, OracleError::IpConcentration { count: 3, .. }));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_zero_cap_disables_check() {
        let rows = vec![
            oracle("val-1", "10.0.0.1", 100),
            oracle("val-2", "10.0.0.1", 100),
            oracle("val-3", "10.0.0.1", 100),
        ];
        let mut params = OracleParams::default();
        params.max_validators_per_ip = 0;
        params.max_validators_per_asn = 0;
        let mut events = EventBag::new();
        assert!(check_sybil_limits(&rows, &params, &mut events).is_ok());
    }
}
