//! End-to-end block scenarios over the full keeper.

#[cfg(test)]
mod tests {
    use crate::fixtures::{oracle_with_validators, submit_round};
    use oc_02_registry::registry;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use shared_types::{BlockClock, OracleError, OracleEvent, OutlierSeverity};

    // =========================================================================
    // SCENARIO 1: HONEST MAJORITY
    // =========================================================================

    #[test]
    fn test_honest_majority_aggregates_cleanly() {
        let mut oracle = oracle_with_validators(10, 2000);

        let prices: Vec<Decimal> = (0..10i64)
            .map(|i| dec!(100) + Decimal::new(i % 3 - 1, 0))
            .collect();
        submit_round(&mut oracle, "BTC", &prices);

        let aggregated = oracle.keeper.query_price("BTC").unwrap().unwrap();
        assert!(aggregated.price >= dec!(99) && aggregated.price <= dec!(101));
        assert_eq!(aggregated.block_height, 2001);
        assert_eq!(aggregated.contributors, 10);

        let events = oracle.keeper.drain_events();
        assert!(!events.iter().any(|e| e.name() == "outlier_detected"));
        assert!(oracle.staking.slashes.lock().is_empty());

        let snapshots = oracle.keeper.query_snapshots("BTC", 0, u64::MAX).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].block_height, 2001);
    }

    // =========================================================================
    // SCENARIO 2: SINGLE 10x OUTLIER
    // =========================================================================

    #[test]
    fn test_extreme_outlier_slashed_and_jailed() {
        let mut oracle = oracle_with_validators(10, 2000);

        let mut prices: Vec<Decimal> = (0..9i64)
            .map(|i| dec!(100) + Decimal::new(i % 2, 0))
            .collect();
        prices.push(dec!(1000));
        submit_round(&mut oracle, "BTC", &prices);

        let aggregated = oracle.keeper.query_price("BTC").unwrap().unwrap();
        assert!(aggregated.price >= dec!(99) && aggregated.price <= dec!(101));

        // First Extreme offense skips grace: 0.0005 plus jail.
        let slashes = oracle.staking.slashes.lock().clone();
        assert_eq!(slashes, vec![("cons-val-9".to_string(), dec!(0.0005))]);
        assert!(oracle.staking.jailed("val-9"));

        let events = oracle.keeper.drain_events();
        let outlier = events
            .iter()
            .find_map(|e| match e {
                OracleEvent::OutlierDetected {
                    validator,
                    severity,
                    ..
                } => Some((validator.clone(), *severity)),
                _ => None,
            })
            .expect("outlier event");
        assert_eq!(outlier, ("val-9".to_string(), OutlierSeverity::Extreme));

        let history = oracle.keeper.query_outlier_history("val-9").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].severity, OutlierSeverity::Extreme);
    }

    // =========================================================================
    // SCENARIO 3: REPEAT MODERATE OFFENDER
    // =========================================================================

    #[test]
    fn test_fourth_moderate_offense_slashes_and_jails() {
        let mut oracle = oracle_with_validators(10, 2000);

        // 103 against a 100/101 cluster lands in the Moderate band.
        let mut prices: Vec<Decimal> = (0..9i64)
            .map(|i| dec!(100) + Decimal::new(i % 2, 0))
            .collect();
        prices.push(dec!(103));

        for round in 0..4usize {
            submit_round(&mut oracle, "BTC", &prices);
            let history = oracle.keeper.query_outlier_history("val-9").unwrap();
            assert_eq!(history.len(), round + 1);
            assert!(history
                .iter()
                .all(|h| h.severity == OutlierSeverity::Moderate));

            if round < 3 {
                // Recorded without slash while under the repeat threshold.
                assert!(
                    oracle.staking.slashes.lock().is_empty(),
                    "premature slash in round {round}"
                );
                // Advance a few blocks; well inside the 1000-block window.
                oracle.clock.advance(10);
            }
        }

        let slashes = oracle.staking.slashes.lock().clone();
        assert_eq!(slashes, vec![("cons-val-9".to_string(), dec!(0.0002))]);
        assert!(oracle.staking.jailed("val-9"));
    }

    // =========================================================================
    // SCENARIO 4: CIRCUIT BREAKER
    // =========================================================================

    #[test]
    fn test_breaker_arms_on_move_and_recovers_on_audit() {
        let mut oracle = oracle_with_validators(10, 2000);

        submit_round(&mut oracle, "BTC", &[dec!(10); 10]);
        assert!(oracle.keeper.query_circuit_breaker().unwrap().is_none());

        // 60% move: 10 -> 16. The submission gate latches the breaker.
        oracle.clock.advance(1);
        for i in 0..10 {
            let id = format!("val-{i}");
            oracle.keeper.submit_price(&id, &id, "BTC", dec!(16)).unwrap();
        }
        oracle.clock.advance(1);
        oracle.keeper.begin_block();
        oracle.keeper.end_block();

        let state = oracle.keeper.query_circuit_breaker().unwrap().unwrap();
        assert!(state.active);
        assert_eq!(state.recovery_height, state.triggered_height + 100);

        // While armed, the audit reports the breaker.
        let err = oracle.keeper.run_security_audit().unwrap_err();
        assert!(matches!(err, OracleError::CircuitBreakerActive { .. }));

        // At the recovery height the audit disarms and emits recovery.
        let wait = state.recovery_height - oracle.clock.height();
        oracle.clock.advance(wait);
        oracle.keeper.run_security_audit().unwrap();
        assert!(oracle.keeper.query_circuit_breaker().unwrap().is_none());

        let events = oracle.keeper.drain_events();
        assert!(events
            .iter()
            .any(|e| e.name() == "circuit_breaker_recovered"));
    }

    // =========================================================================
    // SCENARIO 5: INSUFFICIENT POWER
    // =========================================================================

    #[test]
    fn test_minority_submission_skips_asset_only() {
        let mut oracle = oracle_with_validators(10, 2000);

        for i in 0..10 {
            let id = format!("val-{i}");
            oracle.keeper.submit_price(&id, &id, "BTC", dec!(100)).unwrap();
        }
        // Only 20% of power submits ETH.
        for i in 0..2 {
            let id = format!("val-{i}");
            oracle.keeper.submit_price(&id, &id, "ETH", dec!(50)).unwrap();
        }

        oracle.clock.advance(1);
        oracle.keeper.begin_block();
        oracle.keeper.end_block();

        assert!(oracle.keeper.query_price("BTC").unwrap().is_some());
        assert!(oracle.keeper.query_price("ETH").unwrap().is_none());
        assert!(oracle.keeper.query_snapshots("ETH", 0, u64::MAX).unwrap().is_empty());
    }

    // =========================================================================
    // SCENARIO 6: DIVERSITY REJECTION
    // =========================================================================

    #[test]
    fn test_concentrating_registration_refused() {
        let mut oracle = oracle_with_validators(5, 2000);

        // Rewrite the seeded rows: 3x north_america + 1x europe, and no
        // row yet for val-4.
        for (i, region) in [(0, "north_america"), (1, "north_america"), (2, "north_america"), (3, "europe")] {
            let mut row = registry::get_validator_oracle(oracle.store.as_ref(), &format!("val-{i}"))
                .unwrap()
                .unwrap();
            row.region = region.to_string();
            registry::set_validator_oracle(oracle.store.as_ref(), &row).unwrap();
        }
        registry::delete_validator_oracle(oracle.store.as_ref(), "val-4").unwrap();

        let mut params = oracle.keeper.query_params().unwrap();
        params.enforce_runtime_diversity = true;
        oracle.keeper.update_params("gov", params).unwrap();

        let before = oracle.store.export_sorted();
        let err = oracle
            .keeper
            .register_validator_oracle("val-4", "north_america", "10.0.4.1", 64_004)
            .unwrap_err();
        assert!(matches!(err, OracleError::DiversityRefusal { .. }));

        let events = oracle.keeper.drain_events();
        assert!(events
            .iter()
            .any(|e| e.name() == "geographic_concentration_warning"));

        // Existing state unchanged.
        assert_eq!(oracle.store.export_sorted(), before);

        // A diversifying region is accepted instead.
        oracle
            .keeper
            .register_validator_oracle("val-4", "asia", "10.0.4.1", 64_004)
            .unwrap();
    }
}
