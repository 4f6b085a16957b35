//! Invariant, determinism, and round-trip properties over the keeper.

#[cfg(test)]
mod tests {
    use crate::fixtures::{oracle_with_validators, submit_round};
    use oc_01_state_store::InMemoryStore;
    use oc_02_registry::powers;
    use oc_06_twap::TwapMethod;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use shared_types::{BlockClock, OracleError, OracleEvent};

    // =========================================================================
    // PARAMETER ROUND TRIPS
    // =========================================================================

    #[test]
    fn test_param_update_round_trips_exactly() {
        let mut oracle = oracle_with_validators(4, 2000);

        let mut params = oracle.keeper.query_params().unwrap();
        params.vote_threshold = dec!(0.75);
        params.twap_lookback_window = 500;
        params.max_validators_per_ip = 1;

        oracle.keeper.update_params("gov", params.clone()).unwrap();
        assert_eq!(oracle.keeper.query_params().unwrap(), params);
    }

    #[test]
    fn test_invalid_params_rejected_without_write() {
        let mut oracle = oracle_with_validators(4, 2000);
        let good = oracle.keeper.query_params().unwrap();

        let mut bad = good.clone();
        bad.vote_threshold = dec!(1.5);
        let err = oracle.keeper.update_params("gov", bad).unwrap_err();
        assert!(matches!(err, OracleError::InvalidParam { .. }));
        assert_eq!(oracle.keeper.query_params().unwrap(), good);
    }

    #[test]
    fn test_param_update_is_authority_gated() {
        let mut oracle = oracle_with_validators(4, 2000);
        let params = oracle.keeper.query_params().unwrap();
        let err = oracle.keeper.update_params("mallory", params).unwrap_err();
        assert!(matches!(err, OracleError::UnauthorizedParamUpdate(_)));
    }

    // =========================================================================
    // SUBMISSION IDEMPOTENCE
    // =========================================================================

    #[test]
    fn test_identical_resubmission_leaves_state_unchanged() {
        let mut oracle = oracle_with_validators(10, 2000);

        oracle
            .keeper
            .submit_price("val-1", "val-1", "BTC", dec!(100))
            .unwrap();
        let after_first = oracle.store.export_sorted();

        oracle
            .keeper
            .submit_price("val-1", "val-1", "BTC", dec!(100))
            .unwrap();
        assert_eq!(oracle.store.export_sorted(), after_first);
    }

    // =========================================================================
    // DETERMINISM
    // =========================================================================

    #[test]
    fn test_export_import_export_is_byte_identical() {
        let mut oracle = oracle_with_validators(10, 2000);
        for round in 0..3u64 {
            let prices: Vec<Decimal> = (0..10)
                .map(|_| dec!(100) + Decimal::from(round))
                .collect();
            submit_round(&mut oracle, "BTC", &prices);
            oracle.clock.advance(2);
        }

        let exported = oracle.store.export_sorted();
        let copy = InMemoryStore::new();
        copy.import(exported.clone());
        assert_eq!(copy.export_sorted(), exported);
    }

    #[test]
    fn test_identical_runs_produce_identical_state_and_events() {
        let run = || {
            let mut oracle = oracle_with_validators(10, 2000);
            for asset in ["ATOM", "BTC", "ETH", "OSMO"] {
                for i in 0..10 {
                    let id = format!("val-{i}");
                    oracle
                        .keeper
                        .submit_price(&id, &id, asset, dec!(100))
                        .unwrap();
                }
            }
            oracle.clock.advance(1);
            oracle.keeper.begin_block();
            oracle.keeper.end_block();
            (oracle.store.export_sorted(), oracle.keeper.drain_events())
        };

        let (state_a, events_a) = run();
        let (state_b, events_b) = run();
        assert_eq!(state_a, state_b);
        assert_eq!(events_a, events_b);
    }

    // =========================================================================
    // SNAPSHOT ORDERING & RETENTION
    // =========================================================================

    #[test]
    fn test_snapshots_strictly_ordered_inside_lookback_window() {
        let mut oracle = oracle_with_validators(10, 2000);

        let mut params = oracle.keeper.query_params().unwrap();
        params.twap_lookback_window = 5;
        oracle.keeper.update_params("gov", params).unwrap();

        for _ in 0..10 {
            submit_round(&mut oracle, "BTC", &[dec!(100); 10]);
            oracle.clock.advance(1);
        }

        let height = oracle.clock.height();
        let snapshots = oracle.keeper.query_snapshots("BTC", 0, u64::MAX).unwrap();
        assert!(!snapshots.is_empty());
        for pair in snapshots.windows(2) {
            assert!(pair[0].block_height < pair[1].block_height);
        }
        for snapshot in &snapshots {
            assert!(snapshot.block_height >= height - 5);
            assert!(snapshot.block_height <= height);
        }
    }

    #[test]
    fn test_aggregated_price_positive_and_height_bounded() {
        let mut oracle = oracle_with_validators(10, 2000);
        submit_round(&mut oracle, "BTC", &[dec!(42); 10]);

        let aggregated = oracle.keeper.query_price("BTC").unwrap().unwrap();
        assert!(aggregated.price > Decimal::ZERO);
        assert!(aggregated.block_height <= oracle.clock.height());
    }

    // =========================================================================
    // VOTING-POWER SNAPSHOTS
    // =========================================================================

    #[test]
    fn test_power_snapshot_total_matches_sum() {
        let mut oracle = oracle_with_validators(10, 2009);
        oracle.staking.set_tokens("val-0", 3_000_000);

        // 2010 opens a vote period (2010 % 10 == 0).
        oracle.clock.advance(1);
        oracle.keeper.begin_block();
        oracle.keeper.end_block();

        let snapshot = powers::get_power_snapshot(oracle.store.as_ref(), 201)
            .unwrap()
            .expect("snapshot written at period start");
        assert_eq!(
            snapshot.total_power,
            snapshot.powers.values().sum::<u64>()
        );
        assert_eq!(snapshot.powers["val-0"], 3);

        let events = oracle.keeper.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, OracleEvent::VotingPowerSnapshot { period: 201, .. })));
    }

    // =========================================================================
    // FEEDER DELEGATIONS
    // =========================================================================

    #[test]
    fn test_delegate_never_maps_to_two_validators() {
        let mut oracle = oracle_with_validators(4, 2000);

        oracle.keeper.set_feeder_delegation("val-0", "feeder-a").unwrap();
        let err = oracle
            .keeper
            .set_feeder_delegation("val-1", "feeder-a")
            .unwrap_err();
        assert!(matches!(err, OracleError::DelegateAlreadyBound { .. }));

        // The delegate can now feed for val-0 and only val-0.
        oracle
            .keeper
            .submit_price("feeder-a", "val-0", "BTC", dec!(100))
            .unwrap();
        let err = oracle
            .keeper
            .submit_price("feeder-a", "val-1", "BTC", dec!(100))
            .unwrap_err();
        assert!(matches!(err, OracleError::UnauthorizedFeeder { .. }));
    }

    // =========================================================================
    // MISSED-VOTE WINDOW
    // =========================================================================

    #[test]
    fn test_miss_counters_accumulate_and_window_slashes() {
        let mut oracle = oracle_with_validators(10, 1989);

        let mut params = oracle.keeper.query_params().unwrap();
        params.slash_window = 20;
        params.min_valid_per_window = 1;
        oracle.keeper.update_params("gov", params).unwrap();

        // Establish BTC as a tracked asset.
        submit_round(&mut oracle, "BTC", &[dec!(100); 10]); // aggregates at 1990

        // Nobody submits again; walk the boundaries at 2000, 2010, 2020.
        for _ in 0..3 {
            oracle.clock.advance(10);
            oracle.keeper.begin_block();
            oracle.keeper.end_block();
        }

        // Three missed vote periods, over the budget of 1: everyone was
        // slashed the base fraction at the 2020 window boundary and reset.
        let slashes = oracle.staking.slashes.lock().clone();
        assert_eq!(slashes.len(), 10);
        assert!(slashes.iter().all(|(_, f)| *f == dec!(0.0001)));

        let row = oracle.keeper.query_validator_oracle("val-3").unwrap().unwrap();
        assert_eq!(row.miss_counter, 0);
    }

    // =========================================================================
    // TWAP OVER LIVE STATE
    // =========================================================================

    #[test]
    fn test_twap_queries_over_accumulated_snapshots() {
        let mut oracle = oracle_with_validators(10, 2000);
        for _ in 0..6 {
            submit_round(&mut oracle, "BTC", &[dec!(100); 10]);
            oracle.clock.advance(1);
        }

        let standard = oracle
            .keeper
            .query_twap("BTC", Some(TwapMethod::Standard))
            .unwrap();
        assert_eq!(standard.price, dec!(100));

        let robust = oracle.keeper.query_twap("BTC", None).unwrap();
        assert_eq!(robust.method, TwapMethod::Robust);
        assert_eq!(robust.price, dec!(100));
        assert!(robust.confidence.is_some());

        // No aggregation yet for an unknown asset: queries miss, they do
        // not error out with a breaker or corruption failure.
        assert!(oracle.keeper.query_price("DOGE").unwrap().is_none());
    }
}
