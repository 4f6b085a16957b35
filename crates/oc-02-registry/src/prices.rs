//! Aggregated prices and the TWAP snapshot series.

use oc_01_state_store::{codec, keys, KvRead, KvStore};
use shared_types::{AggregatedPrice, OracleResult, PriceSnapshot};
use std::collections::BTreeSet;

pub fn get_aggregated_price<S: KvRead>(
    store: &S,
    asset: &str,
) -> OracleResult<Option<AggregatedPrice>> {
    match store.get(&keys::aggregated_price(asset))? {
        Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
        None => Ok(None),
    }
}

pub fn set_aggregated_price<S: KvStore>(store: &S, price: &AggregatedPrice) -> OracleResult<()> {
    store.set(keys::aggregated_price(&price.asset), codec::encode(price)?)
}

/// Assets that currently have an aggregated price, ascending.
pub fn tracked_assets<S: KvRead>(store: &S) -> OracleResult<BTreeSet<String>> {
    let mut assets = BTreeSet::new();
    for (key, _) in store.prefix_scan(&keys::aggregated_price_prefix())? {
        assets.insert(keys::parse_aggregated_price(&key)?);
    }
    Ok(assets)
}

pub fn append_snapshot<S: KvStore>(store: &S, snapshot: &PriceSnapshot) -> OracleResult<()> {
    store.set(
        keys::price_snapshot(&snapshot.asset, snapshot.block_height),
        codec::encode(snapshot)?,
    )
}

/// All snapshots for an asset, ascending by height.
pub fn snapshots_for<S: KvRead>(store: &S, asset: &str) -> OracleResult<Vec<PriceSnapshot>> {
    store
        .prefix_scan(&keys::price_snapshot_prefix(asset))?
        .iter()
        .map(|(_, v)| codec::decode(v))
        .collect()
}

/// Snapshots for an asset within `[from_height, to_height]`, ascending.
pub fn snapshots_in_range<S: KvRead>(
    store: &S,
    asset: &str,
    from_height: u64,
    to_height: u64,
) -> OracleResult<Vec<PriceSnapshot>> {
    Ok(snapshots_for(store, asset)?
        .into_iter()
        .filter(|s| s.block_height >= from_height && s.block_height <= to_height)
        .collect())
}

/// Delete snapshots strictly below `cutoff_height`. Returns the count.
pub fn prune_snapshots_before<S: KvStore>(
    store: &S,
    asset: &str,
    cutoff_height: u64,
) -> OracleResult<u64> {
    let mut deleted = 0;
    for (key, _) in store.prefix_scan(&keys::price_snapshot_prefix(asset))? {
        let (_, height) = keys::parse_price_snapshot(&key)?;
        if height < cutoff_height {
            store.delete(&key)?;
            deleted += 1;
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oc_01_state_store::InMemoryStore;
    use rust_decimal_macros::dec;

    fn snapshot(asset: &str, height: u64) -> PriceSnapshot {
        PriceSnapshot {
            asset: asset.to_string(),
            price: dec!(100),
            block_height: height,
            block_time: height * 6,
        }
    }

    #[test]
    fn test_aggregated_price_replacement() {
        let store = InMemoryStore::new();
        let mut price = AggregatedPrice {
            asset: "BTC".to_string(),
            price: dec!(100),
            block_height: 10,
            block_time: 60,
            contributors: 9,
        };
        set_aggregated_price(&store, &price).unwrap();

        price.price = dec!(101);
        price.block_height = 11;
        set_aggregated_price(&store, &price).unwrap();

        let read = get_aggregated_price(&store, "BTC").unwrap().unwrap();
        assert_eq!(read.price, dec!(101));
        assert_eq!(read.block_height, 11);
    }

    #[test]
    fn test_tracked_assets_sorted() {
        let store = InMemoryStore::new();
        for asset in ["ETH", "ATOM", "BTC"] {
            set_aggregated_price(
                &store,
                &AggregatedPrice {
                    asset: asset.to_string(),
                    price: dec!(1),
                    block_height: 1,
                    block_time: 6,
                    contributors: 1,
                },
            )
            .unwrap();
        }
        let assets: Vec<_> = tracked_assets(&store).unwrap().into_iter().collect();
        assert_eq!(assets, vec!["ATOM", "BTC", "ETH"]);
    }

    #[test]
    fn test_snapshots_ascending_and_pruned() {
        let store = InMemoryStore::new();
        for height in [30, 10, 20, 40] {
            append_snapshot(&store, &snapshot("BTC", height)).unwrap();
        }

        let all = snapshots_for(&store, "BTC").unwrap();
        let heights: Vec<_> = all.iter().map(|s| s.block_height).collect();
        assert_eq!(heights, vec![10, 20, 30, 40]);

        assert_eq!(prune_snapshots_before(&store, "BTC", 25).unwrap(), 2);
        let heights: Vec<_> = snapshots_for(&store, "BTC")
            .unwrap()
            .iter()
            .map(|s| s.block_height)
            .collect();
        assert_eq!(heights, vec![30, 40]);
    }

    #[test]
    fn test_range_query() {
        let store = InMemoryStore::new();
        for height in 1..=5 {
            append_snapshot(&store, &snapshot("BTC", height)).unwrap();
        }
        let ranged = snapshots_in_range(&store, "BTC", 2, 4).unwrap();
        assert_eq!(ranged.len(), 3);
        assert_eq!(ranged[0].block_height, 2);
        assert_eq!(ranged[2].block_height, 4);
    }
}
