//! # GeoIP Region Cache (TTL'd LRU)
//!
//! The only long-lived mutable structure shared across block transactions.
//! Lookups resolve through the external provider and cache the result,
//! bounded by capacity and a block-time TTL; expired entries are swept on
//! the begin-block cadence.
//!
//! Negative results are cached too, so an unknown address does not hit the
//! provider every block.

use lru::LruCache;
use parking_lot::RwLock;
use shared_types::ports::GeoIpProvider;
use std::num::NonZeroUsize;

/// Cache slots.
pub const GEOIP_CACHE_CAPACITY: usize = 1000;

/// Entry lifetime in seconds of block time.
pub const GEOIP_CACHE_TTL_SECS: u64 = 3600;

#[derive(Clone, Debug)]
struct CachedRegion {
    region: Option<String>,
    cached_at: u64,
}

/// Read-through region cache over any [`GeoIpProvider`].
pub struct CachedGeoIp<G: GeoIpProvider> {
    inner: G,
    cache: RwLock<LruCache<String, CachedRegion>>,
    ttl_secs: u64,
}

impl<G: GeoIpProvider> CachedGeoIp<G> {
    pub fn new(inner: G) -> Self {
        Self::with_capacity(inner, GEOIP_CACHE_CAPACITY, GEOIP_CACHE_TTL_SECS)
    }

    pub fn with_capacity(inner: G, capacity: usize, ttl_secs: u64) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: RwLock::new(LruCache::new(cap)),
            ttl_secs,
        }
    }

    /// Resolve a region at block time `now`, consulting the cache first.
    pub fn resolve(&self, ip: &str, now: u64) -> Option<String> {
        {
            let mut cache = self.cache.write();
            if let Some(entry) = cache.get(ip) {
                if now.saturating_sub(entry.cached_at) <= self.ttl_secs {
                    return entry.region.clone();
                }
                cache.pop(ip);
            }
        }

        let region = self.inner.region(ip);
        self.cache.write().put(
            ip.to_string(),
            CachedRegion {
                region: region.clone(),
                cached_at: now,
            },
        );
        region
    }

    /// Sweep entries past the TTL. Returns the number evicted.
    pub fn prune_expired(&self, now: u64) -> usize {
        let mut cache = self.cache.write();
        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| now.saturating_sub(entry.cached_at) > self.ttl_secs)
            .map(|(ip, _)| ip.clone())
            .collect();
        for ip in &expired {
            cache.pop(ip);
        }
        expired.len()
    }

    pub fn stats(&self) -> GeoIpCacheStats {
        let cache = self.cache.read();
        GeoIpCacheStats {
            entries: cache.len(),
            capacity: cache.cap().get(),
        }
    }
}

/// Cache statistics for monitoring.
#[derive(Clone, Debug)]
pub struct GeoIpCacheStats {
    pub entries: usize,
    pub capacity: usize,
}
