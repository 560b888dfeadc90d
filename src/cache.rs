// src/cache.rs

//! Best-effort memoisation of calculation results
//!
//! Results are keyed by a fingerprint of the request fields that influence
//! the output. The cache is advisory: the engine logs and ignores every cache
//! error, and concurrent writers for the same key simply overwrite each other.

use crate::error::{Error, Result};
use crate::scaling::CalculationResult;
use crate::units::Unit;
use lru::LruCache;
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Prefix of every fingerprint; bump when the key layout changes
pub const FINGERPRINT_PREFIX: &str = "calc:v1:";

/// Default time-to-live of a cached result
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(1800);

/// Canonical cache key of a calculation request
///
/// SHA-256 over a JSON object with sorted keys, so the key does not depend
/// on field order or on how the unit was spelled by the caller.
pub fn fingerprint(
    product_id: &str,
    target_quantity: f64,
    target_unit: Unit,
    include_hierarchy: bool,
    max_depth: u32,
    precision: u32,
) -> String {
    let mut fields: BTreeMap<&str, serde_json::Value> = BTreeMap::new();
    fields.insert("include_hierarchy", include_hierarchy.into());
    fields.insert("max_depth", max_depth.into());
    fields.insert("precision", precision.into());
    fields.insert("product_id", product_id.into());
    fields.insert("schema", 1.into());
    fields.insert("target_quantity", target_quantity.into());
    fields.insert("target_unit", target_unit.as_str().into());

    // A map of plain JSON values always serializes
    let canonical = serde_json::to_string(&fields).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{FINGERPRINT_PREFIX}{}", hex::encode(digest))
}

/// Counters reported by a cache
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Storage for calculation results
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CalculationResult>>;

    fn put(&self, key: &str, result: &CalculationResult, ttl: Duration) -> Result<()>;

    /// Drop every entry whose result involves `product_id`, either as the
    /// target or as an ingredient. Returns the number of entries removed.
    fn invalidate_product(&self, product_id: &str) -> Result<usize>;

    /// Drop every entry. Returns the number of entries removed.
    fn clear(&self) -> Result<usize>;

    fn stats(&self) -> CacheStats;
}

/// Cache used when result caching is disabled
#[derive(Debug, Default)]
pub struct NoopCache;

impl ResultCache for NoopCache {
    fn get(&self, _key: &str) -> Result<Option<CalculationResult>> {
        Ok(None)
    }

    fn put(&self, _key: &str, _result: &CalculationResult, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    fn invalidate_product(&self, _product_id: &str) -> Result<usize> {
        Ok(0)
    }

    fn clear(&self) -> Result<usize> {
        Ok(0)
    }

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

struct Entry {
    /// JSON-encoded result, as a networked cache would hold it
    payload: String,
    products: HashSet<String>,
    expires_at: Instant,
}

/// In-process cache with TTL expiry and least-recently-used eviction
pub struct MemoryResultCache {
    entries: RwLock<LruCache<String, Entry>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryResultCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            capacity: capacity.get(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ResultCache for MemoryResultCache {
    fn get(&self, key: &str) -> Result<Option<CalculationResult>> {
        let payload = {
            // LruCache::get updates recency, so it needs the write lock
            let mut entries = self.entries.write();
            let now = Instant::now();
            match entries
                .get(key)
                .map(|entry| (entry.expires_at > now).then(|| entry.payload.clone()))
            {
                Some(Some(payload)) => Some(payload),
                Some(None) => {
                    entries.pop(key);
                    None
                }
                None => None,
            }
        };

        let Some(payload) = payload else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let result = serde_json::from_str(&payload)
            .map_err(|e| Error::CacheError(format!("Corrupt cache entry {key}: {e}")))?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(result))
    }

    fn put(&self, key: &str, result: &CalculationResult, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Ok(());
        }

        let payload = serde_json::to_string(result)
            .map_err(|e| Error::CacheError(format!("Failed to encode result: {e}")))?;
        let entry = Entry {
            payload,
            products: result
                .involved_products()
                .into_iter()
                .map(str::to_string)
                .collect(),
            expires_at: Instant::now() + ttl,
        };

        // push returns the replaced entry for an existing key, or the
        // evicted least-recently-used entry when full
        if let Some((evicted, _)) = self.entries.write().push(key.to_string(), entry)
            && evicted != key
        {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("Evicted cache entry {}", evicted);
        }
        Ok(())
    }

    fn invalidate_product(&self, product_id: &str) -> Result<usize> {
        let mut entries = self.entries.write();
        let stale: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.products.contains(product_id))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        Ok(stale.len())
    }

    fn clear(&self) -> Result<usize> {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: true,
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
