/// Name Cache - In-process TTL cache for ENS name resolutions
use crate::{error::ProofResult, identity::Address, metrics};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Default TTL for resolved names (10 minutes)
pub const DEFAULT_NAME_TTL: Duration = Duration::from_secs(600);

/// Cached name resolution
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    address: Address,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Name cache manager
///
/// Keys are lowercased names. Expired entries are never served; they are
/// replaced on the next successful lookup or dropped by `sweep_expired`.
#[derive(Clone)]
pub struct NameCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl Default for NameCache {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_TTL)
    }
}

impl NameCache {
    /// Create a new name cache
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get cached address if still fresh
    pub async fn get(&self, name: &str) -> Option<Address> {
        let key = name.to_lowercase();
        let entries = self.entries.read().await;

        entries
            .get(&key)
            .filter(|entry| entry.is_fresh(Instant::now()))
            .map(|entry| entry.address)
    }

    /// Cache a resolution, overwriting any previous entry
    pub async fn insert(&self, name: &str, address: Address) {
        let entry = CacheEntry {
            address,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(name.to_lowercase(), entry);
    }

    /// Return the cached address or resolve and cache it
    ///
    /// `resolver` receives the lowercased name and only runs on a miss or an
    /// expired entry. Its failures are propagated unchanged and never cached.
    /// The lock is not held while `resolver` runs, so concurrent misses for
    /// one name may each resolve.
    pub async fn resolve_cached<F, Fut>(&self, name: &str, resolver: F) -> ProofResult<Address>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ProofResult<Address>>,
    {
        if let Some(address) = self.get(name).await {
            metrics::record_cache_access(true);
            return Ok(address);
        }
        metrics::record_cache_access(false);

        let address = resolver(name.to_lowercase()).await?;
        self.insert(name, address).await;

        Ok(address)
    }

    /// Remove expired entries, returning how many were dropped
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
