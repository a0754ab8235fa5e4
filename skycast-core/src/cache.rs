//! Cache store abstraction and backends.
//!
//! The store keeps serialized canonical structures under composite keys and
//! enforces expiry itself; the data layer never tracks timestamps of its own.
//! Entries are replaced wholesale or left to expire, never partially updated.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::{
    error::CacheError,
    model::{Location, RequestKind},
    provider::ProviderId,
};

/// Expiry for current-weather entries.
pub const CURRENT_TTL: Duration = Duration::from_secs(600);
/// Expiry for forecast entries.
pub const FORECAST_TTL: Duration = Duration::from_secs(3600);

/// Composite key for one cached response, e.g.
/// `weather:current:48.85:2.35:openweathermap`. The format matches the
/// deployed system so entries are shareable across instances.
pub fn cache_key(kind: RequestKind, location: Location, provider: ProviderId) -> String {
    format!(
        "weather:{}:{}:{}:{}",
        kind.as_str(),
        location.lat(),
        location.lon(),
        provider
    )
}

/// Minimal contract the orchestrator needs from a cache backend.
///
/// Implementations must be safe for unbounded concurrent use. Callers treat
/// every error as a miss; a broken store degrades latency, never correctness.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError>;
}

/// Redis-backed store. `ConnectionManager` reconnects on its own, so a
/// transient outage surfaces as per-call errors rather than a wedged client.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let () = conn.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }
}

/// In-process TTL map for tests and cache-less development runs.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let expired = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, expires_at)) if Instant::now() < *expires_at => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            self.entries.write().await.remove(key);
        }
        Ok(None)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }
}

/// Always-miss, always-succeed store for deployments that run without a
/// cache. Keeps the orchestrator's code path uniform.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpCache;

#[async_trait]
impl CacheStore for NoOpCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set_with_expiry(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Ok(())
    }
}
