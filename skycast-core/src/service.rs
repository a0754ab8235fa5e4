//! Cache-aside orchestration over the provider adapters.
//!
//! The cache is purely an optimization: every path that can return data
//! from cache can return the same data by falling through to the live
//! adapter, and cache failures never become caller-visible failures.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    cache::{CURRENT_TTL, CacheStore, FORECAST_TTL, cache_key},
    error::WeatherError,
    model::{ForecastDay, Location, RequestKind, WeatherSnapshot},
    provider::{ProviderId, SelectProvider},
    tier::route_tier,
};

/// Stateless entry point for weather lookups. Safe for unbounded concurrent
/// use: per-call state only, shared collaborators behind `Arc`. Concurrent
/// misses for the same key may each fetch and write; last write wins and the
/// results are interchangeable.
pub struct WeatherService {
    cache: Arc<dyn CacheStore>,
    providers: Arc<dyn SelectProvider>,
}

impl WeatherService {
    /// Both collaborators are injected explicitly so tests can substitute
    /// fakes without touching process-wide state.
    pub fn new(cache: Arc<dyn CacheStore>, providers: Arc<dyn SelectProvider>) -> Self {
        Self { cache, providers }
    }

    /// Current conditions for a raw coordinate pair, routed by subscription
    /// tier (absent/unknown tier routes as `free`).
    pub async fn get_current_weather(
        &self,
        lat: f64,
        lon: f64,
        tier: Option<&str>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let location = Location::new(lat, lon)?;
        self.current(location, route_tier(tier)).await
    }

    /// Daily forecast (up to 7 days) for a raw coordinate pair, tier-routed.
    pub async fn get_forecast(
        &self,
        lat: f64,
        lon: f64,
        tier: Option<&str>,
    ) -> Result<Vec<ForecastDay>, WeatherError> {
        let location = Location::new(lat, lon)?;
        self.forecast(location, route_tier(tier)).await
    }

    /// Current conditions from an explicitly chosen provider.
    pub async fn current(
        &self,
        location: Location,
        provider: ProviderId,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let key = cache_key(RequestKind::Current, location, provider);
        self.cache_aside(key, CURRENT_TTL, || async move {
            self.providers.select(provider)?.current(location).await
        })
        .await
    }

    /// Forecast from an explicitly chosen provider.
    pub async fn forecast(
        &self,
        location: Location,
        provider: ProviderId,
    ) -> Result<Vec<ForecastDay>, WeatherError> {
        let key = cache_key(RequestKind::Forecast, location, provider);
        self.cache_aside(key, FORECAST_TTL, || async move {
            self.providers.select(provider)?.forecast(location).await
        })
        .await
    }

    /// The cache-aside sequence shared by both request kinds.
    ///
    /// A hit that decodes cleanly is returned without touching the network.
    /// A miss, a failed read, and an undecodable entry all degrade to the
    /// live fetch. Adapter errors propagate unchanged and are never cached;
    /// a failed write is logged and swallowed because the already-computed
    /// result is valid regardless of caching outcome.
    async fn cache_aside<T, F, Fut>(
        &self,
        key: String,
        ttl: Duration,
        fetch: F,
    ) -> Result<T, WeatherError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, WeatherError>>,
    {
        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(err) => warn!(key = %key, %err, "discarding undecodable cache entry"),
            },
            Ok(None) => debug!(key = %key, "cache miss"),
            Err(err) => warn!(key = %key, %err, "cache read failed, falling through to live fetch"),
        }

        let value = fetch().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(err) = self.cache.set_with_expiry(&key, &raw, ttl).await {
                    warn!(key = %key, %err, "cache write failed; serving live result");
                }
            }
            Err(err) => warn!(key = %key, %err, "could not serialize result for caching"),
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::CacheError;
    use crate::provider::WeatherProvider;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: 21.0,
            feels_like: 20.0,
            humidity: 50,
            pressure: 1012.0,
            wind_speed: 4.0,
            wind_direction: 180,
            description: "clear sky".into(),
            icon: "01d".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap(),
        }
    }

    fn forecast_days() -> Vec<ForecastDay> {
        vec![ForecastDay {
            date: chrono::NaiveDate::from_ymd_opt(2026, 9, 2).unwrap(),
            temp_max: 25.0,
            temp_min: 14.0,
            humidity: 60,
            precipitation: 0.0,
            wind_speed: 3.5,
            description: "clear sky".into(),
            icon: "01d".into(),
        }]
    }

    #[derive(Debug, Default)]
    struct FakeProvider {
        current_calls: AtomicUsize,
        forecast_calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn current(&self, _location: Location) -> Result<WeatherSnapshot, WeatherError> {
            self.current_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(WeatherError::ProviderUnavailable {
                    provider: ProviderId::OpenWeatherMap,
                    detail: "connection refused".into(),
                });
            }
            Ok(snapshot())
        }

        async fn forecast(&self, _location: Location) -> Result<Vec<ForecastDay>, WeatherError> {
            self.forecast_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(WeatherError::ProviderUnavailable {
                    provider: ProviderId::OpenWeatherMap,
                    detail: "connection refused".into(),
                });
            }
            Ok(forecast_days())
        }
    }

    struct FakeSelector {
        provider: Arc<FakeProvider>,
        requested: Mutex<Vec<ProviderId>>,
    }

    impl FakeSelector {
        fn new(provider: Arc<FakeProvider>) -> Arc<Self> {
            Arc::new(Self {
                provider,
                requested: Mutex::new(Vec::new()),
            })
        }
    }

    impl SelectProvider for FakeSelector {
        fn select(&self, id: ProviderId) -> Result<Arc<dyn WeatherProvider>, WeatherError> {
            self.requested.lock().unwrap().push(id);
            Ok(self.provider.clone())
        }
    }

    /// Delegates to a memory cache while recording every write's key and TTL.
    #[derive(Default)]
    struct RecordingCache {
        inner: MemoryCache,
        gets: AtomicUsize,
        writes: Mutex<Vec<(String, Duration)>>,
    }

    #[async_trait]
    impl CacheStore for RecordingCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }

        async fn set_with_expiry(
            &self,
            key: &str,
            value: &str,
            ttl: Duration,
        ) -> Result<(), CacheError> {
            self.writes.lock().unwrap().push((key.to_string(), ttl));
            self.inner.set_with_expiry(key, value, ttl).await
        }
    }

    /// Every operation fails, as if the store were down.
    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("connection reset".into()))
        }

        async fn set_with_expiry(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection reset".into()))
        }
    }

    fn service_with(cache: Arc<dyn CacheStore>) -> (WeatherService, Arc<FakeProvider>) {
        let provider = Arc::new(FakeProvider::default());
        let selector = FakeSelector::new(provider.clone());
        (WeatherService::new(cache, selector), provider)
    }

    #[tokio::test]
    async fn miss_fetches_live_then_serves_from_cache() {
        let (service, provider) = service_with(Arc::new(MemoryCache::new()));

        let first = service.get_current_weather(48.85, 2.35, None).await.unwrap();
        assert_eq!(first, snapshot());
        assert_eq!(provider.current_calls.load(Ordering::SeqCst), 1);

        // Second call is the fast path: no adapter invocation.
        let second = service.get_current_weather(48.85, 2.35, None).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(provider.current_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn prepopulated_cache_returns_identical_structure_without_fetching() {
        let cache = Arc::new(MemoryCache::new());
        let location = Location::new(48.85, 2.35).unwrap();
        let key = cache_key(RequestKind::Current, location, ProviderId::OpenWeatherMap);
        cache
            .set_with_expiry(&key, &serde_json::to_string(&snapshot()).unwrap(), CURRENT_TTL)
            .await
            .unwrap();

        let (service, provider) = service_with(cache);
        let result = service.get_current_weather(48.85, 2.35, None).await.unwrap();

        assert_eq!(result, snapshot());
        assert_eq!(provider.current_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn broken_cache_degrades_to_live_fetch() {
        let (service, provider) = service_with(Arc::new(BrokenCache));

        let current = service.get_current_weather(48.85, 2.35, None).await.unwrap();
        assert_eq!(current, snapshot());

        let forecast = service.get_forecast(48.85, 2.35, None).await.unwrap();
        assert_eq!(forecast, forecast_days());
        assert_eq!(provider.current_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.forecast_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undecodable_cache_entry_falls_through_to_live_fetch() {
        let cache = Arc::new(MemoryCache::new());
        let location = Location::new(48.85, 2.35).unwrap();
        let key = cache_key(RequestKind::Current, location, ProviderId::OpenWeatherMap);
        cache
            .set_with_expiry(&key, "not json at all", CURRENT_TTL)
            .await
            .unwrap();

        let (service, provider) = service_with(cache);
        let result = service.get_current_weather(48.85, 2.35, None).await.unwrap();

        assert_eq!(result, snapshot());
        assert_eq!(provider.current_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn current_and_forecast_use_kind_specific_expiry() {
        let cache = Arc::new(RecordingCache::default());
        let (service, _) = service_with(cache.clone());

        service.get_current_weather(10.0, 20.0, None).await.unwrap();
        service.get_forecast(10.0, 20.0, None).await.unwrap();

        let writes = cache.writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert!(writes[0].0.starts_with("weather:current:"));
        assert_eq!(writes[0].1, Duration::from_secs(600));
        assert!(writes[1].0.starts_with("weather:forecast:"));
        assert_eq!(writes[1].1, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn invalid_location_fails_before_any_collaborator_call() {
        let cache = Arc::new(RecordingCache::default());
        let provider = Arc::new(FakeProvider::default());
        let selector = FakeSelector::new(provider.clone());
        let service = WeatherService::new(cache.clone(), selector.clone());

        let err = service.get_current_weather(91.0, 0.0, None).await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidLocation { .. }));

        assert_eq!(cache.gets.load(Ordering::SeqCst), 0);
        assert!(cache.writes.lock().unwrap().is_empty());
        assert!(selector.requested.lock().unwrap().is_empty());
        assert_eq!(provider.current_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn adapter_failure_propagates_and_is_not_cached() {
        let cache = Arc::new(RecordingCache::default());
        let provider = Arc::new(FakeProvider {
            fail: true,
            ..Default::default()
        });
        let service = WeatherService::new(cache.clone(), FakeSelector::new(provider));

        let err = service.get_current_weather(48.85, 2.35, None).await.unwrap_err();
        assert!(matches!(err, WeatherError::ProviderUnavailable { .. }));
        assert!(cache.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tier_routes_to_the_entitled_provider() {
        let provider = Arc::new(FakeProvider::default());
        let selector = FakeSelector::new(provider);
        let service = WeatherService::new(Arc::new(MemoryCache::new()), selector.clone());

        service.get_current_weather(0.0, 0.0, Some("upgrade")).await.unwrap();
        service.get_current_weather(0.0, 0.0, Some("premium")).await.unwrap();
        service.get_current_weather(0.0, 0.0, Some("bogus")).await.unwrap();

        let requested = selector.requested.lock().unwrap();
        assert_eq!(
            *requested,
            vec![
                ProviderId::VisualCrossing,
                ProviderId::WeatherApi,
                ProviderId::OpenWeatherMap,
            ]
        );
    }
}
