use thiserror::Error;

use crate::provider::ProviderId;

/// Failures surfaced to callers of the weather data layer.
///
/// Cache-layer failures are deliberately absent: the cache is a pure
/// optimization and its errors never leave the service (see [`CacheError`]).
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Latitude/longitude out of range. Client error, never retried.
    #[error("invalid location: lat {lat} must be in [-90, 90], lon {lon} in [-180, 180]")]
    InvalidLocation { lat: f64, lon: f64 },

    /// A provider name outside the closed set. Configuration defect.
    #[error("unknown weather provider '{0}'; supported: openweathermap, weatherapi, visualcrossing")]
    UnknownProvider(String),

    /// A provider was invoked without a configured credential.
    /// Configuration defect, validated lazily per provider.
    #[error("no API key configured for provider '{0}'")]
    MissingCredential(ProviderId),

    /// Upstream payload was missing expected fields or had an unexpected shape.
    #[error("{provider} returned an unexpected payload: {detail}")]
    ProviderResponse { provider: ProviderId, detail: String },

    /// Network failure or timeout talking to an upstream.
    #[error("{provider} is unavailable: {detail}")]
    ProviderUnavailable { provider: ProviderId, detail: String },
}

impl WeatherError {
    /// True when the failure was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, WeatherError::InvalidLocation { .. })
    }
}

/// Failures from the cache store. Absorbed by the orchestrator: a broken
/// cache degrades to a live fetch, it never fails a request.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}
