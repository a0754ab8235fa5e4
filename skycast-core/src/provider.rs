use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::ProviderRegistry,
    error::WeatherError,
    model::{ForecastDay, Location, WeatherSnapshot},
    provider::{
        openweather::OpenWeatherMapProvider, visualcrossing::VisualCrossingProvider,
        weatherapi::WeatherApiProvider,
    },
};

pub mod openweather;
pub mod visualcrossing;
pub mod weatherapi;

/// Closed set of upstream weather providers. Anything outside this set is
/// rejected at the boundary; an unrecognized provider can never reach the
/// network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeatherMap,
    WeatherApi,
    VisualCrossing,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeatherMap => "openweathermap",
            ProviderId::WeatherApi => "weatherapi",
            ProviderId::VisualCrossing => "visualcrossing",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[
            ProviderId::OpenWeatherMap,
            ProviderId::WeatherApi,
            ProviderId::VisualCrossing,
        ]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = WeatherError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "openweathermap" => Ok(ProviderId::OpenWeatherMap),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            "visualcrossing" => Ok(ProviderId::VisualCrossing),
            _ => Err(WeatherError::UnknownProvider(value.to_string())),
        }
    }
}

/// Abstraction over one upstream weather API.
///
/// Adapters translate a validated location into a provider-specific request
/// and normalize the response into the canonical shapes. No retries at this
/// layer; the only deadline is the HTTP client's request timeout.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, location: Location) -> Result<WeatherSnapshot, WeatherError>;

    async fn forecast(&self, location: Location) -> Result<Vec<ForecastDay>, WeatherError>;
}

/// Source of adapters for the orchestrator. Injected so tests can substitute
/// fakes without touching process-wide state.
pub trait SelectProvider: Send + Sync {
    fn select(&self, id: ProviderId) -> Result<Arc<dyn WeatherProvider>, WeatherError>;
}

impl SelectProvider for ProviderRegistry {
    fn select(&self, id: ProviderId) -> Result<Arc<dyn WeatherProvider>, WeatherError> {
        let config = self.resolve(id)?;

        let provider: Arc<dyn WeatherProvider> = match id {
            ProviderId::OpenWeatherMap => Arc::new(OpenWeatherMapProvider::new(config)),
            ProviderId::WeatherApi => Arc::new(WeatherApiProvider::new(config)),
            ProviderId::VisualCrossing => Arc::new(VisualCrossingProvider::new(config)),
        };

        Ok(provider)
    }
}

/// Fixed bound on every outbound provider call. An elapsed timeout is an
/// adapter failure, not a hang.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Single GET against an upstream, mapped into the error taxonomy:
/// network/timeout and non-2xx become [`WeatherError::ProviderUnavailable`],
/// an unparseable body becomes [`WeatherError::ProviderResponse`].
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    http: &Client,
    provider: ProviderId,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, WeatherError> {
    let res = http
        .get(url)
        .query(query)
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await
        .map_err(|e| WeatherError::ProviderUnavailable {
            provider,
            detail: e.to_string(),
        })?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| WeatherError::ProviderUnavailable {
            provider,
            detail: e.to_string(),
        })?;

    if !status.is_success() {
        return Err(WeatherError::ProviderUnavailable {
            provider,
            detail: format!("status {}: {}", status, truncate_body(&body)),
        });
    }

    serde_json::from_str(&body).map_err(|e| WeatherError::ProviderResponse {
        provider,
        detail: format!("invalid JSON: {e}"),
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    // Upstream error bodies are arbitrary text; back off to a char boundary
    // so the cut never lands inside a multi-byte character.
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
