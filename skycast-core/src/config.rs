use std::collections::HashMap;
use std::env;

use crate::{error::WeatherError, provider::ProviderId};

/// Connection details for one upstream provider, ready for an adapter to use.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Per-provider entry as loaded from the environment. The api key may be
/// absent here: validation is lazy and only fails for a provider that is
/// actually invoked, since a deployment may route to a single provider.
#[derive(Debug, Clone, Default)]
struct ProviderEntry {
    base_url: Option<String>,
    api_key: Option<String>,
}

/// Read-only map of provider connection configuration.
///
/// Populated once at process start and never mutated afterwards; the service
/// shares it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    entries: HashMap<ProviderId, ProviderEntry>,
    default_provider: ProviderId,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            default_provider: ProviderId::OpenWeatherMap,
        }
    }
}

impl ProviderRegistry {
    /// Environment variable names per provider, matching the deployed system.
    fn env_vars(id: ProviderId) -> (&'static str, &'static str) {
        match id {
            ProviderId::OpenWeatherMap => ("OPENWEATHER_API_KEY", "OPENWEATHER_BASE_URL"),
            ProviderId::WeatherApi => ("WEATHERAPI_KEY", "WEATHERAPI_BASE_URL"),
            ProviderId::VisualCrossing => ("VISUALCROSSING_API_KEY", "VISUALCROSSING_BASE_URL"),
        }
    }

    fn default_base_url(id: ProviderId) -> &'static str {
        match id {
            ProviderId::OpenWeatherMap => "https://api.openweathermap.org/data/2.5",
            ProviderId::WeatherApi => "https://api.weatherapi.com/v1",
            ProviderId::VisualCrossing => {
                "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services"
            }
        }
    }

    /// Build the registry from the process environment.
    ///
    /// Fails fast only on a malformed `DEFAULT_WEATHER_PROVIDER`; missing
    /// credentials are tolerated until the provider is resolved.
    pub fn from_env() -> Result<Self, WeatherError> {
        let mut entries = HashMap::new();
        for id in ProviderId::all() {
            let (key_var, url_var) = Self::env_vars(*id);
            entries.insert(
                *id,
                ProviderEntry {
                    base_url: env::var(url_var).ok().filter(|s| !s.is_empty()),
                    api_key: env::var(key_var).ok().filter(|s| !s.is_empty()),
                },
            );
        }

        let default_provider =
            parse_default_provider(env::var("DEFAULT_WEATHER_PROVIDER").ok().as_deref())?;

        Ok(Self {
            entries,
            default_provider,
        })
    }

    /// Resolve connection configuration for a provider.
    ///
    /// A missing credential is a configuration defect surfaced as
    /// [`WeatherError::MissingCredential`], never a silent fallback.
    pub fn resolve(&self, id: ProviderId) -> Result<ProviderConfig, WeatherError> {
        let entry = self.entries.get(&id).cloned().unwrap_or_default();

        let api_key = entry
            .api_key
            .ok_or(WeatherError::MissingCredential(id))?;

        let base_url = entry
            .base_url
            .unwrap_or_else(|| Self::default_base_url(id).to_string());

        Ok(ProviderConfig { base_url, api_key })
    }

    /// Provider used when the caller supplies no tier and no explicit choice.
    pub fn default_provider(&self) -> ProviderId {
        self.default_provider
    }

    pub fn is_configured(&self, id: ProviderId) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|e| e.api_key.is_some())
    }

    /// Set or replace a provider API key. Intended for construction and tests;
    /// the registry is not mutated after startup.
    pub fn set_api_key(&mut self, id: ProviderId, api_key: impl Into<String>) {
        self.entries.entry(id).or_default().api_key = Some(api_key.into());
    }

    /// Override a provider base URL (e.g. a regional mirror or a test server).
    pub fn set_base_url(&mut self, id: ProviderId, base_url: impl Into<String>) {
        self.entries.entry(id).or_default().base_url = Some(base_url.into());
    }
}

/// Total over present/absent input, strict over present-but-unknown input:
/// an unset default falls back to openweathermap, a malformed one is a
/// startup configuration error.
fn parse_default_provider(raw: Option<&str>) -> Result<ProviderId, WeatherError> {
    match raw {
        None | Some("") => Ok(ProviderId::OpenWeatherMap),
        Some(s) => ProviderId::try_from(s),
    }
}
