//! Mid-tier provider: WeatherAPI.com.
//!
//! The upstream reports wind in km/h, converted to m/s at this boundary.
//! Forecast days arrive pre-aggregated in `forecast.forecastday`.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    config::ProviderConfig,
    error::WeatherError,
    model::{ForecastDay, Location, MAX_FORECAST_DAYS, WeatherSnapshot},
    provider::{ProviderId, WeatherProvider, fetch_json},
};

const ID: ProviderId = ProviderId::WeatherApi;

const KMH_PER_MPS: f64 = 3.6;

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    config: ProviderConfig,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn current(&self, location: Location) -> Result<WeatherSnapshot, WeatherError> {
        let url = format!("{}/current.json", self.config.base_url);
        let q = format!("{},{}", location.lat(), location.lon());

        let parsed: WaCurrentResponse = fetch_json(
            &self.http,
            ID,
            &url,
            &[("key", self.config.api_key.as_str()), ("q", q.as_str())],
        )
        .await?;

        Ok(normalize_current(parsed))
    }

    async fn forecast(&self, location: Location) -> Result<Vec<ForecastDay>, WeatherError> {
        let url = format!("{}/forecast.json", self.config.base_url);
        let q = format!("{},{}", location.lat(), location.lon());

        let parsed: WaForecastResponse = fetch_json(
            &self.http,
            ID,
            &url,
            &[
                ("key", self.config.api_key.as_str()),
                ("q", q.as_str()),
                ("days", "7"),
            ],
        )
        .await?;

        normalize_forecast(parsed)
    }
}

// ---------------------------------------------------------------------------
// Upstream payload shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: u8,
    pressure_mb: f64,
    wind_kph: f64,
    #[serde(default)]
    wind_degree: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaCurrentResponse {
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    maxtemp_c: f64,
    mintemp_c: f64,
    avghumidity: f64,
    totalprecip_mm: f64,
    maxwind_kph: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: String,
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    forecast: WaForecast,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn normalize_current(parsed: WaCurrentResponse) -> WeatherSnapshot {
    let current = parsed.current;
    WeatherSnapshot {
        temperature: current.temp_c,
        feels_like: current.feelslike_c,
        humidity: current.humidity,
        pressure: current.pressure_mb,
        wind_speed: current.wind_kph / KMH_PER_MPS,
        wind_direction: (current.wind_degree.round() as i64).rem_euclid(360) as u16,
        description: current.condition.text,
        icon: current.condition.icon,
        timestamp: Utc::now(),
    }
}

fn normalize_forecast(parsed: WaForecastResponse) -> Result<Vec<ForecastDay>, WeatherError> {
    parsed
        .forecast
        .forecastday
        .into_iter()
        .take(MAX_FORECAST_DAYS)
        .map(|entry| {
            let date = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d").map_err(|_| {
                WeatherError::ProviderResponse {
                    provider: ID,
                    detail: format!("unparseable forecast date '{}'", entry.date),
                }
            })?;

            Ok(ForecastDay {
                date,
                temp_max: entry.day.maxtemp_c,
                temp_min: entry.day.mintemp_c,
                humidity: entry.day.avghumidity.clamp(0.0, 100.0).round() as u8,
                precipitation: entry.day.totalprecip_mm,
                wind_speed: entry.day.maxwind_kph / KMH_PER_MPS,
                description: entry.day.condition.text,
                icon: entry.day.condition.icon,
            })
        })
        .collect()
}
