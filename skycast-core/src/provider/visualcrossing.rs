//! Premium provider: Visual Crossing Timeline API.
//!
//! Both request kinds hit the same `/timeline/{lat},{lon}/{range}` endpoint
//! with different range segments (`today` / `next7days`). The metric unit
//! group reports wind in km/h, converted to m/s here.

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

const ID: ProviderId = ProviderId::VisualCrossing;

const KMH_PER_MPS: f64 = 3.6;

#[derive(Debug, Clone)]
pub struct VisualCrossingProvider {
    config: ProviderConfig,
    http: Client,
}

impl VisualCrossingProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn timeline_url(&self, location: Location, range: &str) -> String {
        format!(
            "{}/timeline/{},{}/{range}",
            self.config.base_url,
            location.lat(),
            location.lon()
        )
    }
}

#[async_trait]
impl WeatherProvider for VisualCrossingProvider {
    async fn current(&self, location: Location) -> Result<WeatherSnapshot, WeatherError> {
        let url = self.timeline_url(location, "today");

        let parsed: VcCurrentResponse = fetch_json(
            &self.http,
            ID,
            &url,
            &[
                ("key", self.config.api_key.as_str()),
                ("unitGroup", "metric"),
            ],
        )
        .await?;

        normalize_current(parsed)
    }

    async fn forecast(&self, location: Location) -> Result<Vec<ForecastDay>, WeatherError> {
        let url = self.timeline_url(location, "next7days");

        let parsed: VcForecastResponse = fetch_json(
            &self.http,
            ID,
            &url,
            &[
                ("key", self.config.api_key.as_str()),
                ("unitGroup", "metric"),
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
struct VcConditions {
    temp: f64,
    feelslike: f64,
    humidity: f64,
    pressure: f64,
    windspeed: f64,
    #[serde(default)]
    winddir: f64,
    conditions: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct VcCurrentResponse {
    #[serde(rename = "currentConditions")]
    current_conditions: Option<VcConditions>,
}

#[derive(Debug, Deserialize)]
struct VcDay {
    datetime: String,
    tempmax: f64,
    tempmin: f64,
    humidity: f64,
    #[serde(default)]
    precip: Option<f64>,
    windspeed: f64,
    conditions: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct VcForecastResponse {
    #[serde(default)]
    days: Vec<VcDay>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn normalize_current(parsed: VcCurrentResponse) -> Result<WeatherSnapshot, WeatherError> {
    let current = parsed
        .current_conditions
        .ok_or_else(|| WeatherError::ProviderResponse {
            provider: ID,
            detail: "missing currentConditions".to_string(),
        })?;

    Ok(WeatherSnapshot {
        temperature: current.temp,
        feels_like: current.feelslike,
        humidity: current.humidity.clamp(0.0, 100.0).round() as u8,
        pressure: current.pressure,
        wind_speed: current.windspeed / KMH_PER_MPS,
        wind_direction: (current.winddir.round() as i64).rem_euclid(360) as u16,
        description: current.conditions,
        icon: current.icon,
        timestamp: Utc::now(),
    })
}

fn normalize_forecast(parsed: VcForecastResponse) -> Result<Vec<ForecastDay>, WeatherError> {
    if parsed.days.is_empty() {
        return Err(WeatherError::ProviderResponse {
            provider: ID,
            detail: "timeline response contained no days".to_string(),
        });
    }

    parsed
        .days
        .into_iter()
        .take(MAX_FORECAST_DAYS)
        .map(|day| {
            let date = NaiveDate::parse_from_str(&day.datetime, "%Y-%m-%d").map_err(|_| {
                WeatherError::ProviderResponse {
                    provider: ID,
                    detail: format!("unparseable forecast date '{}'", day.datetime),
                }
            })?;

            Ok(ForecastDay {
                date,
                temp_max: day.tempmax,
                temp_min: day.tempmin,
                humidity: day.humidity.clamp(0.0, 100.0).round() as u8,
                precipitation: day.precip.unwrap_or(0.0),
                wind_speed: day.windspeed / KMH_PER_MPS,
                description: day.conditions,
                icon: day.icon,
            })
        })
        .collect()
}
