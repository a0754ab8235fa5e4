//! Baseline provider: OpenWeatherMap.
//!
//! Current conditions come from `/weather`; forecasts from `/forecast`,
//! which returns 3-hourly samples that have to be rolled up into calendar
//! days here. With `units=metric` the upstream already reports wind in m/s,
//! so no unit conversion is needed.

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

const ID: ProviderId = ProviderId::OpenWeatherMap;

#[derive(Debug, Clone)]
pub struct OpenWeatherMapProvider {
    config: ProviderConfig,
    http: Client,
}

impl OpenWeatherMapProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapProvider {
    async fn current(&self, location: Location) -> Result<WeatherSnapshot, WeatherError> {
        let url = format!("{}/weather", self.config.base_url);
        let lat = location.lat().to_string();
        let lon = location.lon().to_string();

        let parsed: OwCurrentResponse = fetch_json(
            &self.http,
            ID,
            &url,
            &[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.config.api_key.as_str()),
                ("units", "metric"),
            ],
        )
        .await?;

        normalize_current(parsed)
    }

    async fn forecast(&self, location: Location) -> Result<Vec<ForecastDay>, WeatherError> {
        let url = format!("{}/forecast", self.config.base_url);
        let lat = location.lat().to_string();
        let lon = location.lon().to_string();

        let parsed: OwForecastResponse = fetch_json(
            &self.http,
            ID,
            &url,
            &[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.config.api_key.as_str()),
                ("units", "metric"),
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
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwRain {
    #[serde(rename = "3h", default)]
    three_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    /// Sample timestamp as `YYYY-MM-DD HH:MM:SS`; the date portion is the
    /// day-grouping key, taken verbatim (no timezone normalization).
    dt_txt: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    rain: Option<OwRain>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn normalize_current(parsed: OwCurrentResponse) -> Result<WeatherSnapshot, WeatherError> {
    let condition = parsed
        .weather
        .first()
        .ok_or_else(|| WeatherError::ProviderResponse {
            provider: ID,
            detail: "empty weather condition array".to_string(),
        })?;

    Ok(WeatherSnapshot {
        temperature: parsed.main.temp,
        feels_like: parsed.main.feels_like,
        humidity: parsed.main.humidity,
        pressure: parsed.main.pressure,
        wind_speed: parsed.wind.speed,
        wind_direction: wind_degrees(parsed.wind.deg),
        description: condition.description.clone(),
        icon: condition.icon.clone(),
        timestamp: Utc::now(),
    })
}

/// Roll 3-hourly samples up into at most [`MAX_FORECAST_DAYS`] calendar days.
///
/// Aggregation policy (kept bug-for-bug compatible with existing consumers):
/// max/min temperature across the day's samples, precipitation summed,
/// humidity/wind/condition taken from the day's first sample, not averaged.
fn normalize_forecast(parsed: OwForecastResponse) -> Result<Vec<ForecastDay>, WeatherError> {
    let mut grouped: Vec<(&str, Vec<&OwForecastEntry>)> = Vec::new();
    for entry in &parsed.list {
        let date = entry
            .dt_txt
            .split_whitespace()
            .next()
            .ok_or_else(|| WeatherError::ProviderResponse {
                provider: ID,
                detail: format!("malformed forecast timestamp '{}'", entry.dt_txt),
            })?;

        match grouped.iter_mut().find(|(d, _)| *d == date) {
            Some((_, samples)) => samples.push(entry),
            None => grouped.push((date, vec![entry])),
        }
    }
    grouped.truncate(MAX_FORECAST_DAYS);

    let mut days = Vec::with_capacity(grouped.len());
    for (date, samples) in grouped {
        let first = samples.first().ok_or_else(|| WeatherError::ProviderResponse {
            provider: ID,
            detail: "empty forecast day group".to_string(),
        })?;

        let condition = first
            .weather
            .first()
            .ok_or_else(|| WeatherError::ProviderResponse {
                provider: ID,
                detail: "empty weather condition array".to_string(),
            })?;

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            WeatherError::ProviderResponse {
                provider: ID,
                detail: format!("unparseable forecast date '{date}'"),
            }
        })?;

        let temp_max = samples.iter().map(|s| s.main.temp).fold(f64::MIN, f64::max);
        let temp_min = samples.iter().map(|s| s.main.temp).fold(f64::MAX, f64::min);
        let precipitation = samples
            .iter()
            .filter_map(|s| s.rain.as_ref().and_then(|r| r.three_hour))
            .sum();

        days.push(ForecastDay {
            date,
            temp_max,
            temp_min,
            humidity: first.main.humidity,
            precipitation,
            wind_speed: first.wind.speed,
            description: condition.description.clone(),
            icon: condition.icon.clone(),
        });
    }

    Ok(days)
}

fn wind_degrees(deg: f64) -> u16 {
    (deg.round() as i64).rem_euclid(360) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(dt_txt: &str, temp: f64, humidity: u8, wind: f64, rain_3h: Option<f64>) -> String {
        format!(
            r#"{{
                "dt_txt": "{dt_txt}",
                "main": {{"temp": {temp}, "feels_like": {temp}, "humidity": {humidity}, "pressure": 1011.0}},
                "weather": [{{"description": "light rain", "icon": "10d"}}],
                "wind": {{"speed": {wind}, "deg": 180}},
                "rain": {}
            }}"#,
            match rain_3h {
                Some(mm) => format!(r#"{{"3h": {mm}}}"#),
                None => "null".to_string(),
            }
        )
    }

    fn forecast_fixture(samples: &[String]) -> OwForecastResponse {
        let json = format!(r#"{{"list": [{}]}}"#, samples.join(","));
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn current_normalizes_canonical_fields() {
        let json = r#"{
            "main": {"temp": 18.2, "feels_like": 17.5, "humidity": 64, "pressure": 1013.0},
            "weather": [{"description": "scattered clouds", "icon": "03d"}],
            "wind": {"speed": 4.2, "deg": 231.4}
        }"#;
        let parsed: OwCurrentResponse = serde_json::from_str(json).unwrap();
        let snap = normalize_current(parsed).unwrap();

        assert_eq!(snap.temperature, 18.2);
        assert_eq!(snap.humidity, 64);
        assert_eq!(snap.pressure, 1013.0);
        // OpenWeatherMap already reports m/s with units=metric.
        assert_eq!(snap.wind_speed, 4.2);
        assert_eq!(snap.wind_direction, 231);
        assert_eq!(snap.description, "scattered clouds");
        assert_eq!(snap.icon, "03d");
    }

    #[test]
    fn current_with_empty_weather_array_is_a_payload_error() {
        let json = r#"{
            "main": {"temp": 18.2, "feels_like": 17.5, "humidity": 64, "pressure": 1013.0},
            "weather": [],
            "wind": {"speed": 4.2, "deg": 231.4}
        }"#;
        let parsed: OwCurrentResponse = serde_json::from_str(json).unwrap();
        let err = normalize_current(parsed).unwrap_err();
        assert!(matches!(err, WeatherError::ProviderResponse { .. }));
    }

    #[test]
    fn forecast_aggregates_a_day_from_its_samples() {
        let parsed = forecast_fixture(&[
            sample("2026-09-01 06:00:00", 18.0, 80, 2.0, Some(1.5)),
            sample("2026-09-01 12:00:00", 25.0, 55, 5.0, Some(0.5)),
            sample("2026-09-01 18:00:00", 15.0, 70, 3.0, None),
        ]);
        let days = normalize_forecast(parsed).unwrap();
        assert_eq!(days.len(), 1);

        let day = &days[0];
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());
        assert_eq!(day.temp_max, 25.0);
        assert_eq!(day.temp_min, 15.0);
        // First-sample convention, not an average.
        assert_eq!(day.humidity, 80);
        assert_eq!(day.wind_speed, 2.0);
        assert_eq!(day.precipitation, 2.0);
    }

    #[test]
    fn forecast_truncates_to_seven_days_in_encounter_order() {
        let samples: Vec<String> = (1..=10)
            .map(|d| sample(&format!("2026-09-{d:02} 12:00:00"), 20.0, 50, 3.0, None))
            .collect();
        let days = normalize_forecast(forecast_fixture(&samples)).unwrap();

        assert_eq!(days.len(), 7);
        for (i, day) in days.iter().enumerate() {
            assert_eq!(day.date, NaiveDate::from_ymd_opt(2026, 9, i as u32 + 1).unwrap());
        }
        assert!(days.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn forecast_sums_precipitation_treating_missing_rain_as_zero() {
        let parsed = forecast_fixture(&[
            sample("2026-09-01 00:00:00", 20.0, 50, 3.0, None),
            sample("2026-09-01 03:00:00", 20.0, 50, 3.0, Some(2.25)),
            sample("2026-09-01 06:00:00", 20.0, 50, 3.0, Some(0.75)),
        ]);
        let days = normalize_forecast(parsed).unwrap();
        assert_eq!(days[0].precipitation, 3.0);
    }

    #[test]
    fn wind_degrees_wraps_into_0_359() {
        assert_eq!(wind_degrees(0.0), 0);
        assert_eq!(wind_degrees(359.6), 0);
        assert_eq!(wind_degrees(231.4), 231);
        assert_eq!(wind_degrees(-90.0), 270);
    }
}
