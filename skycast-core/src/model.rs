use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// A validated (latitude, longitude) pair. Constructing one is the only way
/// coordinates enter the data layer, so out-of-range input is rejected
/// before any cache or network activity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    lat: f64,
    lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Result<Self, WeatherError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(WeatherError::InvalidLocation { lat, lon });
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

/// What a caller is asking for; drives the cache key prefix and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Current,
    Forecast,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Current => "current",
            RequestKind::Forecast => "forecast",
        }
    }
}

/// A point-in-time observation, normalized across providers.
///
/// Wind speed is always m/s and temperatures °C regardless of what the
/// upstream returns. Immutable once constructed: created on fetch, cached,
/// discarded on expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub pressure: f64,
    pub wind_speed: f64,
    pub wind_direction: u16,
    pub description: String,
    pub icon: String,
    pub timestamp: DateTime<Utc>,
}

/// One day of a forecast. A forecast response is at most 7 of these,
/// ordered by ascending date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temp_max: f64,
    pub temp_min: f64,
    pub humidity: u8,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub description: String,
    pub icon: String,
}

/// Maximum number of days a normalized forecast may contain; upstreams
/// returning more are truncated at the adapter boundary.
pub const MAX_FORECAST_DAYS: usize = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_accepts_valid_range() {
        assert!(Location::new(-90.0, -180.0).is_ok());
        assert!(Location::new(90.0, 180.0).is_ok());
        assert!(Location::new(48.85, 2.35).is_ok());
    }

    #[test]
    fn location_rejects_out_of_range() {
        let err = Location::new(91.0, 0.0).unwrap_err();
        assert!(matches!(err, WeatherError::InvalidLocation { .. }));
        assert!(err.is_client_error());

        assert!(Location::new(0.0, 180.1).is_err());
        assert!(Location::new(-90.5, 0.0).is_err());
    }

    #[test]
    fn snapshot_json_roundtrip_preserves_structure() {
        let snap = WeatherSnapshot {
            temperature: 21.4,
            feels_like: 20.9,
            humidity: 55,
            pressure: 1013.2,
            wind_speed: 3.1,
            wind_direction: 270,
            description: "scattered clouds".into(),
            icon: "03d".into(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: WeatherSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
    }
}
