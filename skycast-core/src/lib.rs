//! Core library for the skycast weather data access layer.
//!
//! This crate defines:
//! - Provider registry & credentials handling
//! - Adapters normalizing three upstream weather APIs into one schema
//! - Subscription-tier to provider routing
//! - Cache-aside orchestration over a pluggable cache store
//!
//! The HTTP layer that fronts this crate lives elsewhere; callers hand in
//! `(lat, lon, tier)` and get canonical structures or a typed error back.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod service;
pub mod tier;

pub use cache::{CacheStore, MemoryCache, NoOpCache, RedisCache};
pub use config::{ProviderConfig, ProviderRegistry};
pub use error::{CacheError, WeatherError};
pub use model::{ForecastDay, Location, RequestKind, WeatherSnapshot};
pub use provider::{ProviderId, SelectProvider, WeatherProvider};
pub use service::WeatherService;
pub use tier::{SubscriptionTier, route_tier};
