use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::env;
use std::sync::Arc;
use tracing::warn;

use skycast_core::{
    CacheStore, Location, NoOpCache, ProviderId, ProviderRegistry, RedisCache, WeatherService,
    route_tier,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Weather data layer CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Latitude in [-90, 90].
    #[arg(long)]
    lat: f64,

    /// Longitude in [-180, 180].
    #[arg(long)]
    lon: f64,

    /// Subscription tier (free, premium, upgrade). Unknown values route as
    /// free.
    #[arg(long)]
    tier: Option<String>,

    /// Explicit provider id, bypassing tier routing. Unlike --tier this is
    /// strict: a typo is an error, not a silent default.
    #[arg(long, conflicts_with = "tier")]
    provider: Option<String>,
}

impl LookupArgs {
    /// Provider precedence: explicit --provider, then tier routing, then the
    /// deployment default (`DEFAULT_WEATHER_PROVIDER`).
    fn resolve_provider(&self, default: ProviderId) -> Result<ProviderId> {
        if let Some(raw) = self.provider.as_deref() {
            return ProviderId::try_from(raw).map_err(Into::into);
        }
        Ok(match self.tier.as_deref() {
            Some(tier) => route_tier(Some(tier)),
            None => default,
        })
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show current conditions for a coordinate pair.
    Current(LookupArgs),

    /// Show the daily forecast (up to 7 days) for a coordinate pair.
    Forecast(LookupArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let registry = ProviderRegistry::from_env()?;
        let default_provider = registry.default_provider();
        let cache = cache_from_env().await;
        let service = WeatherService::new(cache, Arc::new(registry));

        match self.command {
            Command::Current(args) => {
                let location = Location::new(args.lat, args.lon)?;
                let provider = args.resolve_provider(default_provider)?;
                let snapshot = service.current(location, provider).await?;
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            Command::Forecast(args) => {
                let location = Location::new(args.lat, args.lon)?;
                let provider = args.resolve_provider(default_provider)?;
                let days = service.forecast(location, provider).await?;
                println!("{}", serde_json::to_string_pretty(&days)?);
            }
        }

        Ok(())
    }
}

/// Connect the Redis store when `REDIS_URL` is set. A missing or unreachable
/// cache is never fatal: lookups just go to the live providers every time.
async fn cache_from_env() -> Arc<dyn CacheStore> {
    match env::var("REDIS_URL") {
        Ok(url) if !url.is_empty() => match RedisCache::connect(&url).await {
            Ok(cache) => Arc::new(cache),
            Err(err) => {
                warn!(%err, "could not connect to redis, running without a cache");
                Arc::new(NoOpCache)
            }
        },
        _ => Arc::new(NoOpCache),
    }
}
