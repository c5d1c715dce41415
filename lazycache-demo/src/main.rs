//! LAZYCACHE Demo Entry Point
//!
//! Registers the sample model factory, reads the cached models back and
//! prints their names.

mod models;

use lazycache_core::{args, CacheError, RegistryConfig};
use lazycache_registry::CacheRegistry;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::models::{create_models, CacheModel};

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to init subscriber: {0}")]
    Telemetry(String),
}

/// Install the global subscriber. `LAZYCACHE_LOG_JSON=true` switches to JSON lines.
fn init_tracing() -> Result<(), DemoError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lazycache_registry=debug,info"));

    let json = std::env::var("LAZYCACHE_LOG_JSON")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    result.map_err(|e| DemoError::Telemetry(e.to_string()))
}

fn main() -> Result<(), DemoError> {
    init_tracing()?;

    let count = std::env::var("LAZYCACHE_DEMO_COUNT")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(6);

    let registry = CacheRegistry::with_config(RegistryConfig::from_env())?;
    registry.register_ordered::<CacheModel, _>(create_models(), args![count])?;

    let models = registry.get::<CacheModel>()?;
    let names: Vec<&str> = models.iter().map(|model| model.name.as_str()).collect();
    println!("{}", names.join("、"));

    let stats = registry.stats();
    tracing::info!(
        registered = stats.registered,
        producer_invocations = stats.producer_invocations,
        "Demo finished"
    );
    Ok(())
}
