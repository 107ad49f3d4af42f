// =============================================================================
// Indicator Engine — demo runner
// =============================================================================
//
// Reads a JSON array of bars, computes one indicator through the coordinator
// and prints the resulting series as JSON on stdout.
// =============================================================================

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use indicator_engine::config::{parse_params, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use indicator_engine::{Bar, Coordinator, EngineConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    // Loaded before the subscriber exists so its filter can apply; the
    // outcome is logged once logging is up.
    let loaded = EngineConfig::load(&config_path);
    let log_filter = loaded
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| EngineConfig::default().log_filter);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = loaded.unwrap_or_else(|e| {
        warn!(path = %config_path, error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });

    if let Ok(path) = std::env::var("INDICATOR_BARS") {
        config.bars_path = path;
    }
    if let Ok(name) = std::env::var("INDICATOR_NAME") {
        config.indicator = name.trim().to_string();
    }
    if let Ok(raw) = std::env::var("INDICATOR_PARAMS") {
        config.params = parse_params(&raw).context("INDICATOR_PARAMS")?;
    }

    // ── 2. Bars ──────────────────────────────────────────────────────────
    let content = std::fs::read_to_string(&config.bars_path)
        .with_context(|| format!("failed to read bars from {}", config.bars_path))?;
    let bars: Vec<Bar> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse bars from {}", config.bars_path))?;
    info!(path = %config.bars_path, bars = bars.len(), "bar history loaded");

    // ── 3. Compute ───────────────────────────────────────────────────────
    let coordinator = Coordinator::spawn(&config)?;
    let series = coordinator
        .compute(&config.indicator, &config.params, &bars)
        .await
        .with_context(|| format!("indicator `{}` failed", config.indicator))?;

    info!(
        indicator = %config.indicator,
        params = ?config.params,
        records = series.len(),
        transfers = coordinator.transfers(),
        "indicator computed"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(series.as_ref()).context("failed to serialise series")?
    );

    coordinator.shutdown().await;
    Ok(())
}
