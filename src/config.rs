// =============================================================================
// Engine Configuration — JSON file with serde defaults and env overrides
// =============================================================================
//
// Every field carries a serde default, so an empty or partial file still
// loads. The demo runner applies INDICATOR_* environment overrides on top.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const CONFIG_PATH_ENV: &str = "INDICATOR_ENGINE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "indicator_engine.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_backend_thread_name() -> String {
    "indicator-backend".to_string()
}

fn default_slow_compute_warn_ms() -> u64 {
    250
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_bars_path() -> String {
    "bars.json".to_string()
}

fn default_indicator() -> String {
    "ma".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name given to the backend OS thread.
    #[serde(default = "default_backend_thread_name")]
    pub backend_thread_name: String,

    /// Computations taking at least this long are logged at `warn`.
    #[serde(default = "default_slow_compute_warn_ms")]
    pub slow_compute_warn_ms: u64,

    /// Filter used when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    // --- Demo runner ---------------------------------------------------------

    /// JSON array of bars to compute over.
    #[serde(default = "default_bars_path")]
    pub bars_path: String,

    #[serde(default = "default_indicator")]
    pub indicator: String,

    #[serde(default)]
    pub params: Vec<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend_thread_name: default_backend_thread_name(),
            slow_compute_warn_ms: default_slow_compute_warn_ms(),
            log_filter: default_log_filter(),
            bars_path: default_bars_path(),
            indicator: default_indicator(),
            params: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            backend_thread = %config.backend_thread_name,
            slow_compute_warn_ms = config.slow_compute_warn_ms,
            "engine config loaded"
        );

        Ok(config)
    }
}

/// Parse a comma-separated parameter list such as `"12, 26, 9"`.
pub fn parse_params(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("invalid indicator parameter `{s}`"))
        })
        .collect()
}
