//! Configuration management for Inferdash
//!
//! Loads from optional config files + environment variables via .env

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Inference API base URL (no trailing slash required)
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Backtest window length used when the trigger input is unparsable
    pub default_backtest_days: u32,
    /// History lookback (days) forwarded to `/infer` for plotting
    pub lookback_hist_plot: u32,
    /// Display frame cadence for resize coalescing, in milliseconds
    pub frame_interval_ms: u64,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // API defaults
            .set_default("api.base_url", "http://127.0.0.1:8000")?
            .set_default("api.timeout_ms", 30_000)?
            // Dashboard defaults
            .set_default("dashboard.default_backtest_days", 60)?
            .set_default("dashboard.lookback_hist_plot", 120)?
            .set_default("dashboard.frame_interval_ms", 16)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (INFERDASH_*)
            .add_source(Environment::with_prefix("INFERDASH").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Generate a digest of the config for startup logging
    pub fn digest(&self) -> String {
        format!(
            "base_url={} timeout_ms={} backtest_days={} lookback={}",
            self.api.base_url,
            self.api.timeout_ms,
            self.dashboard.default_backtest_days,
            self.dashboard.lookback_hist_plot
        )
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("api.base_url must not be empty");
        }
        if self.dashboard.default_backtest_days == 0 {
            anyhow::bail!("dashboard.default_backtest_days must be positive");
        }
        Ok(())
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
