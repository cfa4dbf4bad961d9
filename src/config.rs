use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use cointrack::infrastructure::api_clients::coinbase_client::DEFAULT_COINBASE_URL;
use cointrack::infrastructure::api_clients::coingecko_client::DEFAULT_COINGECKO_URL;

pub const DEFAULT_USER_AGENT: &str = concat!("cointrack/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerCfg {
    pub window_secs: u64,
    pub refresh_interval_secs: u64,
    pub max_concurrent_fetches: usize,
    pub max_buffer_samples: usize,
    pub settlement_currency: String,
    pub catalog_cache_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
    pub cycle_timeout_secs: u64,
    pub fetch_logos: bool,
}

impl Default for TrackerCfg {
    fn default() -> Self {
        Self {
            window_secs: 300,
            refresh_interval_secs: 30,
            max_concurrent_fetches: 10,
            max_buffer_samples: 100,
            settlement_currency: "USD".to_string(),
            catalog_cache_ttl_secs: 300,
            fetch_timeout_secs: 10,
            cycle_timeout_secs: 25,
            fetch_logos: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesCfg {
    pub coinbase_url: String,
    pub coingecko_url: String,
    pub user_agent: String,
}

impl Default for SourcesCfg {
    fn default() -> Self {
        Self {
            coinbase_url: DEFAULT_COINBASE_URL.to_string(),
            coingecko_url: DEFAULT_COINGECKO_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayCfg {
    pub max_displayed_instruments: usize,
    pub report_interval_secs: u64,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            max_displayed_instruments: 10,
            report_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerCfg,
    pub sources: SourcesCfg,
    pub display: DisplayCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parse Config.toml")?;
        Ok(cfg)
    }
}
