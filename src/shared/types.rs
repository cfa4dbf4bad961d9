//! Common types used across the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::shared::errors::AppError;
use crate::shared::utils::base_symbol;

/// Tradable pair, e.g. `BTC-USD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub quote_currency: String,
}

impl Instrument {
    pub fn new(id: impl Into<String>, quote_currency: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            quote_currency: quote_currency.into(),
        }
    }

    /// Base asset symbol (`BTC` for `BTC-USD`)
    pub fn base_symbol(&self) -> &str {
        base_symbol(&self.id)
    }
}

/// Single price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }

    /// Sample stamped with the current wall-clock time
    pub fn now(price: f64) -> Self {
        Self::new(Utc::now(), price)
    }
}

/// Tracker configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub window: Duration,
    pub refresh_interval: Duration,
    pub max_concurrent_fetches: usize,
    pub max_buffer_samples: usize,
    pub settlement_currency: String,
    pub catalog_cache_ttl: Duration,
    pub fetch_timeout: Duration,
    pub cycle_timeout: Duration,
    pub max_displayed_instruments: usize,
    pub fetch_logos: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(300),
            refresh_interval: Duration::from_secs(30),
            max_concurrent_fetches: 10,
            max_buffer_samples: 100,
            settlement_currency: "USD".to_string(),
            catalog_cache_ttl: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(10),
            cycle_timeout: Duration::from_secs(25),
            max_displayed_instruments: 10,
            fetch_logos: true,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.window.is_zero() {
            return Err(AppError::ConfigError("window must be greater than zero".to_string()));
        }
        if self.refresh_interval.is_zero() {
            return Err(AppError::ConfigError(
                "refresh interval must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(AppError::ConfigError(
                "max concurrent fetches must be at least 1".to_string(),
            ));
        }
        if self.max_buffer_samples == 0 {
            return Err(AppError::ConfigError(
                "max buffer samples must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() || self.cycle_timeout.is_zero() {
            return Err(AppError::ConfigError("timeouts must be greater than zero".to_string()));
        }
        if self.settlement_currency.trim().is_empty() {
            return Err(AppError::ConfigError("settlement currency is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window, Duration::from_secs(300));
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.max_concurrent_fetches, 10);
        assert_eq!(config.max_buffer_samples, 100);
        assert_eq!(config.settlement_currency, "USD");
        assert_eq!(config.max_displayed_instruments, 10);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = TrackerConfig {
            refresh_interval: Duration::ZERO,
            ..TrackerConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_instrument_base_symbol() {
        let instrument = Instrument::new("ETH-USD", "USD");
        assert_eq!(instrument.base_symbol(), "ETH");
    }
}
