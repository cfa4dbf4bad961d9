//! Error handling for the application

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Instrument listing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Network error listing instruments: {0}")]
    Network(String),

    #[error("Instrument listing returned status {0}")]
    Status(u16),

    #[error("Malformed instrument listing: {0}")]
    Malformed(String),

    #[error("Instrument listing timed out after {0:?}")]
    Timeout(Duration),
}

/// Per-instrument fetch errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request returned status {0}")]
    Status(u16),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Price field missing")]
    MissingPrice,

    #[error("Price is not numeric: {0}")]
    NonNumericPrice(String),

    #[error("Price must be positive and finite, got {0}")]
    NonPositivePrice(f64),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Refresh cycle deadline exceeded")]
    DeadlineExceeded,

    #[error("Fetcher shut down")]
    Cancelled,
}

/// Change calculation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChangeError {
    #[error("Degenerate baseline price: {0}")]
    DegenerateBaseline(f64),
}

/// Price window errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WindowError {
    #[error("Sample at {attempted} is older than newest sample at {newest}")]
    OutOfOrder {
        newest: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },
}

/// Errors that escape the refresh loop
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    #[error("Refresh loop panicked: {0}")]
    Panicked(String),

    #[error("Refresh loop aborted")]
    Aborted,
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Scheduler error: {0}")]
    SchedulerError(String),
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::InvalidConfig(msg) => AppError::ConfigError(msg),
            other => AppError::SchedulerError(other.to_string()),
        }
    }
}
