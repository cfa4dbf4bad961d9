//! Cointrack - crypto price tracker
//! Rolling per-instrument price windows refreshed concurrently on a fixed period

pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod shared;

// Re-export main types for convenience
pub use application::{PriceFetcher, RefreshScheduler, SchedulerHandle};
pub use domain::catalog::InstrumentCatalog;
pub use domain::price::{PriceAnalyzer, TimeWindowBuffer, TrackerState};
pub use shared::types::{Instrument, Sample, TrackerConfig};
