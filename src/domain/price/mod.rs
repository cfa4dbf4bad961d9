//! Price domain - rolling price windows and change analysis

mod price_analyzer;
mod price_feed;
mod price_window;
mod tracker_state;

pub use price_analyzer::PriceAnalyzer;
pub use price_feed::{InstrumentSource, ListedInstrument, LogoSource, PriceQuote, PriceSource, QuotedPrice};
pub use price_window::TimeWindowBuffer;
pub use tracker_state::{InstrumentSnapshot, RefreshStatus, TrackerState, UpdateSummary};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Change between the oldest and newest sample of a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChange {
    pub baseline_time: DateTime<Utc>,
    pub baseline_price: f64,
    pub current_time: DateTime<Utc>,
    pub current_price: f64,
    pub change_percentage: f64,
}
