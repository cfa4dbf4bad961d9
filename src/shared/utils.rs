//! Utility functions and helpers

/// Base asset of a pair id (`BTC` for `BTC-USD`)
pub fn base_symbol(instrument_id: &str) -> &str {
    instrument_id.split('-').next().unwrap_or(instrument_id)
}

/// Calculate percentage change
pub fn calculate_percentage_change(old_value: f64, new_value: f64) -> f64 {
    ((new_value - old_value) / old_value) * 100.0
}

/// Format a price in the settlement currency with two decimals
pub fn format_price(value: f64) -> String {
    format!("${:.2}", value)
}

/// Format a signed percentage with two decimals
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value)
}
