// src/report.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use cointrack::domain::price::{InstrumentSnapshot, PriceAnalyzer, RefreshStatus, TrackerState};
use cointrack::shared::types::Sample;
use cointrack::shared::utils::{base_symbol, format_percentage, format_price};

pub const WAITING_MESSAGE: &str = "Waiting for price data to accumulate...";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerReport {
    pub generated_at: DateTime<Utc>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub successful_cycles: u64,
    pub tracked_instruments: usize,
    pub window_secs: u64,
    pub movers: Vec<MoverRow>,
    pub series: Vec<PriceSeries>,
}

/// One row of the movers table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoverRow {
    pub instrument_id: String,
    pub symbol: String,
    pub logo_url: String,
    pub baseline_price: f64,
    pub current_price: f64,
    pub change_percentage: f64,
    pub last_update: DateTime<Utc>,
    pub link: String,
}

/// Chart data for one instrument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub instrument_id: String,
    pub points: Vec<Sample>,
}

impl TrackerReport {
    pub async fn from_state(state: &TrackerState, top: usize) -> Self {
        let status = state.refresh_status().await;
        let snapshots = state.snapshot_all().await;
        let logos = state.logos().await;
        Self::build(status, snapshots, &logos, state.window().as_secs(), top)
    }

    /// Rank instruments by absolute change and keep the top `top`
    pub fn build(
        status: RefreshStatus,
        snapshots: Vec<InstrumentSnapshot>,
        logos: &HashMap<String, String>,
        window_secs: u64,
        top: usize,
    ) -> Self {
        let tracked_instruments = snapshots.len();
        let mut ranked: Vec<(MoverRow, Vec<Sample>)> = Vec::with_capacity(snapshots.len());

        for snapshot in snapshots {
            let change = match PriceAnalyzer::compute_change(&snapshot.samples) {
                Ok(Some(change)) => change,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping {} in report: {}", snapshot.instrument_id, e);
                    continue;
                }
            };

            let symbol = base_symbol(&snapshot.instrument_id).to_string();
            let row = MoverRow {
                logo_url: logos.get(&symbol).cloned().unwrap_or_default(),
                link: format!("https://www.coinbase.com/price/{}", symbol.to_lowercase()),
                instrument_id: snapshot.instrument_id,
                symbol,
                baseline_price: change.baseline_price,
                current_price: change.current_price,
                change_percentage: change.change_percentage,
                last_update: change.current_time,
            };
            ranked.push((row, snapshot.samples));
        }

        ranked.sort_by(|(a, _), (b, _)| {
            b.change_percentage
                .abs()
                .total_cmp(&a.change_percentage.abs())
                .then_with(|| a.instrument_id.cmp(&b.instrument_id))
        });
        ranked.truncate(top);

        let (movers, series) = ranked
            .into_iter()
            .map(|(row, points)| {
                let series = PriceSeries {
                    instrument_id: row.instrument_id.clone(),
                    points,
                };
                (row, series)
            })
            .unzip();

        Self {
            generated_at: Utc::now(),
            last_refresh: status.last_refresh,
            successful_cycles: status.successful_cycles,
            tracked_instruments,
            window_secs,
            movers,
            series,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.movers.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for TrackerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_refresh {
            Some(at) => writeln!(
                f,
                "Top movers over {}s | {} instruments | last refresh {}",
                self.window_secs,
                self.tracked_instruments,
                at.format("%H:%M:%S UTC")
            )?,
            None => writeln!(f, "Top movers over {}s | no refresh yet", self.window_secs)?,
        }

        if self.movers.is_empty() {
            return writeln!(f, "{}", WAITING_MESSAGE);
        }

        writeln!(
            f,
            "{:<12} {:>14} {:>14} {:>10} {:>10}  {}",
            "Instrument", "Baseline", "Current", "Change", "Updated", "Link"
        )?;
        for row in &self.movers {
            writeln!(
                f,
                "{:<12} {:>14} {:>14} {:>10} {:>10}  {}",
                row.instrument_id,
                format_price(row.baseline_price),
                format_price(row.current_price),
                format_percentage(row.change_percentage),
                row.last_update.format("%H:%M:%S").to_string(),
                row.link
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn snapshot(id: &str, prices: &[f64]) -> InstrumentSnapshot {
        InstrumentSnapshot {
            instrument_id: id.to_string(),
            samples: prices
                .iter()
                .enumerate()
                .map(|(i, p)| Sample::new(at(i as i64 * 30), *p))
                .collect(),
        }
    }

    fn status() -> RefreshStatus {
        RefreshStatus {
            last_refresh: Some(at(60)),
            successful_cycles: 3,
        }
    }

    #[test]
    fn test_movers_sorted_by_absolute_change() {
        let snapshots = vec![
            snapshot("BTC-USD", &[100.0, 101.0]),
            snapshot("ETH-USD", &[100.0, 80.0]),
            snapshot("SOL-USD", &[100.0, 110.0]),
        ];

        let report = TrackerReport::build(status(), snapshots, &HashMap::new(), 300, 10);

        let order: Vec<&str> = report.movers.iter().map(|m| m.instrument_id.as_str()).collect();
        assert_eq!(order, vec!["ETH-USD", "SOL-USD", "BTC-USD"]);
        assert!((report.movers[0].change_percentage + 20.0).abs() < 1e-9);
        assert_eq!(report.series[0].instrument_id, "ETH-USD");
        assert_eq!(report.tracked_instruments, 3);
    }

    #[test]
    fn test_top_limit_and_links() {
        let snapshots = vec![
            snapshot("BTC-USD", &[100.0, 105.0]),
            snapshot("ETH-USD", &[100.0, 101.0]),
        ];
        let mut logos = HashMap::new();
        logos.insert("BTC".to_string(), "https://img/btc.png".to_string());

        let report = TrackerReport::build(status(), snapshots, &logos, 300, 1);

        assert_eq!(report.movers.len(), 1);
        let row = &report.movers[0];
        assert_eq!(row.symbol, "BTC");
        assert_eq!(row.logo_url, "https://img/btc.png");
        assert_eq!(row.link, "https://www.coinbase.com/price/btc");
        assert_eq!(row.last_update, at(30));
    }

    #[test]
    fn test_degenerate_baseline_skipped() {
        let snapshots = vec![snapshot("ZERO-USD", &[0.0, 1.0]), snapshot("BTC-USD", &[100.0])];

        let report = TrackerReport::build(status(), snapshots, &HashMap::new(), 300, 10);

        assert_eq!(report.movers.len(), 1);
        assert_eq!(report.movers[0].instrument_id, "BTC-USD");
        assert_eq!(report.movers[0].change_percentage, 0.0);
    }

    #[test]
    fn test_empty_report_shows_waiting_message() {
        let report = TrackerReport::build(RefreshStatus::default(), vec![], &HashMap::new(), 300, 10);

        assert!(report.is_empty());
        assert!(report.to_string().contains(WAITING_MESSAGE));
    }

    #[test]
    fn test_table_and_json_rendering() {
        let report = TrackerReport::build(
            status(),
            vec![snapshot("SOL-USD", &[100.0, 110.0])],
            &HashMap::new(),
            300,
            10,
        );

        let table = report.to_string();
        assert!(table.contains("SOL-USD"));
        assert!(table.contains("$100.00"));
        assert!(table.contains("$110.00"));
        assert!(table.contains("10.00%"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["movers"][0]["symbol"], "SOL");
        assert_eq!(json["series"][0]["points"].as_array().unwrap().len(), 2);
    }
}
