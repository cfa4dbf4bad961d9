//! Price change calculations over a window snapshot

use crate::shared::errors::ChangeError;
use crate::shared::types::Sample;
use crate::shared::utils::calculate_percentage_change;

use super::PriceChange;

/// Derives window change metrics from buffer snapshots
pub struct PriceAnalyzer;

impl PriceAnalyzer {
    /// Change from the oldest to the newest sample.
    ///
    /// `Ok(None)` means the snapshot holds no data yet.
    pub fn compute_change(samples: &[Sample]) -> Result<Option<PriceChange>, ChangeError> {
        let (baseline, current) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(None),
        };

        if !baseline.price.is_finite() || baseline.price <= 0.0 {
            return Err(ChangeError::DegenerateBaseline(baseline.price));
        }

        let change_percentage = if samples.len() == 1 {
            0.0
        } else {
            calculate_percentage_change(baseline.price, current.price)
        };

        Ok(Some(PriceChange {
            baseline_time: baseline.timestamp,
            baseline_price: baseline.price,
            current_time: current.timestamp,
            current_price: current.price,
            change_percentage,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_empty_snapshot_has_no_data() {
        assert_eq!(PriceAnalyzer::compute_change(&[]), Ok(None));
    }

    #[test]
    fn test_single_sample_is_zero_change() {
        let change = PriceAnalyzer::compute_change(&[Sample::new(at(0), 42.5)])
            .unwrap()
            .unwrap();
        assert_eq!(change.change_percentage, 0.0);
        assert_eq!(change.baseline_price, change.current_price);
        assert_eq!(change.baseline_time, change.current_time);
    }

    #[test]
    fn test_zero_baseline_is_degenerate() {
        let samples = [Sample::new(at(0), 0.0), Sample::new(at(30), 10.0)];
        assert_eq!(
            PriceAnalyzer::compute_change(&samples),
            Err(ChangeError::DegenerateBaseline(0.0))
        );
    }

    #[test]
    fn test_rise_and_fall() {
        let up = [Sample::new(at(0), 100.0), Sample::new(at(30), 110.0)];
        let change = PriceAnalyzer::compute_change(&up).unwrap().unwrap();
        assert!((change.change_percentage - 10.0).abs() < 1e-9);

        let down = [Sample::new(at(0), 100.0), Sample::new(at(30), 90.0)];
        let change = PriceAnalyzer::compute_change(&down).unwrap().unwrap();
        assert!((change.change_percentage + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_uses_first_and_last_samples() {
        let samples = [
            Sample::new(at(30), 105.0),
            Sample::new(at(45), 500.0),
            Sample::new(at(61), 102.0),
        ];
        let change = PriceAnalyzer::compute_change(&samples).unwrap().unwrap();

        assert_eq!(change.baseline_time, at(30));
        assert_eq!(change.current_time, at(61));
        assert!((change.change_percentage - (-2.857142857)).abs() < 1e-6);
        assert_eq!(format!("{:.2}", change.change_percentage), "-2.86");
    }
}
