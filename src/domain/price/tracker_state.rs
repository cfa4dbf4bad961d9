//! Shared tracker state: price windows, refresh metadata and logo cache

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::shared::errors::WindowError;
use crate::shared::types::Sample;

use super::TimeWindowBuffer;

/// Metadata about the last completed refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshStatus {
    pub last_refresh: Option<DateTime<Utc>>,
    pub successful_cycles: u64,
}

/// Snapshot of one instrument's window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentSnapshot {
    pub instrument_id: String,
    pub samples: Vec<Sample>,
}

/// Outcome of applying one batch of samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
    pub appended: usize,
    pub created: usize,
    pub evicted: usize,
    /// Windows removed because every sample aged out
    pub dropped: usize,
    pub rejected: Vec<(String, WindowError)>,
}

/// State shared between the refresh loop (single writer) and any number of readers.
///
/// A batch of samples is applied while holding both the window and refresh-status write
/// guards, so readers observe either the state before a cycle or after it, never
/// partially updated windows or windows newer than the recorded refresh.
pub struct TrackerState {
    windows: RwLock<BTreeMap<String, TimeWindowBuffer>>,
    refresh: RwLock<RefreshStatus>,
    logos: RwLock<HashMap<String, String>>,
    window: Duration,
    max_samples: usize,
}

impl TrackerState {
    pub fn new(window: Duration, max_samples: usize) -> Self {
        Self {
            windows: RwLock::new(BTreeMap::new()),
            refresh: RwLock::new(RefreshStatus::default()),
            logos: RwLock::new(HashMap::new()),
            window,
            max_samples,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Apply one cycle's samples as of `now`, creating windows on first sight.
    ///
    /// Every window is aged at `now`, including those that got no sample, and windows
    /// left empty are dropped. The refresh status advances only when a sample was
    /// appended.
    pub async fn apply_samples<I>(&self, samples: I, now: DateTime<Utc>) -> UpdateSummary
    where
        I: IntoIterator<Item = (String, Sample)>,
    {
        let mut summary = UpdateSummary::default();
        let mut windows = self.windows.write().await;
        let mut refresh = self.refresh.write().await;

        for (instrument_id, sample) in samples {
            if !windows.contains_key(&instrument_id) {
                summary.created += 1;
            }
            let buffer = windows
                .entry(instrument_id.clone())
                .or_insert_with(|| TimeWindowBuffer::new(self.max_samples));

            match buffer.append(sample) {
                Ok(()) => summary.appended += 1,
                Err(err) => summary.rejected.push((instrument_id, err)),
            }
        }

        for buffer in windows.values_mut() {
            summary.evicted += buffer.evict_older_than(now, self.window);
        }
        let before = windows.len();
        windows.retain(|_, buffer| !buffer.is_empty());
        summary.dropped = before - windows.len();

        if summary.appended > 0 {
            refresh.last_refresh = Some(now);
            refresh.successful_cycles += 1;
        }

        summary
    }

    /// Record a single sample
    pub async fn record(&self, instrument_id: &str, sample: Sample) -> Result<usize, WindowError> {
        let mut windows = self.windows.write().await;
        windows
            .entry(instrument_id.to_string())
            .or_insert_with(|| TimeWindowBuffer::new(self.max_samples))
            .record(sample, self.window)
    }

    pub async fn refresh_status(&self) -> RefreshStatus {
        self.refresh.read().await.clone()
    }

    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.refresh.read().await.last_refresh
    }

    pub async fn snapshot(&self, instrument_id: &str) -> Option<Vec<Sample>> {
        let windows = self.windows.read().await;
        windows.get(instrument_id).map(TimeWindowBuffer::snapshot)
    }

    /// Snapshot of every window, ordered by instrument id
    pub async fn snapshot_all(&self) -> Vec<InstrumentSnapshot> {
        let windows = self.windows.read().await;
        windows
            .iter()
            .map(|(instrument_id, buffer)| InstrumentSnapshot {
                instrument_id: instrument_id.clone(),
                samples: buffer.snapshot(),
            })
            .collect()
    }

    pub async fn tracked_instruments(&self) -> Vec<String> {
        self.windows.read().await.keys().cloned().collect()
    }

    pub async fn tracked_count(&self) -> usize {
        self.windows.read().await.len()
    }

    pub async fn logo(&self, symbol: &str) -> Option<String> {
        self.logos.read().await.get(symbol).cloned()
    }

    pub async fn logos(&self) -> HashMap<String, String> {
        self.logos.read().await.clone()
    }

    /// Symbols from `symbols` with no cached logo, deduplicated
    pub async fn missing_logos<'a, I>(&self, symbols: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let logos = self.logos.read().await;
        let mut missing: Vec<String> = symbols
            .into_iter()
            .filter(|symbol| !logos.contains_key(*symbol))
            .map(str::to_string)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    pub async fn store_logo(&self, symbol: impl Into<String>, url: impl Into<String>) {
        self.logos.write().await.insert(symbol.into(), url.into());
    }
}
