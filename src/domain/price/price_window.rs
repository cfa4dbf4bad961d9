//! Time-bounded price window for a single instrument

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;

use crate::shared::errors::WindowError;
use crate::shared::types::Sample;

/// Ordered samples of one instrument, bounded by age and by count.
///
/// Samples are kept oldest first. Both bounds only ever remove from the front, so the
/// first sample is always the oldest retained one.
#[derive(Debug, Clone)]
pub struct TimeWindowBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl TimeWindowBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest ones past capacity.
    ///
    /// Timestamps must be non-decreasing; an older sample is rejected and the buffer is
    /// left untouched.
    pub fn append(&mut self, sample: Sample) -> Result<(), WindowError> {
        if let Some(newest) = self.samples.back() {
            if sample.timestamp < newest.timestamp {
                return Err(WindowError::OutOfOrder {
                    newest: newest.timestamp,
                    attempted: sample.timestamp,
                });
            }
        }

        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        Ok(())
    }

    /// Drop leading samples older than `window` relative to `now`.
    ///
    /// Returns how many samples were removed. A sample exactly `window` old is kept.
    pub fn evict_older_than(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let mut evicted = 0;
        while let Some(oldest) = self.samples.front() {
            let expired = match (now - oldest.timestamp).to_std() {
                Ok(age) => age > window,
                // sample newer than `now`
                Err(_) => false,
            };
            if !expired {
                break;
            }
            self.samples.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Append `sample` and apply age eviction at its timestamp
    pub fn record(&mut self, sample: Sample, window: Duration) -> Result<usize, WindowError> {
        self.append(sample)?;
        Ok(self.evict_older_than(sample.timestamp, window))
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
