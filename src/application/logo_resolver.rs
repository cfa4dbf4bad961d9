//! Logo lookups for display

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::debug;

use crate::domain::price::{LogoSource, TrackerState};
use crate::shared::errors::FetchError;

/// Resolves logos for base symbols that are not cached yet.
///
/// Found logos are kept for the process lifetime; misses are retried on later cycles.
pub struct LogoResolver {
    source: Arc<dyn LogoSource>,
    permits: Arc<Semaphore>,
    fetch_timeout: Duration,
}

impl LogoResolver {
    pub fn new(source: Arc<dyn LogoSource>, permits: Arc<Semaphore>, fetch_timeout: Duration) -> Self {
        Self {
            source,
            permits,
            fetch_timeout,
        }
    }

    /// Fetch logos missing from `state`; returns how many were stored
    pub async fn resolve_missing(&self, state: &TrackerState, symbols: &[String], deadline: Instant) -> usize {
        let missing = state.missing_logos(symbols.iter().map(String::as_str)).await;
        if missing.is_empty() {
            return 0;
        }

        let lookups = missing.iter().map(|symbol| async move {
            match timeout_at(deadline, self.lookup(symbol)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::DeadlineExceeded),
            }
        });
        let results = join_all(lookups).await;

        let mut stored = 0;
        for (symbol, result) in missing.into_iter().zip(results) {
            match result {
                Ok(Some(url)) => {
                    state.store_logo(symbol, url).await;
                    stored += 1;
                }
                Ok(None) => debug!("No logo available for {}", symbol),
                Err(err) => debug!("Logo lookup failed for {}: {}", symbol, err),
            }
        }
        stored
    }

    async fn lookup(&self, symbol: &str) -> Result<Option<String>, FetchError> {
        let _permit = self.permits.acquire().await.map_err(|_| FetchError::Cancelled)?;
        timeout(self.fetch_timeout, self.source.get_logo(symbol))
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))?
    }
}
