//! Cached list of tracked instruments

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::price::InstrumentSource;
use crate::shared::cache::TtlCache;
use crate::shared::errors::CatalogError;
use crate::shared::types::Instrument;

use super::{CatalogListing, ListingOrigin};

/// Upper bound on one upstream listing call unless overridden
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Instrument list filtered to one settlement currency, cached for a TTL.
///
/// The cache lock is held across a retrieval so concurrent callers after an expiry
/// share one upstream request. Every retrieval is bounded by `retrieval_timeout`; a
/// stalled source is reported as `CatalogError::Timeout` and goes through the same
/// stale/unavailable fallback as any other failure.
pub struct InstrumentCatalog {
    source: Arc<dyn InstrumentSource>,
    settlement_currency: String,
    retrieval_timeout: Duration,
    cache: Mutex<TtlCache<String, Vec<Instrument>>>,
    retrievals: AtomicU64,
}

impl InstrumentCatalog {
    pub fn new(
        source: Arc<dyn InstrumentSource>,
        settlement_currency: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            settlement_currency: settlement_currency.into().to_uppercase(),
            retrieval_timeout: DEFAULT_RETRIEVAL_TIMEOUT,
            cache: Mutex::new(TtlCache::new(ttl)),
            retrievals: AtomicU64::new(0),
        }
    }

    pub fn with_retrieval_timeout(mut self, retrieval_timeout: Duration) -> Self {
        self.retrieval_timeout = retrieval_timeout;
        self
    }

    pub fn retrieval_timeout(&self) -> Duration {
        self.retrieval_timeout
    }

    pub fn settlement_currency(&self) -> &str {
        &self.settlement_currency
    }

    /// Number of upstream retrievals performed so far
    pub fn retrievals(&self) -> u64 {
        self.retrievals.load(Ordering::Relaxed)
    }

    pub async fn list_instruments(&self) -> CatalogListing {
        let mut cache = self.cache.lock().await;

        if let Some(instruments) = cache.get(&self.settlement_currency) {
            debug!("Using cached instrument list ({} instruments)", instruments.len());
            return CatalogListing {
                instruments,
                origin: ListingOrigin::Cached,
            };
        }

        self.retrievals.fetch_add(1, Ordering::Relaxed);
        let retrieved = match timeout(self.retrieval_timeout, self.source.list_all()).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::Timeout(self.retrieval_timeout)),
        };
        match retrieved {
            Ok(listed) => {
                let instruments: Vec<Instrument> = listed
                    .into_iter()
                    .filter(|entry| entry.quote_currency.eq_ignore_ascii_case(&self.settlement_currency))
                    .map(|entry| Instrument::new(entry.id, entry.quote_currency))
                    .collect();

                info!(
                    "Instrument list refreshed: {} {} pairs",
                    instruments.len(),
                    self.settlement_currency
                );
                cache.insert(self.settlement_currency.clone(), instruments.clone());

                CatalogListing {
                    instruments,
                    origin: ListingOrigin::Fresh,
                }
            }
            Err(err) => match cache.get_stale(&self.settlement_currency) {
                Some(instruments) => {
                    warn!("Instrument listing failed, using last good list: {}", err);
                    CatalogListing {
                        instruments,
                        origin: ListingOrigin::Stale(err),
                    }
                }
                None => {
                    warn!("Instrument listing failed and no cached list exists: {}", err);
                    CatalogListing {
                        instruments: Vec::new(),
                        origin: ListingOrigin::Unavailable(err),
                    }
                }
            },
        }
    }

    /// Drop the cached list so the next call retrieves again
    pub async fn invalidate(&self) {
        self.cache.lock().await.invalidate(&self.settlement_currency);
    }
}
