//! Concurrent price retrieval for one refresh cycle

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::debug;

use crate::domain::price::PriceSource;
use crate::shared::errors::FetchError;
use crate::shared::types::Sample;

/// Result of fetching one instrument
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub instrument_id: String,
    pub result: Result<Sample, FetchError>,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fetches prices for many instruments with bounded fan-out.
///
/// At most `max_in_flight` requests run at once. Every request has its own timeout and
/// the whole batch is bounded by the deadline passed to [`PriceFetcher::fetch_all`].
pub struct PriceFetcher {
    source: Arc<dyn PriceSource>,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    fetch_timeout: Duration,
}

impl PriceFetcher {
    pub fn new(source: Arc<dyn PriceSource>, max_in_flight: usize, fetch_timeout: Duration) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            source,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            fetch_timeout,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Permit pool shared with other fan-outs of the same cycle
    pub fn permits(&self) -> Arc<Semaphore> {
        Arc::clone(&self.permits)
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Fetch every instrument and wait for all of them to settle.
    ///
    /// Outcomes are returned in input order. A failing instrument never affects the
    /// others, and requests unfinished at `deadline` resolve to `DeadlineExceeded`.
    pub async fn fetch_all(&self, instrument_ids: &[String], deadline: Instant) -> Vec<FetchOutcome> {
        let fetches = instrument_ids
            .iter()
            .map(|instrument_id| self.fetch_one(instrument_id, deadline));
        join_all(fetches).await
    }

    async fn fetch_one(&self, instrument_id: &str, deadline: Instant) -> FetchOutcome {
        let result = match timeout_at(deadline, self.fetch_price(instrument_id)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::DeadlineExceeded),
        };

        if let Err(err) = &result {
            debug!("Price fetch failed for {}: {}", instrument_id, err);
        }

        FetchOutcome {
            instrument_id: instrument_id.to_string(),
            result,
        }
    }

    async fn fetch_price(&self, instrument_id: &str) -> Result<Sample, FetchError> {
        let _permit = self.permits.acquire().await.map_err(|_| FetchError::Cancelled)?;

        let quote = timeout(self.fetch_timeout, self.source.get_price(instrument_id))
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;
        let price = quote.parse_price()?;

        // stamped on receipt so request latency does not age the sample
        Ok(Sample::now(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PriceQuote;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted price source: per-instrument delay and response
    struct ScriptedSource {
        responses: HashMap<String, Result<PriceQuote, FetchError>>,
        delays: HashMap<String, Duration>,
        default_delay: Duration,
        in_flight: AtomicUsize,
        max_seen: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(default_delay: Duration) -> Self {
            Self {
                responses: HashMap::new(),
                delays: HashMap::new(),
                default_delay,
                in_flight: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
            }
        }

        fn respond(mut self, id: &str, response: Result<PriceQuote, FetchError>) -> Self {
            self.responses.insert(id.to_string(), response);
            self
        }

        fn delay(mut self, id: &str, delay: Duration) -> Self {
            self.delays.insert(id.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl PriceSource for ScriptedSource {
        async fn get_price(&self, instrument_id: &str) -> Result<PriceQuote, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);

            let delay = self.delays.get(instrument_id).copied().unwrap_or(self.default_delay);
            tokio::time::sleep(delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.responses
                .get(instrument_id)
                .cloned()
                .unwrap_or_else(|| Ok(PriceQuote::from_text("100.0")))
        }
    }

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("COIN{}-USD", i)).collect()
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(3_600)
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_failure_does_not_affect_others() {
        let source = ScriptedSource::new(Duration::from_millis(10))
            .respond("COIN3-USD", Err(FetchError::Network("connection refused".to_string())));
        let fetcher = PriceFetcher::new(Arc::new(source), 10, Duration::from_secs(10));
        let instruments = ids(5);

        let outcomes = fetcher.fetch_all(&instruments, far_deadline()).await;

        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 4);
        assert_eq!(outcomes[2].instrument_id, "COIN3-USD");
        assert!(matches!(outcomes[2].result, Err(FetchError::Network(_))));
        for (outcome, id) in outcomes.iter().zip(&instruments) {
            assert_eq!(&outcome.instrument_id, id);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_respects_concurrency_limit() {
        let source = Arc::new(ScriptedSource::new(Duration::from_millis(50)));
        let fetcher = PriceFetcher::new(source.clone(), 3, Duration::from_secs(10));

        let outcomes = fetcher.fetch_all(&ids(25), far_deadline()).await;

        assert!(outcomes.iter().all(FetchOutcome::is_success));
        assert_eq!(source.max_seen.load(Ordering::SeqCst), 3);
        assert_eq!(source.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_request_times_out() {
        let source = ScriptedSource::new(Duration::from_millis(10))
            .delay("COIN2-USD", Duration::from_secs(30));
        let fetcher = PriceFetcher::new(Arc::new(source), 10, Duration::from_secs(10));

        let outcomes = fetcher.fetch_all(&ids(3), far_deadline()).await;

        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1].result, Err(FetchError::Timeout(Duration::from_secs(10))));
        assert!(outcomes[2].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_keeps_completed_results() {
        let source = ScriptedSource::new(Duration::from_secs(4));
        let fetcher = PriceFetcher::new(Arc::new(source), 1, Duration::from_secs(10));
        let deadline = Instant::now() + Duration::from_secs(10);

        let outcomes = fetcher.fetch_all(&ids(5), deadline).await;

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        assert_eq!(succeeded, 2);
        for outcome in &outcomes[2..] {
            assert_eq!(outcome.result, Err(FetchError::DeadlineExceeded));
        }
    }

    #[tokio::test]
    async fn test_malformed_prices_reported_per_instrument() {
        let source = ScriptedSource::new(Duration::ZERO)
            .respond("COIN1-USD", Ok(PriceQuote::from_text("abc")))
            .respond("COIN2-USD", Ok(PriceQuote { price: None }))
            .respond("COIN3-USD", Ok(PriceQuote::from_number(-1.0)));
        let fetcher = PriceFetcher::new(Arc::new(source), 2, Duration::from_secs(1));

        let outcomes = fetcher.fetch_all(&ids(4), far_deadline()).await;

        assert_eq!(outcomes[0].result, Err(FetchError::NonNumericPrice("abc".to_string())));
        assert_eq!(outcomes[1].result, Err(FetchError::MissingPrice));
        assert_eq!(outcomes[2].result, Err(FetchError::NonPositivePrice(-1.0)));
        assert!(outcomes[3].is_success());
    }

    #[tokio::test]
    async fn test_sample_stamped_after_dispatch() {
        let fetcher = PriceFetcher::new(
            Arc::new(ScriptedSource::new(Duration::from_millis(5))),
            1,
            Duration::from_secs(1),
        );
        let dispatched = Utc::now();

        let outcomes = fetcher.fetch_all(&ids(1), far_deadline()).await;

        let sample = outcomes[0].result.clone().unwrap();
        assert!(sample.timestamp >= dispatched);
        assert_eq!(sample.price, 100.0);
    }
}
