//! Periodic refresh loop: catalog -> fetch -> window update

use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::catalog::{InstrumentCatalog, ListingOrigin};
use crate::domain::price::TrackerState;
use crate::shared::errors::SchedulerError;
use crate::shared::utils::base_symbol;

use super::{LogoResolver, PriceFetcher};

/// Where the refresh loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Fetching,
    Updating,
    Stopped,
}

/// Summary of one refresh cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub listing: ListingOrigin,
    pub instruments: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rejected: usize,
    pub evicted: usize,
    pub logos_resolved: usize,
}

/// Drives refresh cycles at a fixed period, one cycle at a time
pub struct RefreshScheduler {
    catalog: Arc<InstrumentCatalog>,
    fetcher: Arc<PriceFetcher>,
    logos: Option<Arc<LogoResolver>>,
    state: Arc<TrackerState>,
    refresh_interval: Duration,
    cycle_timeout: Duration,
    phase: watch::Sender<SchedulerPhase>,
}

impl RefreshScheduler {
    pub fn new(
        catalog: Arc<InstrumentCatalog>,
        fetcher: Arc<PriceFetcher>,
        state: Arc<TrackerState>,
        refresh_interval: Duration,
        cycle_timeout: Duration,
    ) -> Result<Self, SchedulerError> {
        if refresh_interval.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "refresh interval must be greater than zero".to_string(),
            ));
        }
        if cycle_timeout.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "cycle timeout must be greater than zero".to_string(),
            ));
        }

        let (phase, _) = watch::channel(SchedulerPhase::Idle);
        Ok(Self {
            catalog,
            fetcher,
            logos: None,
            state,
            refresh_interval,
            cycle_timeout,
            phase,
        })
    }

    pub fn with_logo_resolver(mut self, resolver: Arc<LogoResolver>) -> Self {
        self.logos = Some(resolver);
        self
    }

    pub fn state(&self) -> Arc<TrackerState> {
        Arc::clone(&self.state)
    }

    pub fn phase(&self) -> SchedulerPhase {
        *self.phase.borrow()
    }

    /// Run a single refresh cycle.
    ///
    /// Per-instrument failures are counted and logged, never returned.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let started_at = Utc::now();
        let deadline = started + self.cycle_timeout;

        self.set_phase(SchedulerPhase::Fetching);
        let listing = self.catalog.list_instruments().await;
        if listing.origin.is_degraded() {
            debug!("Cycle running on a degraded instrument listing: {:?}", listing.origin);
        }
        let instrument_ids: Vec<String> = match &listing.origin {
            ListingOrigin::Unavailable(_) => {
                let tracked = self.state.tracked_instruments().await;
                warn!(
                    "Instrument list unavailable, refreshing {} already tracked instruments",
                    tracked.len()
                );
                tracked
            }
            _ => listing.instruments.iter().map(|i| i.id.clone()).collect(),
        };

        let outcomes = self.fetcher.fetch_all(&instrument_ids, deadline).await;

        self.set_phase(SchedulerPhase::Updating);
        let mut samples = Vec::with_capacity(outcomes.len());
        let mut failed = 0;
        for outcome in outcomes {
            match outcome.result {
                Ok(sample) => samples.push((outcome.instrument_id, sample)),
                Err(_) => failed += 1,
            }
        }

        let summary = self.state.apply_samples(samples, Utc::now()).await;
        for (instrument_id, err) in &summary.rejected {
            warn!("Skipped sample for {}: {}", instrument_id, err);
        }
        if summary.dropped > 0 {
            info!("Dropped {} windows with no samples left in range", summary.dropped);
        }

        if summary.appended == 0 && !instrument_ids.is_empty() {
            warn!("Refresh cycle produced no prices for {} instruments", instrument_ids.len());
        }
        if failed > 0 {
            warn!("{} of {} price fetches failed this cycle", failed, instrument_ids.len());
        }

        // logos only get what is left of the cycle deadline
        let logos_resolved = match &self.logos {
            Some(_) if Instant::now() >= deadline => {
                debug!("Cycle deadline reached, logo lookups deferred");
                0
            }
            Some(resolver) => {
                let symbols: Vec<String> = instrument_ids
                    .iter()
                    .map(|id| base_symbol(id).to_string())
                    .collect();
                resolver.resolve_missing(&self.state, &symbols, deadline).await
            }
            None => 0,
        };

        self.set_phase(SchedulerPhase::Idle);

        let report = CycleReport {
            started_at,
            duration: started.elapsed(),
            listing: listing.origin,
            instruments: instrument_ids.len(),
            succeeded: summary.appended,
            failed,
            rejected: summary.rejected.len(),
            evicted: summary.evicted,
            logos_resolved,
        };
        info!(
            "Refresh cycle done in {:?}: {}/{} prices updated, {} failed, {} evicted",
            report.duration, report.succeeded, report.instruments, report.failed, report.evicted
        );
        report
    }

    /// Start the loop on its own task
    pub fn spawn(self, cancel: CancellationToken) -> SchedulerHandle {
        let trigger = Arc::new(Notify::new());
        let phase = self.phase.subscribe();
        let task = tokio::spawn(self.run(cancel.clone(), Arc::clone(&trigger)));

        SchedulerHandle {
            task,
            cancel,
            trigger,
            phase,
        }
    }

    async fn run(self, cancel: CancellationToken, trigger: Arc<Notify>) -> Result<u64, SchedulerError> {
        info!("Refresh loop started, period {:?}", self.refresh_interval);

        // start-to-start period; an overrunning cycle is followed immediately by the next
        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                _ = trigger.notified() => {
                    debug!("Manual refresh requested");
                    ticker.reset();
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Refresh cycle interrupted by shutdown");
                    break;
                }
                _ = self.run_cycle() => cycles += 1,
            }
        }

        self.set_phase(SchedulerPhase::Stopped);
        info!("Refresh loop stopped after {} cycles", cycles);
        Ok(cycles)
    }

    fn set_phase(&self, phase: SchedulerPhase) {
        self.phase.send_replace(phase);
    }
}

/// Control handle for a spawned refresh loop
pub struct SchedulerHandle {
    task: JoinHandle<Result<u64, SchedulerError>>,
    cancel: CancellationToken,
    trigger: Arc<Notify>,
    phase: watch::Receiver<SchedulerPhase>,
}

impl SchedulerHandle {
    /// Run a cycle now instead of waiting for the next tick
    pub fn trigger_refresh(&self) {
        self.trigger.notify_one();
    }

    pub fn phase(&self) -> SchedulerPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<SchedulerPhase> {
        self.phase.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to end on its own; returns the number of completed cycles
    pub async fn join(&mut self) -> Result<u64, SchedulerError> {
        join_result((&mut self.task).await)
    }

    /// Cancel the loop and wait for it to stop
    pub async fn shutdown(self) -> Result<u64, SchedulerError> {
        self.cancel.cancel();
        join_result(self.task.await)
    }
}

fn join_result(
    joined: Result<Result<u64, SchedulerError>, tokio::task::JoinError>,
) -> Result<u64, SchedulerError> {
    match joined {
        Ok(result) => result,
        Err(err) if err.is_panic() => Err(SchedulerError::Panicked(panic_message(err.into_panic()))),
        Err(_) => Err(SchedulerError::Aborted),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
