// src/app.rs
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cointrack::application::{LogoResolver, PriceFetcher, RefreshScheduler};
use cointrack::domain::catalog::InstrumentCatalog;
use cointrack::domain::price::TrackerState;
use cointrack::infrastructure::{build_http_client, CoinGeckoClient, CoinbaseClient};
use cointrack::shared::errors::AppError;
use cointrack::shared::types::TrackerConfig;

use crate::config::Config;
use crate::report::TrackerReport;

#[derive(Debug, Clone)]
pub struct AppCfg {
    pub tracker: TrackerConfig,
    pub coinbase_url: String,
    pub coingecko_url: String,
    pub user_agent: String,
    pub report_interval: Duration,

    // Run mode
    pub once: bool,
    pub json: bool,
    pub run_for: Option<Duration>,
}

impl AppCfg {
    pub fn from_config(cfg: Config) -> Self {
        let tracker = TrackerConfig {
            window: Duration::from_secs(cfg.tracker.window_secs),
            refresh_interval: Duration::from_secs(cfg.tracker.refresh_interval_secs),
            max_concurrent_fetches: cfg.tracker.max_concurrent_fetches,
            max_buffer_samples: cfg.tracker.max_buffer_samples,
            settlement_currency: cfg.tracker.settlement_currency,
            catalog_cache_ttl: Duration::from_secs(cfg.tracker.catalog_cache_ttl_secs),
            fetch_timeout: Duration::from_secs(cfg.tracker.fetch_timeout_secs),
            cycle_timeout: Duration::from_secs(cfg.tracker.cycle_timeout_secs),
            max_displayed_instruments: cfg.display.max_displayed_instruments,
            fetch_logos: cfg.tracker.fetch_logos,
        };

        Self {
            tracker,
            coinbase_url: cfg.sources.coinbase_url,
            coingecko_url: cfg.sources.coingecko_url,
            user_agent: cfg.sources.user_agent,
            report_interval: Duration::from_secs(cfg.display.report_interval_secs),
            once: false,
            json: false,
            run_for: None,
        }
    }
}

pub async fn run(app_cfg: AppCfg) -> Result<()> {
    info!("Starting crypto price tracker");
    info!("Configuration: {:?}", app_cfg);

    app_cfg.tracker.validate()?;
    if app_cfg.report_interval.is_zero() {
        anyhow::bail!("report interval must be greater than zero");
    }
    let tracker = &app_cfg.tracker;

    let http_client = build_http_client(&app_cfg.user_agent, tracker.fetch_timeout)
        .context("build HTTP client")?;
    let coinbase = Arc::new(CoinbaseClient::new(http_client.clone(), &app_cfg.coinbase_url));
    if !coinbase.is_available().await {
        warn!("Coinbase did not answer the availability probe, continuing anyway");
    }

    let catalog = Arc::new(
        InstrumentCatalog::new(
            coinbase.clone(),
            tracker.settlement_currency.as_str(),
            tracker.catalog_cache_ttl,
        )
        .with_retrieval_timeout(tracker.fetch_timeout.min(tracker.cycle_timeout)),
    );
    let fetcher = Arc::new(PriceFetcher::new(
        coinbase,
        tracker.max_concurrent_fetches,
        tracker.fetch_timeout,
    ));
    let state = Arc::new(TrackerState::new(tracker.window, tracker.max_buffer_samples));

    let mut scheduler = RefreshScheduler::new(
        catalog,
        fetcher.clone(),
        state.clone(),
        tracker.refresh_interval,
        tracker.cycle_timeout,
    )
    .map_err(AppError::from)?;
    if tracker.fetch_logos {
        let coingecko = Arc::new(CoinGeckoClient::new(http_client, &app_cfg.coingecko_url));
        // logo lookups share the price fan-out permits
        let resolver = LogoResolver::new(coingecko, fetcher.permits(), tracker.fetch_timeout);
        scheduler = scheduler.with_logo_resolver(Arc::new(resolver));
    }

    if app_cfg.once {
        let cycle = scheduler.run_cycle().await;
        info!("Single cycle finished: {:?}", cycle);
        return print_report(&state, &app_cfg).await;
    }

    run_tracking_mode(app_cfg, scheduler, state).await
}

async fn run_tracking_mode(app_cfg: AppCfg, scheduler: RefreshScheduler, state: Arc<TrackerState>) -> Result<()> {
    info!("Running in tracking mode, press Enter to refresh now, Ctrl-C to stop");

    let cancel = CancellationToken::new();
    let mut handle = scheduler.spawn(cancel.clone());

    let mut report_ticker = interval_at(Instant::now() + app_cfg.report_interval, app_cfg.report_interval);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let run_for = app_cfg.run_for;
    let deadline = async move {
        match run_for {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            result = handle.join() => {
                let cycles = result.map_err(AppError::from)?;
                warn!("Refresh loop ended on its own after {} cycles", cycles);
                return Ok(());
            }
            _ = &mut ctrl_c => {
                info!("Interrupt received, shutting down");
                break;
            }
            _ = &mut deadline => {
                info!("Run duration elapsed, shutting down");
                break;
            }
            _ = report_ticker.tick() => {
                print_report(&state, &app_cfg).await?;
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(_)) => handle.trigger_refresh(),
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!("Stopped reading stdin: {}", e);
                        stdin_open = false;
                    }
                }
            }
        }
    }

    let cycles = handle.shutdown().await.map_err(AppError::from)?;
    info!("Tracker stopped after {} refresh cycles", cycles);
    print_report(&state, &app_cfg).await
}

async fn print_report(state: &TrackerState, app_cfg: &AppCfg) -> Result<()> {
    let report = TrackerReport::from_state(state, app_cfg.tracker.max_displayed_instruments).await;
    if report.is_empty() {
        debug!("No movers yet, {} instruments tracked", report.tracked_instruments);
    }
    if app_cfg.json {
        println!("{}", report.to_json().context("serialize report")?);
    } else {
        println!("{}", report);
    }
    Ok(())
}
