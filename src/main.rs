mod app;
mod config;
mod report;

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Crypto price tracker: rolling price windows and top movers")]
struct Args {
    /// Path to config file (optional)
    #[arg(long)]
    config: Option<String>,

    /// Trailing window in seconds
    #[arg(long)]
    window_secs: Option<u64>,

    /// Refresh period in seconds
    #[arg(long)]
    refresh_interval_secs: Option<u64>,

    /// Maximum concurrent price requests
    #[arg(long)]
    max_concurrent_fetches: Option<usize>,

    /// Maximum samples kept per instrument
    #[arg(long)]
    max_buffer_samples: Option<usize>,

    /// Quote currency to track (e.g. USD)
    #[arg(long)]
    settlement_currency: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    fetch_timeout_secs: Option<u64>,

    /// Whole-cycle deadline in seconds
    #[arg(long)]
    cycle_timeout_secs: Option<u64>,

    /// Number of movers to display
    #[arg(long)]
    top: Option<usize>,

    /// Seconds between printed reports
    #[arg(long)]
    report_interval_secs: Option<u64>,

    /// Skip logo lookups
    #[arg(long)]
    no_logos: bool,

    /// Run a single refresh cycle, print the report and exit
    #[arg(long)]
    once: bool,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,

    /// Stop after this many seconds
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Log filter (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Load base configuration from file if provided
    let base_config = if let Some(config_path) = &args.config {
        config::Config::from_file(config_path)?
    } else {
        config::Config::default()
    };

    // Priority: CLI args > Config file > Defaults
    let mut app_cfg = app::AppCfg::from_config(base_config);
    apply_overrides(&mut app_cfg, args);

    app::run(app_cfg).await
}

fn apply_overrides(app_cfg: &mut app::AppCfg, args: Args) {
    let tracker = &mut app_cfg.tracker;
    if let Some(secs) = args.window_secs {
        tracker.window = Duration::from_secs(secs);
    }
    if let Some(secs) = args.refresh_interval_secs {
        tracker.refresh_interval = Duration::from_secs(secs);
    }
    if let Some(limit) = args.max_concurrent_fetches {
        tracker.max_concurrent_fetches = limit;
    }
    if let Some(limit) = args.max_buffer_samples {
        tracker.max_buffer_samples = limit;
    }
    if let Some(currency) = args.settlement_currency {
        tracker.settlement_currency = currency;
    }
    if let Some(secs) = args.fetch_timeout_secs {
        tracker.fetch_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.cycle_timeout_secs {
        tracker.cycle_timeout = Duration::from_secs(secs);
    }
    if let Some(top) = args.top {
        tracker.max_displayed_instruments = top;
    }
    if args.no_logos {
        tracker.fetch_logos = false;
    }

    if let Some(secs) = args.report_interval_secs {
        app_cfg.report_interval = Duration::from_secs(secs);
    }
    app_cfg.once = args.once;
    app_cfg.json = args.json;
    app_cfg.run_for = args.duration_secs.map(Duration::from_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "cointrack",
            "--window-secs",
            "60",
            "--top",
            "3",
            "--no-logos",
            "--once",
        ]);
        let mut app_cfg = app::AppCfg::from_config(config::Config::default());

        apply_overrides(&mut app_cfg, args);

        assert_eq!(app_cfg.tracker.window, Duration::from_secs(60));
        assert_eq!(app_cfg.tracker.max_displayed_instruments, 3);
        assert!(!app_cfg.tracker.fetch_logos);
        assert!(app_cfg.once);
        assert_eq!(app_cfg.tracker.refresh_interval, Duration::from_secs(30));
    }
}
