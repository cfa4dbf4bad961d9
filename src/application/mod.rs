//! Application layer - fetching, logo resolution and the refresh loop

pub mod logo_resolver;
pub mod price_fetcher;
pub mod refresh_scheduler;

pub use logo_resolver::LogoResolver;
pub use price_fetcher::{FetchOutcome, PriceFetcher};
pub use refresh_scheduler::{CycleReport, RefreshScheduler, SchedulerHandle, SchedulerPhase};
