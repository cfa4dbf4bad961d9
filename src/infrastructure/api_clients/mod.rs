pub mod coinbase_client;
pub mod coingecko_client;

pub use coinbase_client::CoinbaseClient;
pub use coingecko_client::CoinGeckoClient;

use reqwest::Client;
use std::time::Duration;

/// Shared HTTP client for all sources.
///
/// The request timeout here is a transport backstop; fetch timeouts are enforced by callers.
pub fn build_http_client(user_agent: &str, request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(request_timeout)
        .build()
}

fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
