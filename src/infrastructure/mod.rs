//! Infrastructure layer - HTTP adapters for the price, listing and logo sources

pub mod api_clients;

pub use api_clients::{build_http_client, CoinGeckoClient, CoinbaseClient};
