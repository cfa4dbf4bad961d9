use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::domain::price::LogoSource;
use crate::shared::errors::FetchError;

use super::trim_base_url;

pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Deserialize)]
struct CoinResponse {
    #[serde(default)]
    image: Option<CoinImage>,
}

#[derive(Debug, Deserialize)]
struct CoinImage {
    #[serde(default)]
    small: Option<String>,
}

/// CoinGecko client used only for coin logos
pub struct CoinGeckoClient {
    http_client: Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(http_client: Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: trim_base_url(base_url),
        }
    }
}

#[async_trait]
impl LogoSource for CoinGeckoClient {
    async fn get_logo(&self, symbol: &str) -> Result<Option<String>, FetchError> {
        let url = format!("{}/coins/{}", self.base_url, symbol.to_lowercase());

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        // unknown coins and rate limits both come back as non-200
        if response.status() != StatusCode::OK {
            debug!("CoinGecko returned {} for {}", response.status(), symbol);
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        parse_logo(&body)
    }
}

fn parse_logo(body: &str) -> Result<Option<String>, FetchError> {
    let coin: CoinResponse = serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    Ok(coin
        .image
        .and_then(|image| image.small)
        .filter(|url| !url.is_empty()))
}
