use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::domain::price::{InstrumentSource, ListedInstrument, PriceQuote, PriceSource};
use crate::shared::errors::{CatalogError, FetchError};

use super::trim_base_url;

pub const DEFAULT_COINBASE_URL: &str = "https://api.exchange.coinbase.com";

/// Coinbase Exchange public REST client: product listing and tickers
pub struct CoinbaseClient {
    http_client: Client,
    base_url: String,
}

impl CoinbaseClient {
    pub fn new(http_client: Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: trim_base_url(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the exchange answers at all
    pub async fn is_available(&self) -> bool {
        match self.http_client.get(format!("{}/time", self.base_url)).send().await {
            Ok(response) => {
                let available = response.status().is_success();
                if available {
                    info!("Coinbase API is available");
                } else {
                    warn!("Coinbase API returned status: {}", response.status());
                }
                available
            }
            Err(e) => {
                warn!("Coinbase API is not available: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl InstrumentSource for CoinbaseClient {
    async fn list_all(&self) -> Result<Vec<ListedInstrument>, CatalogError> {
        let url = format!("{}/products", self.base_url);
        debug!("Listing products from: {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;
        parse_products(&body)
    }
}

#[async_trait]
impl PriceSource for CoinbaseClient {
    async fn get_price(&self, instrument_id: &str) -> Result<PriceQuote, FetchError> {
        let url = format!("{}/products/{}/ticker", self.base_url, instrument_id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        parse_ticker(&body)
    }
}

fn parse_products(body: &str) -> Result<Vec<ListedInstrument>, CatalogError> {
    serde_json::from_str(body).map_err(|e| CatalogError::Malformed(e.to_string()))
}

fn parse_ticker(body: &str) -> Result<PriceQuote, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_products_ignores_extra_fields() {
        let body = r#"[
            {"id": "BTC-USD", "base_currency": "BTC", "quote_currency": "USD", "status": "online"},
            {"id": "ETH-EUR", "base_currency": "ETH", "quote_currency": "EUR", "status": "online"}
        ]"#;

        let products = parse_products(body).unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, "BTC-USD");
        assert_eq!(products[1].quote_currency, "EUR");
    }

    #[test]
    fn test_parse_products_malformed() {
        let err = parse_products(r#"{"message": "rate limited"}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(_)));
    }

    #[test]
    fn test_parse_ticker_string_price() {
        let body = r#"{"trade_id": 1, "price": "64250.12", "size": "0.01", "time": "2024-05-01T12:00:00Z"}"#;
        let quote = parse_ticker(body).unwrap();
        assert_eq!(quote.parse_price().unwrap(), 64250.12);
    }

    #[test]
    fn test_parse_ticker_without_price() {
        let quote = parse_ticker(r#"{"message": "NotFound"}"#).unwrap();
        assert_eq!(quote.parse_price(), Err(FetchError::MissingPrice));
    }

    #[test]
    fn test_parse_ticker_not_json() {
        let err = parse_ticker("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = CoinbaseClient::new(Client::new(), "https://api.exchange.coinbase.com/");
        assert_eq!(client.base_url(), DEFAULT_COINBASE_URL);
    }
}
