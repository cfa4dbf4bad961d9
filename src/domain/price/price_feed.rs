//! Price feed interfaces

use async_trait::async_trait;
use serde::Deserialize;

use crate::shared::errors::{CatalogError, FetchError};

/// Listing entry as returned by an instrument source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListedInstrument {
    pub id: String,
    pub quote_currency: String,
}

/// Price field as sent upstream: a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QuotedPrice {
    Number(f64),
    Text(String),
}

/// Minimal ticker payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceQuote {
    #[serde(default)]
    pub price: Option<QuotedPrice>,
}

impl PriceQuote {
    pub fn from_number(price: f64) -> Self {
        Self {
            price: Some(QuotedPrice::Number(price)),
        }
    }

    pub fn from_text(price: impl Into<String>) -> Self {
        Self {
            price: Some(QuotedPrice::Text(price.into())),
        }
    }

    /// Parse the quoted price into a positive, finite float
    pub fn parse_price(&self) -> Result<f64, FetchError> {
        let value = match &self.price {
            None => return Err(FetchError::MissingPrice),
            Some(QuotedPrice::Number(value)) => *value,
            Some(QuotedPrice::Text(text)) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| FetchError::NonNumericPrice(text.clone()))?,
        };

        if !value.is_finite() || value <= 0.0 {
            return Err(FetchError::NonPositivePrice(value));
        }
        Ok(value)
    }
}

/// Source of the tradable instrument list
#[async_trait]
pub trait InstrumentSource: Send + Sync {
    async fn list_all(&self) -> Result<Vec<ListedInstrument>, CatalogError>;
}

/// Source of current prices
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn get_price(&self, instrument_id: &str) -> Result<PriceQuote, FetchError>;
}

/// Source of display logos, keyed by base symbol
#[async_trait]
pub trait LogoSource: Send + Sync {
    async fn get_logo(&self, symbol: &str) -> Result<Option<String>, FetchError>;
}
