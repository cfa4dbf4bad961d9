//! Catalog domain - which instruments are tracked

mod instrument_catalog;

pub use instrument_catalog::InstrumentCatalog;

use crate::shared::errors::CatalogError;
use crate::shared::types::Instrument;

/// Where a listing came from
#[derive(Debug, Clone, PartialEq)]
pub enum ListingOrigin {
    /// Served from a cache entry younger than the TTL
    Cached,
    /// Retrieved upstream during this call
    Fresh,
    /// Retrieval failed; last good list returned
    Stale(CatalogError),
    /// Retrieval failed and nothing was cached
    Unavailable(CatalogError),
}

impl ListingOrigin {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ListingOrigin::Stale(_) | ListingOrigin::Unavailable(_))
    }
}

/// Instruments returned by the catalog for one call
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogListing {
    pub instruments: Vec<Instrument>,
    pub origin: ListingOrigin,
}
