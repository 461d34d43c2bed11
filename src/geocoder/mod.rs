mod cache;
mod nominatim;

pub use cache::CachedGeocoder;
pub use nominatim::NominatimGeocoder;

use futures::future::BoxFuture;

use crate::error::GeocodeError;

/// A place returned by the geocoding provider
///
/// `x`/`y` are provider-native coordinates (longitude/latitude for the
/// providers used here), projected only when a result is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub label: String,
    pub x: f64,
    pub y: f64,
}

/// Query-by-text geocoding provider
pub trait Geocoder: Send + Sync {
    /// Search for places matching `query`; an empty list means no match
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<SearchResult>, GeocodeError>>;
}
