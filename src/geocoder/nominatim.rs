use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::GeocodeError;

use super::{Geocoder, SearchResult};

/// Public OpenStreetMap instance
pub const DEFAULT_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Results requested per query
const RESULT_LIMIT: usize = 5;

/// One place in a Nominatim `jsonv2` response
#[derive(Debug, Deserialize)]
struct Place {
    display_name: String,
    lat: String,
    lon: String,
}

/// Nominatim free-form search client
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    country_codes: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(client: Client, base_url: Option<String>, country_codes: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_URL.to_string()),
            country_codes: country_codes.map(|c| c.to_lowercase()),
        }
    }

    fn query_url(&self, query: &str) -> String {
        let mut url = format!(
            "{}?q={}&format=jsonv2&limit={}",
            self.base_url,
            urlencoding::encode(query),
            RESULT_LIMIT
        );
        if let Some(codes) = &self.country_codes {
            url.push_str("&countrycodes=");
            url.push_str(&urlencoding::encode(codes));
        }
        url
    }

    #[instrument(skip(self))]
    async fn fetch(&self, query: &str) -> Result<Vec<SearchResult>, GeocodeError> {
        let url = self.query_url(query);
        debug!(url, "Geocoding");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Unreachable(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let results = parse_response(&body)?;
        debug!(count = results.len(), "Geocoding complete");
        Ok(results)
    }
}

impl Geocoder for NominatimGeocoder {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<SearchResult>, GeocodeError>> {
        Box::pin(self.fetch(query))
    }
}

/// Parse a `jsonv2` body; places with unreadable coordinates are dropped
fn parse_response(body: &str) -> Result<Vec<SearchResult>, GeocodeError> {
    let places: Vec<Place> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

    Ok(places
        .into_iter()
        .filter_map(|place| {
            let x = place.lon.parse::<f64>().ok()?;
            let y = place.lat.parse::<f64>().ok()?;
            Some(SearchResult {
                label: place.display_name,
                x,
                y,
            })
        })
        .collect())
}
