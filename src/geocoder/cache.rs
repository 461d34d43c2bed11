use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::GeocodeError;

use super::{Geocoder, SearchResult};

/// Time-to-live for cached answers (10 minutes)
const RESULTS_TTL: Duration = Duration::from_secs(600);

/// Cached answer with timestamp
struct CachedResults {
    results: Vec<SearchResult>,
    timestamp: Instant,
}

/// In-memory, per-session cache in front of a geocoder
///
/// Only successful answers are kept, so a provider outage is retried on
/// the next search.
pub struct CachedGeocoder<G> {
    inner: G,
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedResults>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self::with_ttl(inner, RESULTS_TTL)
    }

    pub fn with_ttl(inner: G, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get cached results if still valid
    fn get(&self, key: &str) -> Option<Vec<SearchResult>> {
        let entries = self.entries.read();
        let cached = entries.get(key)?;
        if cached.timestamp.elapsed() < self.ttl {
            debug!(query = key, "Using cached geocoding results");
            return Some(cached.results.clone());
        }
        None
    }

    fn set(&self, key: String, results: Vec<SearchResult>) {
        self.entries.write().insert(
            key,
            CachedResults {
                results,
                timestamp: Instant::now(),
            },
        );
    }
}

/// Queries differing only in case or surrounding spaces share an entry
fn cache_key(query: &str) -> String {
    query.trim().to_lowercase()
}

impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<SearchResult>, GeocodeError>> {
        Box::pin(async move {
            let key = cache_key(query);
            if let Some(results) = self.get(&key) {
                return Ok(results);
            }

            let results = self.inner.search(query).await?;
            self.set(key, results.clone());
            Ok(results)
        })
    }
}
