use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::error::FeedError;
use crate::item::MapItem;

/// Client for the item feed endpoint
pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch the item list, degrading to an empty list on any failure
    #[instrument(skip(self))]
    pub async fn fetch_items(&self, endpoint: &str) -> Vec<MapItem> {
        match self.try_fetch_items(endpoint).await {
            Ok(items) => {
                info!(count = items.len(), "Fetched items");
                items
            }
            Err(e) => {
                warn!(error = %e, "Item feed unavailable, showing an empty map");
                Vec::new()
            }
        }
    }

    async fn try_fetch_items(&self, endpoint: &str) -> Result<Vec<MapItem>, FeedError> {
        debug!(endpoint, "Fetching");

        let response = self.client.get(endpoint).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::HttpStatus(response.status()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"[
        {"id": 1, "coordinates": {"type": "Point", "coordinates": [2.35, 48.86]}, "category": "groups"},
        {"id": 2, "coordinates": {"type": "Point", "coordinates": [2.35, 48.86]}, "category": "events"}
    ]"#;

    async fn serve(status: usize, body: &str) -> mockito::ServerGuard {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/items.json")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;
        server
    }

    #[tokio::test]
    async fn test_fetch_items() {
        let server = serve(200, FEED).await;
        let feed = FeedClient::new(Client::new());

        let items = feed.fetch_items(&format!("{}/items.json", server.url())).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, "2");
    }

    #[tokio::test]
    async fn test_error_status_yields_empty() {
        let server = serve(500, FEED).await;
        let feed = FeedClient::new(Client::new());

        let items = feed.fetch_items(&format!("{}/items.json", server.url())).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_yields_empty() {
        let server = serve(200, "<html>oops</html>").await;
        let feed = FeedClient::new(Client::new());

        let items = feed.fetch_items(&format!("{}/items.json", server.url())).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_yields_empty() {
        let feed = FeedClient::new(Client::new());
        assert!(feed.fetch_items("http://127.0.0.1:9/items.json").await.is_empty());
    }
}
