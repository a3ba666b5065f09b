use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::auth::TokenSource;
use super::models::{ApiMediaItem, Filters, ListResponse, SearchRequest};
use crate::catalog::{Catalog, Fetch, Page};
use crate::error::{CatalogError, FetchError};
use crate::media::{CanvasSize, FetchableLocation, MediaId};

pub const API_BASE_URL: &str = "https://photoslibrary.googleapis.com/v1";

/// Builds the HTTP client shared by the token exchange and API calls.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Photos Library API client acting as catalog and image fetcher.
pub struct GooglePhotos {
    http: Client,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
    page_size: u32,
    photos_only: bool,
}

impl GooglePhotos {
    pub fn new(http: Client, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            tokens,
            base_url: API_BASE_URL.to_string(),
            page_size: 100,
            photos_only: true,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 100);
        self
    }

    /// When set, listing uses `mediaItems:search` restricted to photos.
    pub fn with_photos_only(mut self, photos_only: bool) -> Self {
        self.photos_only = photos_only;
        self
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, CatalogError> {
        let token = self.tokens.access_token().await?;
        Ok(request.bearer_auth(token))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CatalogError> {
        let response = self.authorized(request).await?.send().await?;
        handle_response(response).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, CatalogError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "photos api error: {body}");
        return Err(CatalogError::from_status(status.as_u16(), body));
    }
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Appends the rendition suffix that asks the server to bound the image size.
pub fn sized_url(location: &FetchableLocation, size: CanvasSize) -> String {
    format!("{}=w{}-h{}", location.as_str(), size.width, size.height)
}

#[async_trait]
impl Catalog for GooglePhotos {
    async fn list_page(&self, page_token: Option<&str>) -> Result<Page, CatalogError> {
        let request = if self.photos_only {
            self.http
                .post(format!("{}/mediaItems:search", self.base_url))
                .json(&SearchRequest {
                    page_size: self.page_size,
                    page_token,
                    filters: Filters::photos_only(),
                })
        } else {
            let mut query = vec![("pageSize", self.page_size.to_string())];
            if let Some(token) = page_token {
                query.push(("pageToken", token.to_string()));
            }
            self.http
                .get(format!("{}/mediaItems", self.base_url))
                .query(&query)
        };

        let listing: ListResponse = self.send_json(request).await?;
        debug!(
            items = listing.media_items.len(),
            more = listing.next_page_token.is_some(),
            "listed media items"
        );
        Ok(listing.into())
    }

    async fn resolve(&self, id: &MediaId) -> Result<FetchableLocation, CatalogError> {
        let request = self
            .http
            .get(format!("{}/mediaItems/{}", self.base_url, id.as_str()));
        let item: ApiMediaItem = self.send_json(request).await?;
        let base_url = item
            .base_url
            .ok_or_else(|| CatalogError::Malformed(format!("media item {id} has no baseUrl")))?;
        Ok(FetchableLocation::new(base_url))
    }
}

#[async_trait]
impl Fetch for GooglePhotos {
    async fn fetch(
        &self,
        location: &FetchableLocation,
        size_hint: CanvasSize,
    ) -> Result<Vec<u8>, FetchError> {
        let request = self.http.get(sized_url(location, size_hint));
        let response = self.authorized(request).await?.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
