//! Boundary to the remote photo library.

use async_trait::async_trait;

use crate::error::{CatalogError, FetchError};
use crate::media::{CanvasSize, FetchableLocation, MediaId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: MediaId,
    pub kind: MediaKind,
}

impl MediaItem {
    pub fn photo(id: impl Into<MediaId>) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Photo,
        }
    }

    pub fn video(id: impl Into<MediaId>) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Video,
        }
    }

    pub fn is_photo(&self) -> bool {
        self.kind == MediaKind::Photo
    }
}

/// One page of the library listing.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<MediaItem>,
    pub next_page_token: Option<String>,
}

impl Page {
    /// Continuation token for the next request, if the listing goes on.
    pub fn next_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Lists one page. `None` requests the first page.
    async fn list_page(&self, page_token: Option<&str>) -> Result<Page, CatalogError>;

    /// Turns a stable id into a download URL valid for a short while.
    async fn resolve(&self, id: &MediaId) -> Result<FetchableLocation, CatalogError>;
}

#[async_trait]
pub trait Fetch: Send + Sync {
    /// Downloads the image at `location`, asking the server for a rendition
    /// no larger than `size_hint`.
    async fn fetch(
        &self,
        location: &FetchableLocation,
        size_hint: CanvasSize,
    ) -> Result<Vec<u8>, FetchError>;
}
