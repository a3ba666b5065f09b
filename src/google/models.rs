//! Wire types of the Photos Library REST API.

use serde::{Deserialize, Serialize};

use crate::catalog::{MediaItem, MediaKind, Page};
use crate::media::MediaId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListResponse {
    #[serde(default)]
    pub media_items: Vec<ApiMediaItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl From<ListResponse> for Page {
    fn from(value: ListResponse) -> Self {
        Page {
            items: value.media_items.into_iter().map(MediaItem::from).collect(),
            next_page_token: value.next_page_token,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiMediaItem {
    pub id: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub media_metadata: Option<MediaMetadata>,
}

impl ApiMediaItem {
    fn kind(&self) -> MediaKind {
        if let Some(meta) = &self.media_metadata {
            if meta.video.is_some() {
                return MediaKind::Video;
            }
            if meta.photo.is_some() {
                return MediaKind::Photo;
            }
        }
        match self.mime_type.as_deref() {
            Some(mime) if mime.starts_with("image/") => MediaKind::Photo,
            Some(mime) if mime.starts_with("video/") => MediaKind::Video,
            _ => MediaKind::Other,
        }
    }
}

impl From<ApiMediaItem> for MediaItem {
    fn from(value: ApiMediaItem) -> Self {
        let kind = value.kind();
        MediaItem {
            id: MediaId::from(value.id),
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaMetadata {
    #[serde(default)]
    pub photo: Option<serde_json::Value>,
    #[serde(default)]
    pub video: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequest<'a> {
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<&'a str>,
    pub filters: Filters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Filters {
    pub media_type_filter: MediaTypeFilter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MediaTypeFilter {
    pub media_types: Vec<&'static str>,
}

impl Filters {
    pub fn photos_only() -> Self {
        Self {
            media_type_filter: MediaTypeFilter {
                media_types: vec!["PHOTO"],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_items_from_metadata_and_mime() {
        let raw = r#"{
            "mediaItems": [
                {"id": "p1", "baseUrl": "https://lh3/x", "mimeType": "image/jpeg",
                 "mediaMetadata": {"width": "10", "height": "5", "photo": {}}},
                {"id": "v1", "mimeType": "video/mp4", "mediaMetadata": {"video": {"fps": 30}}},
                {"id": "p2", "mimeType": "image/heic"},
                {"id": "o1"}
            ],
            "nextPageToken": "next"
        }"#;
        let page: Page = serde_json::from_str::<ListResponse>(raw).unwrap().into();
        let kinds: Vec<MediaKind> = page.items.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MediaKind::Photo,
                MediaKind::Video,
                MediaKind::Photo,
                MediaKind::Other
            ]
        );
        assert_eq!(page.next_token(), Some("next"));
    }

    #[test]
    fn empty_listing_has_no_items() {
        let page: Page = serde_json::from_str::<ListResponse>("{}").unwrap().into();
        assert!(page.items.is_empty());
        assert_eq!(page.next_token(), None);
    }

    #[test]
    fn search_request_omits_missing_token() {
        let body = SearchRequest {
            page_size: 50,
            page_token: None,
            filters: Filters::photos_only(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "pageSize": 50,
                "filters": {"mediaTypeFilter": {"mediaTypes": ["PHOTO"]}}
            })
        );
    }
}
