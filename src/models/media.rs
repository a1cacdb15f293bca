use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub path: Option<String>,
    pub media_type: MediaType,
    pub cat_id: Option<Uuid>,
    pub size: i64,
    pub mime_type: Option<String>,
    pub file_hash: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub locked: bool,
    pub lock_reason: Option<String>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaItem {
    pub fn lifecycle(&self) -> MediaLifecycle {
        if self.deleted {
            MediaLifecycle::Trashed
        } else {
            MediaLifecycle::Active
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Classify a MIME type, `None` for anything that is not image or video
    pub fn from_mime(mime: &str) -> Option<Self> {
        if mime.starts_with("image/") {
            Some(Self::Image)
        } else if mime.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaLifecycle {
    Active,
    Trashed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaListQuery {
    pub cat_id: Option<Uuid>,
    pub media_type: Option<MediaType>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Input for storing an uploaded file
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub name: String,
    pub data: bytes::Bytes,
    pub cat_id: Option<Uuid>,
    pub uploaded_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterExternalMediaRequest {
    pub name: String,
    pub url: String,
    pub media_type: MediaType,
    pub cat_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockMediaRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStats {
    pub active: u64,
    pub trashed: u64,
    pub locked: u64,
    pub total_bytes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyTrashResult {
    pub purged: u64,
    pub skipped_locked: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_from_mime() {
        assert_eq!(MediaType::from_mime("image/png"), Some(MediaType::Image));
        assert_eq!(MediaType::from_mime("video/mp4"), Some(MediaType::Video));
        assert_eq!(MediaType::from_mime("application/pdf"), None);
    }
}
