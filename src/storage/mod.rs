//! Local media file storage
//!
//! Uploaded files live under a single media directory, split into `images/`
//! and `videos/`. Every path handed to the filesystem is validated against
//! that directory first.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{StorageError, StorageResult};
use crate::models::MediaType;

pub mod security;

/// Facts about a file written to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Path relative to the media directory
    pub relative_path: String,
    pub size: i64,
    pub mime_type: String,
    pub media_type: MediaType,
    pub file_hash: String,
    pub dimensions: Option<(u32, u32)>,
}

/// Detected content type of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedType {
    pub mime_type: String,
    pub extension: String,
    pub media_type: MediaType,
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
    base_dir: PathBuf,
}

impl MediaStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub async fn ensure_storage_dirs(&self) -> StorageResult<()> {
        for sub in ["images", "videos"] {
            let dir = self.base_dir.join(sub);
            if !dir.exists() {
                fs::create_dir_all(&dir).await?;
            }
        }
        Ok(())
    }

    /// Identify an upload by magic number; anything but image/video is rejected
    pub fn detect_type(data: &[u8]) -> StorageResult<DetectedType> {
        let kind = infer::get(data).ok_or_else(|| StorageError::UnsupportedContentType {
            content_type: "unknown".to_string(),
        })?;

        let media_type =
            MediaType::from_mime(kind.mime_type()).ok_or_else(|| {
                StorageError::UnsupportedContentType {
                    content_type: kind.mime_type().to_string(),
                }
            })?;

        Ok(DetectedType {
            mime_type: kind.mime_type().to_string(),
            extension: kind.extension().to_string(),
            media_type,
        })
    }

    /// Write an upload under a name derived from `media_id`
    pub async fn save(&self, data: &[u8], media_id: Uuid) -> StorageResult<StoredFile> {
        let detected = Self::detect_type(data)?;
        self.ensure_storage_dirs().await?;

        let folder = match detected.media_type {
            MediaType::Image => "images",
            MediaType::Video => "videos",
        };
        let relative_path = format!("{}/{}.{}", folder, media_id, detected.extension);
        let full_path = self.resolve(&relative_path)?;

        let dimensions = match detected.media_type {
            MediaType::Image => Self::get_image_dimensions(data),
            MediaType::Video => None,
        };

        fs::write(&full_path, data).await?;
        debug!("Stored media file {} ({} bytes)", relative_path, data.len());

        Ok(StoredFile {
            relative_path,
            size: data.len() as i64,
            mime_type: detected.mime_type,
            media_type: detected.media_type,
            file_hash: Self::hash(data),
            dimensions,
        })
    }

    pub async fn read(&self, relative_path: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.resolve(relative_path)?;
        Ok(fs::read(full_path).await?)
    }

    /// Delete a stored file; a missing file is not an error
    pub async fn delete(&self, relative_path: &str) -> StorageResult<()> {
        let full_path = self.resolve(relative_path)?;
        if full_path.exists() {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    /// Hex encoded SHA-256 of the content
    pub fn hash(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    fn resolve(&self, relative_path: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(relative_path);
        security::validate_relative_path(relative)?;
        let full_path = self.base_dir.join(relative);
        if self.base_dir.exists() {
            security::validate_path_within_sandbox(&full_path, &self.base_dir)?;
        }
        Ok(full_path)
    }

    fn get_image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
        image::load_from_memory(data)
            .ok()
            .map(|img| (img.width(), img.height()))
    }
}
