//! Media source backed by JSON dumps on disk.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use super::{MediaItem, MediaSource};
use crate::errors::SourceError;

/// Reads `<dir>/<item_id>.json` files written by the transcript fetch tool.
///
/// The expected shape is
/// `{"video_id": ..., "transcript": [...], "video_info": {"video": {...}, "channel": {...}}}`;
/// extra fields are ignored.
#[derive(Debug, Clone)]
pub struct JsonDumpSource {
    dir: PathBuf,
}

impl JsonDumpSource {
    /// Creates a source reading from `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the dump for an item.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidId`] when the id is empty, is `.` or
    /// `..`, or contains a path separator, so lookups stay inside `dir`.
    pub fn path_for(&self, item_id: &str) -> Result<PathBuf, SourceError> {
        let invalid = item_id.is_empty()
            || matches!(item_id, "." | "..")
            || item_id.contains(['/', '\\', '\0']);
        if invalid {
            return Err(SourceError::InvalidId {
                item_id: item_id.to_string(),
            });
        }
        Ok(self.dir.join(format!("{item_id}.json")))
    }
}

#[async_trait]
impl MediaSource for JsonDumpSource {
    async fn fetch(&self, item_id: &str) -> Result<MediaItem, SourceError> {
        let path = self.path_for(item_id)?;
        debug!(path = %path.display(), "Reading item dump");

        let raw = tokio::fs::read_to_string(&path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                SourceError::NotFound {
                    item_id: item_id.to_string(),
                }
            } else {
                SourceError::Io {
                    item_id: item_id.to_string(),
                    source,
                }
            }
        })?;

        serde_json::from_str(&raw).map_err(|source| SourceError::Malformed {
            item_id: item_id.to_string(),
            source,
        })
    }
}
