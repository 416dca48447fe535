//! JSON file state store: one file per `(collection_id, item_id)`.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::StateStore;
use crate::core::{StateRecord, STATE_SCHEMA_VERSION};
use crate::errors::StoreError;

/// Stores each record as pretty-printed JSON under a state directory.
///
/// Files are named `<collection_id>_<item_id>_state.json` with both ids
/// escaped, so each key maps to its own file. Writes go to a temporary
/// sibling first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    state_dir: PathBuf,
}

/// Escapes an identifier for use as one file name component.
///
/// ASCII alphanumerics, `-` and `.` pass through; every other byte, `_` and
/// `%` included, becomes `%XX`. Distinct ids always give distinct names, and
/// `_` is free to separate components.
pub(crate) fn escape_id(id: &str) -> String {
    let mut escaped = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.') {
            escaped.push(char::from(byte));
        } else {
            escaped.push_str(&format!("%{byte:02X}"));
        }
    }
    escaped
}

impl JsonFileStateStore {
    /// Creates a store rooted at `state_dir`. The directory is created on first save.
    #[must_use]
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// The state directory.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path of the state file for a key.
    #[must_use]
    pub fn state_path(&self, collection_id: &str, item_id: &str) -> PathBuf {
        self.state_dir.join(format!(
            "{}_{}_state.json",
            escape_id(collection_id),
            escape_id(item_id)
        ))
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };

        tokio::fs::create_dir_all(&self.state_dir).await.map_err(io_err)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self, collection_id: &str, item_id: &str) -> Option<StateRecord> {
        let path = self.state_path(collection_id, item_id);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No saved state");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read state file");
                return None;
            }
        };

        let state: StateRecord = match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt state file ignored");
                return None;
            }
        };

        if state.schema_version != STATE_SCHEMA_VERSION {
            warn!(
                path = %path.display(),
                found = state.schema_version,
                expected = STATE_SCHEMA_VERSION,
                "Unsupported state schema version ignored"
            );
            return None;
        }

        if state.collection_id() != collection_id || state.item_id() != item_id {
            warn!(
                path = %path.display(),
                stored_collection = %state.collection_id(),
                stored_item = %state.item_id(),
                "State file belongs to a different key"
            );
            return None;
        }

        Some(state)
    }

    async fn save(&self, state: &mut StateRecord) -> Result<(), StoreError> {
        state.touch();
        let path = self.state_path(state.collection_id(), state.item_id());

        let json = serde_json::to_vec_pretty(&*state).map_err(|source| StoreError::Serialize {
            collection_id: state.collection_id().to_string(),
            item_id: state.item_id().to_string(),
            source,
        })?;

        let result = self.write_atomic(&path, &json).await;
        if let Err(ref e) = result {
            warn!(path = %path.display(), error = %e, "Failed to save state");
        }
        result
    }
}
