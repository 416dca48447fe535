//! Output compilation phase.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::PhaseExecutor;
use crate::core::{ErrorRecord, Phase, PhaseOutput, StateRecord};
use crate::source::MediaItem;
use crate::store::escape_id;

/// Writes the compiled extraction result to `<output_dir>/<item_id>.json`,
/// with the id escaped the same way as state file names.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    output_dir: PathBuf,
}

impl CompileOutput {
    /// Creates the executor.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Destination of the result file for an item.
    #[must_use]
    pub fn output_path(&self, item_id: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", escape_id(item_id)))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, path).await
    }
}

#[async_trait]
impl PhaseExecutor for CompileOutput {
    fn phase(&self) -> Phase {
        Phase::CompileOutput
    }

    async fn execute(&self, state: &StateRecord, _item: &MediaItem) -> PhaseOutput {
        let path = self.output_path(state.item_id());
        let fail = |message: String| {
            warn!(path = %path.display(), error = %message, "Failed to write extraction result");
            PhaseOutput::failed(ErrorRecord::new(self.phase().as_str(), message, 0))
        };

        let json = match serde_json::to_vec_pretty(&state.compile()) {
            Ok(json) => json,
            Err(e) => return fail(e.to_string()),
        };
        if let Err(e) = self.write(&path, &json).await {
            return fail(format!("{}: {e}", path.display()));
        }

        info!(item_id = %state.item_id(), path = %path.display(), "Wrote extraction result");
        PhaseOutput::complete().with_final_output_path(path)
    }
}
