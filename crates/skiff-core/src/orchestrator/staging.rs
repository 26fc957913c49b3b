use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use skiff_model::RunId;

use crate::error::LaunchError;

/// Per-run scratch directory.
///
/// Removed by [`StagingDir::close`] on success and on drop otherwise.
#[derive(Debug)]
pub(crate) struct StagingDir {
    dir: TempDir,
    path: PathBuf,
}

impl StagingDir {
    pub(crate) async fn create(root: &Path, run_id: RunId) -> Result<Self, LaunchError> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| LaunchError::io(format!("creating {}", root.display()), e))?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{run_id}-"))
            .tempdir_in(root)
            .map_err(|e| LaunchError::io("creating staging directory", e))?;
        let path = tokio::fs::canonicalize(dir.path())
            .await
            .map_err(|e| LaunchError::io("resolving staging directory", e))?;

        debug!(staging = %path.display(), "staging directory created");
        Ok(Self { dir, path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the directory; failures are logged, not returned.
    pub(crate) async fn close(self) {
        let path = self.path;
        let dir = self.dir;
        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => debug!(staging = %path.display(), "staging directory removed"),
            Ok(Err(e)) => warn!(staging = %path.display(), error = %e, "failed to remove staging directory"),
            Err(e) => warn!(staging = %path.display(), error = %e, "staging cleanup task failed"),
        }
    }
}
