use async_trait::async_trait;
use thiserror::Error;

use skiff_model::{LaunchRequest, RunId};

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("launcher rejected run {run_id}: {reason}")]
    Rejected { run_id: RunId, reason: String },

    #[error("launcher '{launcher}' failed: {reason}")]
    Failed {
        launcher: &'static str,
        reason: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hands a prepared launch to the cluster.
///
/// Called once per launch with the complete file list; a returned error fails the launch.
/// Files under the run's staging directory are deleted once `launch` returns, so they must
/// be consumed (uploaded or copied) before that.
#[async_trait]
pub trait ClusterLauncher: Send + Sync {
    /// Launcher name for logs.
    fn name(&self) -> &'static str;

    async fn launch(&self, request: &LaunchRequest) -> Result<(), LauncherError>;
}
