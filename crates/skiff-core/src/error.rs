use thiserror::Error;

use skiff_model::{ModelError, RunId};

use crate::bundle::BundleError;
use crate::cache::CacheError;
use crate::launcher::LauncherError;
use crate::orchestrator::LaunchStage;
use crate::resolve::ResolveError;

/// Rejected configuration call on a [`crate::Preparer`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("runnable '{0}' is not defined in the program")]
    UnknownRunnable(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("exactly one runnable is supported, program declares {0}")]
    RunnableCount(usize),
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "aborting launch of run {run_id} at {stage}: timed out after {elapsed_ms}ms (limit {timeout_ms}ms)"
    )]
    Timeout {
        run_id: RunId,
        stage: LaunchStage,
        elapsed_ms: u64,
        timeout_ms: u64,
    },

    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("descriptor error: {0}")]
    Descriptor(#[from] ModelError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("dispatch failed: {0}")]
    Dispatch(#[from] LauncherError),
}

impl LaunchError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LaunchError::Io {
            context: context.into(),
            source,
        }
    }

    /// Short category label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LaunchError::Config(_) => "config",
            LaunchError::Timeout { .. } => "timeout",
            LaunchError::Bundle(_) => "bundle",
            LaunchError::Cache(_) => "cache",
            LaunchError::Resolve(_) => "resolve",
            LaunchError::Descriptor(_) => "descriptor",
            LaunchError::Io { .. } => "io",
            LaunchError::Dispatch(_) => "dispatch",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LaunchError::Timeout { .. })
    }
}
