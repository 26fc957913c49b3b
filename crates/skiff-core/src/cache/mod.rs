//! Content cache for reusable bundles.
//!
//! Bundles are keyed by name; an entry is built at most once per successful build, and
//! concurrent requests for the same key share the single in-flight build.
mod local;
pub use local::LocalContentCache;

use std::path::PathBuf;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::bundle::BundleError;

/// Produces a bundle at the given path.
pub type BuildFn =
    Box<dyn FnOnce(PathBuf) -> BoxFuture<'static, Result<(), BundleError>> + Send + 'static>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("building '{name}' failed: {source}")]
    Build {
        name: String,
        #[source]
        source: BundleError,
    },

    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A cached bundle on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub last_modified_ms: i64,
    /// `false` when this lookup ran the build.
    pub hit: bool,
}

#[async_trait]
pub trait ContentCache: Send + Sync {
    /// Artifact stored under `name`, running `build` if it does not exist yet.
    async fn get(&self, name: &str, build: BuildFn) -> Result<CachedArtifact, CacheError>;
}
