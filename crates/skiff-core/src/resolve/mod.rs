//! Turning declared file references into launch-ready files.
//!
//! Three cases, checked in order:
//! - local files are only stat-ed;
//! - files on the cluster's native storage are stat-ed there and referenced in place;
//! - everything else is copied into the run's staging directory first.
mod storage;
pub use storage::{ClusterStorage, FileStat, MountedStorage};

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use skiff_model::{FileUri, LocalFileRef, ResolvedFile, file_extension};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("no handler for '{0}'")]
    UnsupportedScheme(String),

    #[error("fetching {uri} failed: {reason}")]
    Fetch { uri: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolveError {
    pub(crate) fn from_io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ResolveError::NotFound(path.display().to_string())
        } else {
            ResolveError::Io(err)
        }
    }
}

/// Copies a remote file into a local file.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Stream `uri` into `out`; returns the number of bytes written.
    async fn copy_to(&self, uri: &FileUri, out: &mut tokio::fs::File) -> Result<u64, ResolveError>;
}

/// [`RemoteFetcher`] for deployments without remote sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemoteFetcher;

#[async_trait]
impl RemoteFetcher for NoRemoteFetcher {
    async fn copy_to(&self, uri: &FileUri, _: &mut tokio::fs::File) -> Result<u64, ResolveError> {
        Err(ResolveError::UnsupportedScheme(uri.to_string()))
    }
}

#[derive(Clone)]
pub struct FileResolver {
    storage: Option<Arc<dyn ClusterStorage>>,
    fetcher: Arc<dyn RemoteFetcher>,
}

impl FileResolver {
    pub fn new(fetcher: Arc<dyn RemoteFetcher>) -> Self {
        Self {
            storage: None,
            fetcher,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn ClusterStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    fn cluster_storage(&self, uri: &FileUri) -> Option<&Arc<dyn ClusterStorage>> {
        self.storage
            .as_ref()
            .filter(|s| uri.has_scheme(s.scheme()))
    }

    /// Resolve one runnable-local file.
    ///
    /// Remote files land in `staging` and the result points at the staged copy.
    pub async fn resolve(
        &self,
        file: &LocalFileRef,
        staging: &Path,
    ) -> Result<ResolvedFile, ResolveError> {
        let uri = &file.uri;

        if let Some(path) = uri.to_local_path() {
            let stat = FileStat::of_path(&path).await?;
            trace!(file = %file.name, %uri, "local file");
            return Ok(file.resolve_to(uri.clone(), stat.last_modified_ms, stat.size));
        }

        if let Some(storage) = self.cluster_storage(uri) {
            let stat = storage.stat(uri).await?;
            trace!(file = %file.name, %uri, "cluster file");
            return Ok(file.resolve_to(uri.clone(), stat.last_modified_ms, stat.size));
        }

        let path = self.fetch_remote(&file.name, uri, staging).await?;
        let stat = FileStat::of_path(&path).await?;
        debug!(file = %file.name, %uri, staged = %path.display(), "remote file staged");
        Ok(file.resolve_to(FileUri::from_path(path), stat.last_modified_ms, stat.size))
    }

    /// Local path holding the contents of `uri`, copying into `staging` when needed.
    pub async fn materialize(&self, uri: &FileUri, staging: &Path) -> Result<PathBuf, ResolveError> {
        if let Some(path) = uri.to_local_path() {
            return match tokio::fs::try_exists(&path).await? {
                true => Ok(path),
                false => Err(ResolveError::NotFound(uri.to_string())),
            };
        }

        let name = uri.file_name();
        if let Some(storage) = self.cluster_storage(uri) {
            let mut reader = storage.open(uri).await?;
            let (mut out, path) = staged_file(name, staging)?;
            tokio::io::copy(&mut reader, &mut out).await?;
            out.flush().await?;
            return Ok(path);
        }

        self.fetch_remote(name, uri, staging).await
    }

    async fn fetch_remote(
        &self,
        name: &str,
        uri: &FileUri,
        staging: &Path,
    ) -> Result<PathBuf, ResolveError> {
        let (mut out, path) = staged_file(name, staging)?;
        let copied = self.fetcher.copy_to(uri, &mut out).await;
        if let Err(e) = copied {
            drop(out);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }
        out.flush().await?;
        out.sync_all().await?;
        Ok(path)
    }
}

/// New file in `staging` named `<name><random><ext>`.
fn staged_file(name: &str, staging: &Path) -> Result<(tokio::fs::File, PathBuf), ResolveError> {
    let base = if name.is_empty() { "file" } else { name };
    let (file, path) = tempfile::Builder::new()
        .prefix(base)
        .suffix(file_extension(base))
        .tempfile_in(staging)?
        .keep()
        .map_err(|e| ResolveError::Io(e.error))?;
    Ok((tokio::fs::File::from_std(file), path))
}
