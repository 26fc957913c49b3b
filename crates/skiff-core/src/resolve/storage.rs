use std::{
    fs::Metadata,
    path::{Component, Path, PathBuf},
    time::UNIX_EPOCH,
};

use async_trait::async_trait;
use tokio::io::AsyncRead;

use skiff_model::FileUri;

use super::ResolveError;

/// Size and modification time of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub last_modified_ms: i64,
}

impl FileStat {
    pub fn from_metadata(meta: &Metadata) -> Self {
        let last_modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self {
            size: meta.len(),
            last_modified_ms,
        }
    }

    pub async fn of_path(path: &Path) -> Result<Self, ResolveError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| ResolveError::from_io(path, e))?;
        Ok(Self::from_metadata(&meta))
    }
}

/// Storage the cluster reads natively.
///
/// Files on it are referenced in place; the launcher never copies them.
#[async_trait]
pub trait ClusterStorage: Send + Sync {
    /// URI scheme this storage serves.
    fn scheme(&self) -> &str;

    async fn stat(&self, uri: &FileUri) -> Result<FileStat, ResolveError>;

    async fn open(&self, uri: &FileUri) -> Result<Box<dyn AsyncRead + Send + Unpin>, ResolveError>;
}

/// [`ClusterStorage`] whose namespace is mounted on the local filesystem.
///
/// `<scheme>://<authority>/a/b` maps to `<mount>/a/b`. Paths that climb out of the mount
/// with `..` are reported as not found.
#[derive(Debug, Clone)]
pub struct MountedStorage {
    scheme: String,
    mount: PathBuf,
}

impl MountedStorage {
    pub fn new(scheme: impl Into<String>, mount: impl Into<PathBuf>) -> Self {
        Self {
            scheme: scheme.into(),
            mount: mount.into(),
        }
    }

    fn local_path(&self, uri: &FileUri) -> Result<PathBuf, ResolveError> {
        if !uri.has_scheme(&self.scheme) {
            return Err(ResolveError::UnsupportedScheme(uri.to_string()));
        }
        let relative = Path::new(uri.path().trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ResolveError::NotFound(uri.to_string()));
        }
        Ok(self.mount.join(relative))
    }
}

#[async_trait]
impl ClusterStorage for MountedStorage {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    async fn stat(&self, uri: &FileUri) -> Result<FileStat, ResolveError> {
        FileStat::of_path(&self.local_path(uri)?).await
    }

    async fn open(&self, uri: &FileUri) -> Result<Box<dyn AsyncRead + Send + Unpin>, ResolveError> {
        let path = self.local_path(uri)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| ResolveError::from_io(&path, e))?;
        Ok(Box::new(file))
    }
}
