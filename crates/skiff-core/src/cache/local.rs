use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::UNIX_EPOCH,
};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use super::{BuildFn, CacheError, CachedArtifact, ContentCache};

/// [`ContentCache`] over a local directory.
///
/// Artifacts are built into a temporary file next to their final location and renamed into
/// place, so a partially written bundle is never visible under its cache name. Artifacts
/// already on disk from an earlier process are reused.
#[derive(Debug)]
pub struct LocalContentCache {
    root: PathBuf,
    entries: Mutex<HashMap<String, Arc<OnceCell<PathBuf>>>>,
}

impl LocalContentCache {
    /// Open (and create) the cache directory.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let root = std::fs::canonicalize(root.as_ref())?;
        debug!(root = %root.display(), "content cache opened");
        Ok(Self {
            root,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cell(&self, name: &str) -> Arc<OnceCell<PathBuf>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(name.to_string()).or_default().clone()
    }

    async fn build_into(&self, name: &str, target: &Path, build: BuildFn) -> Result<(), CacheError> {
        let partial = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".partial")
            .tempfile_in(&self.root)?
            .into_temp_path();

        build(partial.to_path_buf())
            .await
            .map_err(|source| CacheError::Build {
                name: name.to_string(),
                source,
            })?;

        partial.persist(target).map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl ContentCache for LocalContentCache {
    async fn get(&self, name: &str, build: BuildFn) -> Result<CachedArtifact, CacheError> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(CacheError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid cache key '{name}'"),
            )));
        }

        let cell = self.cell(name);
        let target = self.root.join(name);
        let built = AtomicBool::new(false);

        let path = cell
            .get_or_try_init(|| async {
                if tokio::fs::try_exists(&target).await? {
                    trace!(name, "reusing artifact from disk");
                    return Ok(target.clone());
                }
                built.store(true, Ordering::Relaxed);
                debug!(name, "building artifact");
                self.build_into(name, &target, build).await?;
                Ok::<_, CacheError>(target.clone())
            })
            .await?
            .clone();

        let meta = tokio::fs::metadata(&path).await?;
        let last_modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        Ok(CachedArtifact {
            name: name.to_string(),
            path,
            size: meta.len(),
            last_modified_ms,
            hit: !built.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use futures::FutureExt;

    use super::*;
    use crate::bundle::BundleError;

    fn counting_builder(counter: Arc<AtomicUsize>, body: &'static [u8]) -> BuildFn {
        Box::new(move |target: PathBuf| {
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                tokio::fs::write(&target, body).await?;
                Ok::<(), BundleError>(())
            }
            .boxed()
        })
    }

    fn failing_builder() -> BuildFn {
        Box::new(|_target: PathBuf| {
            async { Err::<(), _>(BundleError::Unresolved("acme.Missing".into())) }.boxed()
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_build_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(LocalContentCache::open(dir.path()).unwrap());
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get("runtime.zip", counting_builder(counter, b"bundle"))
                    .await
            }));
        }

        let mut hits = 0;
        for h in handles {
            let artifact = h.await.unwrap().unwrap();
            assert_eq!(artifact.size, 6);
            if artifact.hit {
                hits += 1;
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(hits, 7);
    }

    #[tokio::test]
    async fn second_lookup_is_a_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalContentCache::open(dir.path()).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get("a.zip", counting_builder(counter.clone(), b"x"))
            .await
            .unwrap();
        let second = cache
            .get("a.zip", counting_builder(counter.clone(), b"y"))
            .await
            .unwrap();

        assert!(!first.hit);
        assert!(second.hit);
        assert_eq!(first.path, second.path);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn artifacts_on_disk_survive_a_new_cache_instance() {
        let dir = tempfile::tempdir().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        LocalContentCache::open(dir.path())
            .unwrap()
            .get("a.zip", counting_builder(counter.clone(), b"x"))
            .await
            .unwrap();
        let reopened = LocalContentCache::open(dir.path())
            .unwrap()
            .get("a.zip", counting_builder(counter.clone(), b"x"))
            .await
            .unwrap();

        assert!(reopened.hit);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_build_leaves_no_entry_and_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalContentCache::open(dir.path()).unwrap();

        let err = cache.get("a.zip", failing_builder()).await.unwrap_err();
        assert!(matches!(err, CacheError::Build { .. }));
        assert!(!dir.path().join("a.zip").exists());

        let counter = Arc::new(AtomicUsize::new(0));
        let artifact = cache
            .get("a.zip", counting_builder(counter, b"ok"))
            .await
            .unwrap();
        assert!(!artifact.hit);
    }

    #[tokio::test]
    async fn keys_with_separators_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalContentCache::open(dir.path()).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        assert!(
            cache
                .get("../escape.zip", counting_builder(counter, b"x"))
                .await
                .is_err()
        );
    }
}
