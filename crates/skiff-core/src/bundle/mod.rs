//! Bundle packaging: class catalogs, fingerprints and zip output.
mod catalog;
pub use catalog::{BundleEntry, ClassCatalog, ManifestCatalog};

mod fingerprint;
pub use fingerprint::Fingerprint;

mod writer;
pub use writer::{write_bundle, write_directory_bundle};

use std::{fmt, path::PathBuf, sync::Arc};

use futures::FutureExt;
use thiserror::Error;

use skiff_model::{
    LOG_ONLY_EVENT_HANDLER, ModuleId,
    constants::{
        APPLICATION_BUNDLE, LAUNCHER_BUNDLE, RESOURCES_BUNDLE, RUNTIME_BUNDLE,
        RUNTIME_CONFIG_BUNDLE,
    },
};

use crate::cache::BuildFn;

/// Class ids packed into the bootstrap bundle.
pub const BOOTSTRAP_MODULES: &[&str] = &[
    "skiff.launcher.WrappedLauncher",
    "skiff.launcher.LauncherRunner",
];

/// Class ids packed into the runtime-support bundle.
pub const RUNTIME_MODULES: &[&str] = &[
    "skiff.agent.ApplicationMasterMain",
    "skiff.agent.ContainerMain",
    "skiff.agent.OptionSpec",
    LOG_ONLY_EVENT_HANDLER,
];

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("class '{0}' cannot be resolved")]
    Unresolved(ModuleId),

    #[error("module '{module}' declares missing file {}", .path.display())]
    MissingEntry { module: ModuleId, path: PathBuf },

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("two entries are named '{0}'")]
    DuplicateEntry(String),

    #[error("invalid class manifest: {0}")]
    Manifest(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bundle task failed: {0}")]
    Join(String),
}

/// The bundles shipped with every launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleKind {
    Bootstrap,
    RuntimeSupport,
    Application,
    Resources,
    RuntimeConfig,
}

impl BundleKind {
    /// Name the bundle is shipped under.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            BundleKind::Bootstrap => LAUNCHER_BUNDLE,
            BundleKind::RuntimeSupport => RUNTIME_BUNDLE,
            BundleKind::Application => APPLICATION_BUNDLE,
            BundleKind::Resources => RESOURCES_BUNDLE,
            BundleKind::RuntimeConfig => RUNTIME_CONFIG_BUNDLE,
        }
    }

    /// Whether the remote side expands the bundle after localizing it.
    pub fn is_archive(&self) -> bool {
        !matches!(self, BundleKind::Bootstrap)
    }

    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            BundleKind::Bootstrap => "bootstrap",
            BundleKind::RuntimeSupport => "runtime",
            BundleKind::Application => "application",
            BundleKind::Resources => "resources",
            BundleKind::RuntimeConfig => "runtime_config",
        }
    }
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Builder that resolves `ids` through `catalog` and zips the result.
///
/// Resolution and compression run on the blocking pool.
pub fn module_builder(catalog: Arc<dyn ClassCatalog>, ids: Vec<ModuleId>) -> BuildFn {
    Box::new(move |target: PathBuf| {
        async move {
            tokio::task::spawn_blocking(move || {
                let mut entries = Vec::new();
                for id in &ids {
                    entries.extend(catalog.entries(id)?);
                }
                write_bundle(&target, entries).map(|_| ())
            })
            .await
            .map_err(|e| BundleError::Join(e.to_string()))?
        }
        .boxed()
    })
}

/// Zip `entries` at `target` on the blocking pool.
pub async fn write_bundle_async(
    target: PathBuf,
    entries: Vec<BundleEntry>,
) -> Result<usize, BundleError> {
    tokio::task::spawn_blocking(move || write_bundle(&target, entries))
        .await
        .map_err(|e| BundleError::Join(e.to_string()))?
}

/// Zip every file below `dir` at `target` on the blocking pool.
pub async fn write_directory_bundle_async(
    target: PathBuf,
    dir: PathBuf,
) -> Result<usize, BundleError> {
    tokio::task::spawn_blocking(move || write_directory_bundle(&target, &dir))
        .await
        .map_err(|e| BundleError::Join(e.to_string()))?
}
