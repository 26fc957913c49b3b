use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;

use super::BundleError;

/// One file placed in a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// `/`-separated path inside the archive.
    pub name: String,
    pub source: PathBuf,
}

impl BundleEntry {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Maps class ids to the files that implement them.
pub trait ClassCatalog: Send + Sync {
    /// Files backing `id`. Unknown ids are an error.
    fn entries(&self, id: &str) -> Result<Vec<BundleEntry>, BundleError>;
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    base: Option<PathBuf>,
    modules: BTreeMap<String, Vec<String>>,
}

/// [`ClassCatalog`] backed by a JSON manifest.
///
/// ```json
/// { "base": "lib", "modules": { "acme.Worker": ["acme/Worker.class", "acme/support"] } }
/// ```
///
/// Paths are relative to `base`, which itself is relative to the manifest's directory.
/// A directory path contributes every file below it.
#[derive(Debug, Clone, Default)]
pub struct ManifestCatalog {
    base: PathBuf,
    modules: BTreeMap<String, Vec<String>>,
}

impl ManifestCatalog {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            modules: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let raw = fs::read_to_string(path)?;
        let manifest: ManifestFile = serde_json::from_str(&raw)
            .map_err(|e| BundleError::Manifest(format!("{}: {e}", path.display())))?;

        let dir = path.parent().unwrap_or(Path::new("."));
        let base = match manifest.base {
            Some(base) => dir.join(base),
            None => dir.to_path_buf(),
        };
        debug!(manifest = %path.display(), modules = manifest.modules.len(), "class manifest loaded");

        Ok(Self {
            base,
            modules: manifest.modules,
        })
    }

    /// Register `id` with paths relative to the catalog base.
    pub fn insert<I, S>(&mut self, id: impl Into<String>, paths: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules
            .insert(id.into(), paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ClassCatalog for ManifestCatalog {
    fn entries(&self, id: &str) -> Result<Vec<BundleEntry>, BundleError> {
        let paths = self
            .modules
            .get(id)
            .ok_or_else(|| BundleError::Unresolved(id.to_string()))?;

        let mut out = Vec::new();
        for rel in paths {
            let rel = rel.trim_start_matches('/');
            let source = self.base.join(rel);
            if source.is_dir() {
                collect_dir(&source, rel.trim_end_matches('/'), &mut out)?;
            } else if source.is_file() {
                out.push(BundleEntry::new(rel, source));
            } else {
                return Err(BundleError::MissingEntry {
                    module: id.to_string(),
                    path: source,
                });
            }
        }
        Ok(out)
    }
}

/// Every file under `dir`, named `<prefix>/<relative path>`.
pub(crate) fn collect_dir(
    dir: &Path,
    prefix: &str,
    out: &mut Vec<BundleEntry>,
) -> Result<(), BundleError> {
    let mut children: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, std::io::Error>>()?;
    children.sort_by_key(|e| e.file_name());

    for child in children {
        let file_name = child.file_name();
        let file_name = file_name.to_string_lossy();
        let name = if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{prefix}/{file_name}")
        };
        let path = child.path();
        if child.file_type()?.is_dir() {
            collect_dir(&path, &name, out)?;
        } else {
            out.push(BundleEntry::new(name, path));
        }
    }
    Ok(())
}
