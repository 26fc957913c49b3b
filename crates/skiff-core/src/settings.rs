use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use skiff_model::constants::{DEFAULT_CONFIG_PREFIX, DEFAULT_LAUNCH_TIMEOUT_MS};

use crate::error::ConfigError;

/// Process-wide launch settings.
///
/// Every field has a default, so a partial JSON document or a sparse environment is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaunchSettings {
    /// Root for local working data.
    pub local_data_dir: PathBuf,
    /// Subdirectory of `local_data_dir` that holds per-run staging directories.
    pub temp_dir: String,
    /// Directory the content cache keeps reusable bundles in.
    pub cache_dir: PathBuf,
    /// Extra JVM options applied to every runnable.
    pub jvm_options: String,
    /// Only configuration keys with this prefix are shipped to the cluster.
    pub config_prefix: String,
    pub default_timeout_ms: u64,
    /// Optional logging configuration template placed in the runtime config bundle.
    pub logback_template: Option<PathBuf>,
    /// Extra files copied verbatim into the runtime config bundle.
    pub auxiliary_files: Vec<PathBuf>,
    /// Module manifest used to resolve class ids to files.
    pub manifest: Option<PathBuf>,
    /// URI scheme handled natively by the cluster storage.
    pub cluster_scheme: Option<String>,
    /// Local mount point of the cluster storage.
    pub cluster_mount: Option<PathBuf>,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            local_data_dir: PathBuf::from("data"),
            temp_dir: "tmp".to_string(),
            cache_dir: PathBuf::from("data/cache"),
            jvm_options: String::new(),
            config_prefix: DEFAULT_CONFIG_PREFIX.to_string(),
            default_timeout_ms: DEFAULT_LAUNCH_TIMEOUT_MS,
            logback_template: None,
            auxiliary_files: Vec::new(),
            manifest: None,
            cluster_scheme: None,
            cluster_mount: None,
        }
    }
}

impl LaunchSettings {
    /// Settings from `SKIFF_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings from an arbitrary variable lookup on top of the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("SKIFF_LOCAL_DATA_DIR") {
            settings.local_data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("SKIFF_TEMP_DIR") {
            settings.temp_dir = v;
        }
        if let Some(v) = var("SKIFF_CACHE_DIR") {
            settings.cache_dir = PathBuf::from(v);
        }
        if let Some(v) = var("SKIFF_JVM_OPTS") {
            settings.jvm_options = v;
        }
        if let Some(v) = var("SKIFF_CONFIG_PREFIX") {
            settings.config_prefix = v;
        }
        if let Some(v) = var("SKIFF_LAUNCH_TIMEOUT_MS") {
            settings.default_timeout_ms = v.trim().parse().map_err(|_| {
                ConfigError::InvalidArgument(format!("SKIFF_LAUNCH_TIMEOUT_MS: '{v}' is not a number"))
            })?;
        }
        if let Some(v) = var("SKIFF_LOGBACK_TEMPLATE") {
            settings.logback_template = Some(PathBuf::from(v));
        }
        if let Some(v) = var("SKIFF_AUX_FILES") {
            settings.auxiliary_files = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
        }
        if let Some(v) = var("SKIFF_MANIFEST") {
            settings.manifest = Some(PathBuf::from(v));
        }
        if let Some(v) = var("SKIFF_CLUSTER_SCHEME") {
            settings.cluster_scheme = Some(v);
        }
        if let Some(v) = var("SKIFF_CLUSTER_MOUNT") {
            settings.cluster_mount = Some(PathBuf::from(v));
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temp_dir.trim().is_empty() {
            return Err(ConfigError::InvalidArgument("temp_dir must not be empty".into()));
        }
        if self.cluster_scheme.is_some() != self.cluster_mount.is_some() {
            return Err(ConfigError::InvalidArgument(
                "cluster_scheme and cluster_mount must be set together".into(),
            ));
        }
        Ok(())
    }

    /// Directory under which per-run staging directories are created.
    pub fn staging_root(&self) -> PathBuf {
        self.local_data_dir.join(&self.temp_dir)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}
