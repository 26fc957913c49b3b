use std::{collections::BTreeMap, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

use skiff_core::{ConfigError, LaunchPlan, LaunchSettings, Preparer};
use skiff_model::{ClusterTarget, FileUri, LogLevel, ProgramRun, ProgramSpec, Properties, RunId};

/// One launch, as read from disk.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchFile {
    pub program: ProgramSpec,
    pub run: RunSection,
    #[serde(default)]
    pub options: LaunchOptions,
}

/// Run identity; a fresh run id is generated when none is given.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSection {
    #[serde(default)]
    pub run_id: Option<RunId>,
    pub namespace: String,
    pub application: String,
    pub cluster: ClusterTarget,
    #[serde(default)]
    pub arguments: Properties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaunchOptions {
    pub configuration: BTreeMap<String, String>,
    pub runnable_configuration: BTreeMap<String, BTreeMap<String, String>>,
    pub jvm_options: Option<String>,
    pub extra_jvm_options: Option<String>,
    pub runnable_jvm_options: BTreeMap<String, String>,
    pub debug: Option<DebugRequest>,
    pub application_arguments: Vec<String>,
    pub arguments: BTreeMap<String, Vec<String>>,
    pub dependencies: Vec<String>,
    pub resources: Vec<FileUri>,
    pub class_paths: Vec<String>,
    pub application_class_paths: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub runnable_env: BTreeMap<String, BTreeMap<String, String>>,
    pub max_retries: BTreeMap<String, u32>,
    pub log_level: Option<LogLevel>,
    pub log_levels: BTreeMap<String, String>,
    pub runnable_log_levels: BTreeMap<String, BTreeMap<String, String>>,
    pub class_loader: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DebugRequest {
    pub suspend: bool,
    pub runnables: Vec<String>,
}

impl LaunchFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading launch file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing launch file {}", path.display()))
    }

    /// Explicit timeout of this launch, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.options.timeout_ms.map(Duration::from_millis)
    }

    /// Applies every option to a [`Preparer`] and freezes it.
    pub fn into_plan(self, settings: &LaunchSettings) -> Result<LaunchPlan, ConfigError> {
        let mut run = ProgramRun::new(
            self.run.namespace,
            self.run.application,
            self.program.name.clone(),
            self.run.cluster,
        );
        if let Some(run_id) = self.run.run_id {
            run.run_id = run_id;
        }
        run.arguments = self.run.arguments;

        let o = self.options;
        let mut p = Preparer::new(self.program, run, settings)?
            .with_configuration(o.configuration)
            .with_application_arguments(o.application_arguments)
            .with_dependencies(o.dependencies)
            .with_resources(o.resources)
            .with_class_paths(o.class_paths)
            .with_application_class_paths(o.application_class_paths)
            .with_env(o.env)?;

        if let Some(jvm) = o.jvm_options {
            p = p.set_jvm_options(jvm);
        }
        if let Some(extra) = o.extra_jvm_options {
            p = p.add_jvm_options(extra);
        }
        if let Some(debug) = o.debug {
            let runnables: Vec<&str> = debug.runnables.iter().map(String::as_str).collect();
            p = p.enable_debugging(debug.suspend, &runnables)?;
        }
        if let Some(level) = o.log_level {
            p = p.set_log_level(level);
        }
        if !o.log_levels.is_empty() {
            p = p.set_log_levels(o.log_levels)?;
        }
        if let Some(loader) = o.class_loader {
            p = p.set_class_loader(loader)?;
        }

        for (runnable, config) in o.runnable_configuration {
            p = p.with_runnable_configuration(&runnable, config)?;
        }
        for (runnable, jvm) in o.runnable_jvm_options {
            p = p.set_runnable_jvm_options(&runnable, jvm)?;
        }
        for (runnable, args) in o.arguments {
            p = p.with_arguments(&runnable, args)?;
        }
        for (runnable, env) in o.runnable_env {
            p = p.with_runnable_env(&runnable, env)?;
        }
        for (runnable, retries) in o.max_retries {
            p = p.with_max_retries(&runnable, retries)?;
        }
        for (runnable, levels) in o.runnable_log_levels {
            p = p.set_runnable_log_levels(&runnable, levels)?;
        }

        Ok(p.freeze())
    }
}
