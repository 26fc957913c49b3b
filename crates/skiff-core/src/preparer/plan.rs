use std::collections::BTreeMap;

use skiff_model::{
    Arguments, DebugOptions, Env, EventHandlerSpec, FileUri, JvmOptions, LogLevel, ModuleId,
    ProgramRun, ProgramSpec, Properties, RunId, RunnableName, RunnableSpec,
    constants::CONTAINER_CLASSLOADER_PROPERTY, join_options,
};

/// Frozen launch configuration produced by [`crate::Preparer::freeze`].
///
/// Read-only from here on; the orchestrator only consumes it.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub(crate) program: ProgramSpec,
    pub(crate) run: ProgramRun,
    pub(crate) config: Properties,
    pub(crate) runnable_configs: BTreeMap<RunnableName, Properties>,
    pub(crate) jvm_extra: String,
    pub(crate) runnable_jvm: BTreeMap<RunnableName, String>,
    pub(crate) debug: DebugOptions,
    pub(crate) class_loader: Option<String>,
    pub(crate) arguments: Arguments,
    pub(crate) dependencies: Vec<ModuleId>,
    pub(crate) resources: Vec<FileUri>,
    pub(crate) class_paths: Vec<String>,
    pub(crate) application_class_paths: Vec<String>,
    pub(crate) environments: BTreeMap<RunnableName, Env>,
    pub(crate) max_retries: BTreeMap<RunnableName, u32>,
    pub(crate) log_levels: BTreeMap<RunnableName, BTreeMap<String, LogLevel>>,
}

impl LaunchPlan {
    pub fn run_id(&self) -> RunId {
        self.run.run_id
    }

    pub fn run(&self) -> &ProgramRun {
        &self.run
    }

    pub fn program(&self) -> &ProgramSpec {
        &self.program
    }

    pub fn cluster(&self) -> &str {
        &self.run.cluster.name
    }

    pub fn runnables(&self) -> impl Iterator<Item = &RunnableSpec> {
        self.program.runnables.values()
    }

    /// Configured handler, or the log-only default.
    pub fn event_handler(&self) -> EventHandlerSpec {
        self.program
            .event_handler
            .clone()
            .unwrap_or_else(EventHandlerSpec::log_only)
    }

    pub fn config(&self) -> &Properties {
        &self.config
    }

    pub fn runnable_configs(&self) -> &BTreeMap<RunnableName, Properties> {
        &self.runnable_configs
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn dependencies(&self) -> &[ModuleId] {
        &self.dependencies
    }

    pub fn resources(&self) -> &[FileUri] {
        &self.resources
    }

    pub fn class_paths(&self) -> &[String] {
        &self.class_paths
    }

    pub fn application_class_paths(&self) -> &[String] {
        &self.application_class_paths
    }

    pub fn environments(&self) -> &BTreeMap<RunnableName, Env> {
        &self.environments
    }

    pub fn max_retries(&self) -> &BTreeMap<RunnableName, u32> {
        &self.max_retries
    }

    pub fn log_levels(&self) -> &BTreeMap<RunnableName, BTreeMap<String, LogLevel>> {
        &self.log_levels
    }

    pub fn class_loader(&self) -> Option<&str> {
        self.class_loader.as_deref()
    }

    /// Effective JVM options.
    ///
    /// The class loader property is appended to the global options; runnable-specific options
    /// are joined after the global ones.
    pub fn jvm_options(&self) -> JvmOptions {
        let extra = match &self.class_loader {
            Some(loader) => join_options(
                &self.jvm_extra,
                &format!("-D{CONTAINER_CLASSLOADER_PROPERTY}={loader}"),
            ),
            None => self.jvm_extra.clone(),
        };
        let runnables = self
            .runnable_jvm
            .iter()
            .map(|(name, opts)| (name.clone(), join_options(&extra, opts)))
            .collect();

        JvmOptions {
            extra,
            runnables,
            debug: self.debug.clone(),
        }
    }

    /// Class ids that make up the application bundle.
    ///
    /// Runnable entry points, a user supplied event handler and the declared dependencies,
    /// sorted and without duplicates.
    pub fn application_modules(&self) -> Vec<ModuleId> {
        let mut modules: Vec<ModuleId> = self
            .runnables()
            .map(|r| r.entry_point.class_name.clone())
            .chain(self.program.event_handler.iter().map(|h| h.class_name.clone()))
            .chain(self.dependencies.iter().cloned())
            .collect();
        modules.sort();
        modules.dedup();
        modules
    }
}
