//! Fluent configuration of a single program run.
//!
//! A [`Preparer`] collects everything the remote side needs and is frozen into a
//! [`LaunchPlan`] before the orchestrator touches the filesystem.
mod plan;
pub use plan::LaunchPlan;

use std::collections::BTreeMap;

use tracing::debug;

use skiff_model::{
    Arguments, DebugOptions, Env, FileUri, LogLevel, ModuleId, ProgramRun, ProgramSpec,
    Properties, RunnableName, constants::ROOT_LOGGER, join_options,
};

use crate::error::ConfigError;
use crate::settings::LaunchSettings;

/// Builder for a [`LaunchPlan`].
///
/// Calls that name a runnable fail with [`ConfigError::UnknownRunnable`] when the program does
/// not declare it; nothing is recorded in that case.
#[derive(Debug, Clone)]
pub struct Preparer {
    plan: LaunchPlan,
}

impl Preparer {
    /// Start configuring `run` of `program`.
    ///
    /// Only single-runnable programs are accepted. Global JVM options start from
    /// [`LaunchSettings::jvm_options`].
    pub fn new(
        program: ProgramSpec,
        run: ProgramRun,
        settings: &LaunchSettings,
    ) -> Result<Self, ConfigError> {
        if program.runnables.len() != 1 {
            return Err(ConfigError::RunnableCount(program.runnables.len()));
        }
        debug!(run_id = %run.run_id, program = %program.name, "preparing launch");

        Ok(Self {
            plan: LaunchPlan {
                program,
                run,
                config: Properties::new(),
                runnable_configs: BTreeMap::new(),
                jvm_extra: settings.jvm_options.clone(),
                runnable_jvm: BTreeMap::new(),
                debug: DebugOptions::disabled(),
                class_loader: None,
                arguments: Arguments::default(),
                dependencies: Vec::new(),
                resources: Vec::new(),
                class_paths: Vec::new(),
                application_class_paths: Vec::new(),
                environments: BTreeMap::new(),
                max_retries: BTreeMap::new(),
                log_levels: BTreeMap::new(),
            },
        })
    }

    fn check_runnable(&self, name: &str) -> Result<(), ConfigError> {
        if self.plan.program.contains_runnable(name) {
            Ok(())
        } else {
            Err(ConfigError::UnknownRunnable(name.to_string()))
        }
    }

    fn runnable_names(&self) -> Vec<RunnableName> {
        self.plan
            .program
            .runnable_names()
            .map(str::to_string)
            .collect()
    }

    /// Merge entries into the global configuration.
    pub fn with_configuration<I, K, V>(mut self, config: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.plan.config.extend(config);
        self
    }

    /// Set the configuration of one runnable, replacing any set before.
    pub fn with_runnable_configuration<I, K, V>(
        mut self,
        runnable: &str,
        config: I,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.check_runnable(runnable)?;
        self.plan
            .runnable_configs
            .insert(runnable.to_string(), config.into_iter().collect());
        Ok(self)
    }

    /// Replace the global JVM options.
    pub fn set_jvm_options(mut self, options: impl Into<String>) -> Self {
        self.plan.jvm_extra = options.into();
        self
    }

    /// Append to the global JVM options, separated by a single space.
    pub fn add_jvm_options(mut self, options: impl AsRef<str>) -> Self {
        self.plan.jvm_extra = join_options(&self.plan.jvm_extra, options.as_ref());
        self
    }

    pub fn set_runnable_jvm_options(
        mut self,
        runnable: &str,
        options: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        self.check_runnable(runnable)?;
        self.plan
            .runnable_jvm
            .insert(runnable.to_string(), options.into());
        Ok(self)
    }

    /// Start container JVMs with a debug agent.
    ///
    /// An empty `runnables` list debugs every runnable.
    pub fn enable_debugging(
        mut self,
        suspend: bool,
        runnables: &[&str],
    ) -> Result<Self, ConfigError> {
        for name in runnables {
            self.check_runnable(name)?;
        }
        self.plan.debug = DebugOptions::enabled(
            suspend,
            runnables.iter().map(|s| s.to_string()).collect(),
        );
        Ok(self)
    }

    pub fn with_application_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plan
            .arguments
            .application
            .extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_arguments<I, S>(mut self, runnable: &str, args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_runnable(runnable)?;
        self.plan
            .arguments
            .runnables
            .entry(runnable.to_string())
            .or_default()
            .extend(args.into_iter().map(Into::into));
        Ok(self)
    }

    /// Add class ids that must ship in the application bundle.
    pub fn with_dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ModuleId>,
    {
        self.plan
            .dependencies
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// Add files packed into the resources bundle.
    pub fn with_resources<I, U>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<FileUri>,
    {
        self.plan
            .resources
            .extend(uris.into_iter().map(Into::into));
        self
    }

    /// Add entries to the container classpath.
    pub fn with_class_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plan
            .class_paths
            .extend(paths.into_iter().map(Into::into));
        self
    }

    /// Add entries to the application classpath.
    pub fn with_application_class_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plan
            .application_class_paths
            .extend(paths.into_iter().map(Into::into));
        self
    }

    /// Add environment entries to every runnable.
    ///
    /// Keys already set for a runnable keep their value.
    pub fn with_env<I, K, V>(mut self, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = collect_env(env)?;
        for name in self.runnable_names() {
            self.plan
                .environments
                .entry(name)
                .or_insert_with(Env::new)
                .merge(entries.iter().cloned(), false);
        }
        Ok(self)
    }

    /// Add environment entries to one runnable, replacing existing keys.
    pub fn with_runnable_env<I, K, V>(mut self, runnable: &str, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.check_runnable(runnable)?;
        let entries = collect_env(env)?;
        self.plan
            .environments
            .entry(runnable.to_string())
            .or_insert_with(Env::new)
            .merge(entries, true);
        Ok(self)
    }

    pub fn with_max_retries(mut self, runnable: &str, retries: u32) -> Result<Self, ConfigError> {
        self.check_runnable(runnable)?;
        self.plan.max_retries.insert(runnable.to_string(), retries);
        Ok(self)
    }

    /// Set the root logger level of every runnable.
    pub fn set_log_level(mut self, level: LogLevel) -> Self {
        for name in self.runnable_names() {
            self.plan
                .log_levels
                .entry(name)
                .or_default()
                .insert(ROOT_LOGGER.to_string(), level);
        }
        self
    }

    /// Set logger levels for every runnable.
    ///
    /// Levels are parsed case-insensitively; an empty or unknown level rejects the whole call.
    pub fn set_log_levels<I, K, V>(mut self, levels: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let parsed = parse_levels(levels)?;
        for name in self.runnable_names() {
            self.plan
                .log_levels
                .entry(name)
                .or_default()
                .extend(parsed.iter().map(|(k, v)| (k.clone(), *v)));
        }
        Ok(self)
    }

    pub fn set_runnable_log_levels<I, K, V>(
        mut self,
        runnable: &str,
        levels: I,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        self.check_runnable(runnable)?;
        let parsed = parse_levels(levels)?;
        self.plan
            .log_levels
            .entry(runnable.to_string())
            .or_default()
            .extend(parsed);
        Ok(self)
    }

    /// Class loader the containers load user code with.
    ///
    /// Shipped as a system property appended to the global JVM options.
    pub fn set_class_loader(mut self, class_name: impl Into<String>) -> Result<Self, ConfigError> {
        let class_name = class_name.into();
        if class_name.trim().is_empty() {
            return Err(ConfigError::InvalidArgument(
                "class loader name must not be empty".into(),
            ));
        }
        self.plan.class_loader = Some(class_name);
        Ok(self)
    }

    /// Finish configuration.
    pub fn freeze(self) -> LaunchPlan {
        self.plan
    }
}

fn collect_env<I, K, V>(env: I) -> Result<Vec<(String, String)>, ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    env.into_iter()
        .map(|(k, v)| {
            let key = k.into();
            if key.trim().is_empty() {
                return Err(ConfigError::InvalidArgument(
                    "environment key must not be empty".into(),
                ));
            }
            Ok((key, v.into()))
        })
        .collect()
}

fn parse_levels<I, K, V>(levels: I) -> Result<BTreeMap<String, LogLevel>, ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<str>,
{
    levels
        .into_iter()
        .map(|(logger, level)| {
            let logger = logger.into();
            let level = level.as_ref().parse::<LogLevel>().map_err(|e| {
                ConfigError::InvalidArgument(format!("log level for logger '{logger}': {e}"))
            })?;
            Ok((logger, level))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use skiff_model::{ClusterTarget, EventHandlerSpec, RunnableSpec};

    use super::*;

    fn program() -> ProgramSpec {
        ProgramSpec::new("wordcount").with_runnable(RunnableSpec::new("worker", "acme.Worker"))
    }

    fn preparer() -> Preparer {
        let run = ProgramRun::new("default", "app", "wordcount", ClusterTarget::new("local"));
        Preparer::new(program(), run, &LaunchSettings::default()).unwrap()
    }

    #[test]
    fn rejects_programs_without_exactly_one_runnable() {
        let run = ProgramRun::new("default", "app", "p", ClusterTarget::new("local"));
        let empty = ProgramSpec::new("p");
        let err = Preparer::new(empty, run.clone(), &LaunchSettings::default()).unwrap_err();
        assert!(matches!(err, ConfigError::RunnableCount(0)));

        let two = program().with_runnable(RunnableSpec::new("reader", "acme.Reader"));
        let err = Preparer::new(two, run, &LaunchSettings::default()).unwrap_err();
        assert!(matches!(err, ConfigError::RunnableCount(2)));
    }

    #[test]
    fn runnable_configuration_replaces_earlier_calls() {
        let plan = preparer()
            .with_runnable_configuration("worker", [("a", "1"), ("b", "2")])
            .unwrap()
            .with_runnable_configuration("worker", [("b", "3")])
            .unwrap()
            .freeze();

        let config = &plan.runnable_configs()["worker"];
        assert_eq!(config.len(), 1);
        assert_eq!(config.get("a"), None);
        assert_eq!(config.get("b"), Some("3"));
    }

    #[test]
    fn unknown_runnable_is_rejected() {
        let err = preparer().with_max_retries("ghost", 3).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRunnable(name) if name == "ghost"));

        let err = preparer()
            .with_runnable_env("ghost", [("A", "1")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRunnable(_)));

        let err = preparer().enable_debugging(true, &["ghost"]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRunnable(_)));
    }

    #[test]
    fn global_env_does_not_override_runnable_env() {
        let plan = preparer()
            .with_runnable_env("worker", [("FOO", "runnable")])
            .unwrap()
            .with_env([("FOO", "global"), ("BAR", "global")])
            .unwrap()
            .freeze();

        let env = &plan.environments()["worker"];
        assert_eq!(env.get("FOO"), Some("runnable"));
        assert_eq!(env.get("BAR"), Some("global"));
    }

    #[test]
    fn runnable_env_overrides_global_env() {
        let plan = preparer()
            .with_env([("FOO", "global")])
            .unwrap()
            .with_runnable_env("worker", [("FOO", "runnable")])
            .unwrap()
            .freeze();

        assert_eq!(plan.environments()["worker"].get("FOO"), Some("runnable"));
    }

    #[test]
    fn empty_env_key_is_rejected() {
        let err = preparer().with_env([("", "x")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument(_)));
    }

    #[test]
    fn add_jvm_options_joins_with_single_space() {
        let plan = preparer()
            .set_jvm_options("-Xmx1g")
            .add_jvm_options("-Dfoo=bar")
            .freeze();
        assert_eq!(plan.jvm_options().extra, "-Xmx1g -Dfoo=bar");

        let plan = preparer().set_jvm_options("").add_jvm_options("-Da=b").freeze();
        assert_eq!(plan.jvm_options().extra, "-Da=b");
    }

    #[test]
    fn settings_seed_global_jvm_options() {
        let settings = LaunchSettings {
            jvm_options: "-XX:+UseG1GC".into(),
            ..Default::default()
        };
        let run = ProgramRun::new("default", "app", "wordcount", ClusterTarget::new("local"));
        let plan = Preparer::new(program(), run, &settings).unwrap().freeze();
        assert_eq!(plan.jvm_options().extra, "-XX:+UseG1GC");
    }

    #[test]
    fn class_loader_becomes_system_property() {
        let plan = preparer()
            .set_jvm_options("-Xmx1g")
            .set_class_loader("acme.IsolatingLoader")
            .unwrap()
            .set_runnable_jvm_options("worker", "-Xss2m")
            .unwrap()
            .freeze();

        let jvm = plan.jvm_options();
        assert_eq!(
            jvm.extra,
            "-Xmx1g -Dskiff.container.class.loader=acme.IsolatingLoader"
        );
        assert_eq!(
            jvm.for_runnable("worker"),
            "-Xmx1g -Dskiff.container.class.loader=acme.IsolatingLoader -Xss2m"
        );
    }

    #[test]
    fn empty_class_loader_is_rejected() {
        assert!(matches!(
            preparer().set_class_loader(" ").unwrap_err(),
            ConfigError::InvalidArgument(_)
        ));
    }

    #[test]
    fn log_levels_are_parsed_and_merged() {
        let plan = preparer()
            .set_log_level(LogLevel::Warn)
            .set_runnable_log_levels("worker", [("acme.io", "debug")])
            .unwrap()
            .freeze();

        let levels = &plan.log_levels()["worker"];
        assert_eq!(levels.get(ROOT_LOGGER), Some(&LogLevel::Warn));
        assert_eq!(levels.get("acme.io"), Some(&LogLevel::Debug));
    }

    #[test]
    fn empty_or_unknown_log_level_is_rejected() {
        let err = preparer().set_log_levels([("acme", "")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument(_)));

        let err = preparer()
            .set_runnable_log_levels("worker", [("acme", "loud")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument(_)));
    }

    #[test]
    fn arguments_accumulate_in_order() {
        let plan = preparer()
            .with_application_arguments(["--a"])
            .with_application_arguments(["--b"])
            .with_arguments("worker", ["x", "y"])
            .unwrap()
            .freeze();

        assert_eq!(plan.arguments().application, vec!["--a", "--b"]);
        assert_eq!(plan.arguments().for_runnable("worker"), vec!["x", "y"]);
    }

    #[test]
    fn application_modules_are_sorted_and_unique() {
        let run = ProgramRun::new("default", "app", "wordcount", ClusterTarget::new("local"));
        let program = program().with_event_handler(EventHandlerSpec::new("acme.Handler"));
        let plan = Preparer::new(program, run, &LaunchSettings::default())
            .unwrap()
            .with_dependencies(["acme.Util", "acme.Worker", "acme.Util"])
            .freeze();

        assert_eq!(
            plan.application_modules(),
            vec!["acme.Handler", "acme.Util", "acme.Worker"]
        );
    }

    #[test]
    fn missing_event_handler_defaults_to_log_only() {
        let plan = preparer().freeze();
        assert_eq!(plan.event_handler(), EventHandlerSpec::log_only());
    }
}
