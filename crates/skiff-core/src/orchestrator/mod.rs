//! Launch pipeline: stage, bundle, serialize, dispatch, clean up.
//!
//! One [`Orchestrator`] serves many launches; each launch gets its own staging directory,
//! logging scope and deadline. Reusable bundles are shared through the content cache.
mod deadline;
mod stage;
mod staging;

pub use stage::LaunchStage;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    future::Future,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{Instrument, debug, info};

use skiff_model::{
    FileUri, LaunchRequest, LauncherFile, ModuleId, ResolvedFile, RunId, RunnableName,
    constants::{LAUNCHER_BUNDLE, RESOURCES_BUNDLE, RUNTIME_BUNDLE, RUNTIME_CONFIG_BUNDLE},
};

use crate::bundle::{
    BOOTSTRAP_MODULES, BundleEntry, BundleError, BundleKind, ClassCatalog, Fingerprint,
    ManifestCatalog, RUNTIME_MODULES, module_builder, write_bundle_async, write_directory_bundle_async,
};
use crate::cache::{ContentCache, LocalContentCache};
use crate::context::{ContextRegistry, LoggingContext};
use crate::descriptor::{build_descriptor, write_runtime_config};
use crate::error::LaunchError;
use crate::launcher::ClusterLauncher;
use crate::metrics::{LaunchOutcome, MetricsHandle, noop_metrics};
use crate::preparer::LaunchPlan;
use crate::resolve::{FileResolver, MountedStorage, RemoteFetcher};
use crate::settings::LaunchSettings;

use deadline::Deadline;
use stage::StageTracker;
use staging::StagingDir;

/// Result of a successful launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub run_id: RunId,
    pub cluster: String,
    /// Files handed to the launcher, in dispatch order.
    pub files: Vec<LauncherFile>,
}

impl fmt::Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} on '{}' ({} files)",
            self.run_id,
            self.cluster,
            self.files.len()
        )
    }
}

pub struct Orchestrator {
    settings: LaunchSettings,
    cache: Arc<dyn ContentCache>,
    catalog: Arc<dyn ClassCatalog>,
    resolver: FileResolver,
    launcher: Arc<dyn ClusterLauncher>,
    metrics: MetricsHandle,
    contexts: ContextRegistry,
}

impl Orchestrator {
    pub fn new(
        settings: LaunchSettings,
        cache: Arc<dyn ContentCache>,
        catalog: Arc<dyn ClassCatalog>,
        resolver: FileResolver,
        launcher: Arc<dyn ClusterLauncher>,
    ) -> Self {
        Self {
            settings,
            cache,
            catalog,
            resolver,
            launcher,
            metrics: noop_metrics(),
            contexts: ContextRegistry::new(),
        }
    }

    /// Wire the default collaborators from `settings`.
    ///
    /// Opens the local content cache, loads the class manifest (an empty catalog when none
    /// is configured) and mounts the cluster storage when a scheme is set.
    pub fn from_settings(
        settings: LaunchSettings,
        fetcher: Arc<dyn RemoteFetcher>,
        launcher: Arc<dyn ClusterLauncher>,
    ) -> Result<Self, LaunchError> {
        settings.validate()?;

        let cache = LocalContentCache::open(&settings.cache_dir).map_err(|e| {
            LaunchError::io(format!("opening cache {}", settings.cache_dir.display()), e)
        })?;
        let catalog = match &settings.manifest {
            Some(path) => ManifestCatalog::load(path)?,
            None => ManifestCatalog::default(),
        };
        let mut resolver = FileResolver::new(fetcher);
        if let (Some(scheme), Some(mount)) = (&settings.cluster_scheme, &settings.cluster_mount) {
            resolver = resolver.with_storage(Arc::new(MountedStorage::new(scheme, mount)));
        }

        Ok(Self::new(
            settings,
            Arc::new(cache),
            Arc::new(catalog),
            resolver,
            launcher,
        ))
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_contexts(mut self, contexts: ContextRegistry) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }

    pub fn contexts(&self) -> &ContextRegistry {
        &self.contexts
    }

    /// Launch with [`LaunchSettings::default_timeout`].
    pub async fn launch_default(&self, plan: LaunchPlan) -> Result<RunHandle, LaunchError> {
        let timeout = self.settings.default_timeout();
        self.launch(plan, timeout).await
    }

    /// Prepare and dispatch `plan`.
    ///
    /// The timeout is checked after each bundle and after serialization; once it is
    /// exceeded nothing is dispatched. The staging directory and logging scope are released
    /// on every path.
    pub async fn launch(
        &self,
        plan: LaunchPlan,
        timeout: Duration,
    ) -> Result<RunHandle, LaunchError> {
        let started = Instant::now();
        let cluster = plan.cluster().to_string();
        self.metrics.record_launch_started(&cluster);

        let ctx = LoggingContext::for_run(plan.run());
        let span = ctx.span();
        let mut tracker = StageTracker::new(plan.run_id());

        let result = async {
            let _scope = ctx.enter(&self.contexts);
            let deadline = Deadline::start(plan.run_id(), timeout);
            let result = self.run_stages(&plan, &deadline, &mut tracker).await;
            if let Err(e) = &result {
                tracker.fail(e);
            }
            result
        }
        .instrument(span)
        .await;

        let outcome = match &result {
            Ok(_) => LaunchOutcome::Success,
            Err(e) if e.is_timeout() => LaunchOutcome::Timeout,
            Err(_) => LaunchOutcome::Failure,
        };
        self.metrics.record_launch_completed(
            &cluster,
            outcome,
            started.elapsed().as_millis() as u64,
        );
        result
    }

    async fn run_stages(
        &self,
        plan: &LaunchPlan,
        deadline: &Deadline,
        tracker: &mut StageTracker,
    ) -> Result<RunHandle, LaunchError> {
        info!(program = %plan.program().name, "launch started");

        tracker.advance(LaunchStage::Staging);
        let staging =
            StagingDir::create(&self.settings.staging_root(), plan.run_id()).await?;

        tracker.advance(LaunchStage::Bundling);
        let application_modules = plan.application_modules();
        let application_key = Fingerprint::of(&application_modules).application_bundle_name();

        let (bootstrap, runtime, application, resources) = tokio::try_join!(
            checked(
                deadline,
                self.cached_bundle(
                    BundleKind::Bootstrap,
                    LAUNCHER_BUNDLE.to_string(),
                    module_ids(BOOTSTRAP_MODULES),
                ),
            ),
            checked(
                deadline,
                self.cached_bundle(
                    BundleKind::RuntimeSupport,
                    RUNTIME_BUNDLE.to_string(),
                    module_ids(RUNTIME_MODULES),
                ),
            ),
            checked(
                deadline,
                self.cached_bundle(
                    BundleKind::Application,
                    application_key,
                    application_modules,
                ),
            ),
            checked(deadline, self.resources_bundle(plan, staging.path())),
        )?;

        tracker.advance(LaunchStage::Serializing);
        let resolved = self.resolve_local_files(plan, staging.path()).await?;
        let descriptor = build_descriptor(plan, resolved, &self.settings.config_prefix);
        let runtime_config = self
            .runtime_config_bundle(plan, &descriptor, staging.path())
            .await?;
        deadline.check(LaunchStage::Serializing)?;

        tracker.advance(LaunchStage::Dispatching);
        let mut files = vec![bootstrap, runtime, application];
        files.extend(resources);
        files.push(runtime_config);
        for runnable in descriptor.runnables.values() {
            files.extend(
                runnable
                    .local_files
                    .iter()
                    .map(|f| LauncherFile::new(f.name.clone(), f.uri.clone(), f.archive)),
            );
        }

        let request = LaunchRequest {
            run_id: plan.run_id(),
            cluster: plan.cluster().to_string(),
            files,
            properties: plan.run().cluster.properties.clone(),
        };
        debug!(launcher = self.launcher.name(), files = request.files.len(), "dispatching");
        self.launcher.launch(&request).await?;

        tracker.advance(LaunchStage::Cleaning);
        staging.close().await;

        tracker.advance(LaunchStage::Done);
        info!(
            elapsed_ms = deadline.elapsed().as_millis() as u64,
            stage = %tracker.current(),
            "launch dispatched"
        );

        Ok(RunHandle {
            run_id: request.run_id,
            cluster: request.cluster,
            files: request.files,
        })
    }

    async fn cached_bundle(
        &self,
        kind: BundleKind,
        key: String,
        ids: Vec<ModuleId>,
    ) -> Result<LauncherFile, LaunchError> {
        let artifact = self
            .cache
            .get(&key, module_builder(self.catalog.clone(), ids))
            .await?;
        self.metrics.record_bundle(kind.as_label(), artifact.hit);
        debug!(bundle = %kind, key, hit = artifact.hit, size = artifact.size, "bundle ready");

        Ok(LauncherFile::new(
            kind.artifact_name(),
            FileUri::from_path(&artifact.path),
            kind.is_archive(),
        ))
    }

    /// Per-run resources bundle; skipped when no resources are declared.
    ///
    /// Entries are named by file name, so two resources with the same name fail the launch.
    async fn resources_bundle(
        &self,
        plan: &LaunchPlan,
        staging: &Path,
    ) -> Result<Option<LauncherFile>, LaunchError> {
        if plan.resources().is_empty() {
            return Ok(None);
        }

        let dir = staging.join("resources");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| LaunchError::io("creating resources directory", e))?;

        let mut names = BTreeSet::new();
        let mut entries = Vec::with_capacity(plan.resources().len());
        for uri in plan.resources() {
            let path = self.resolver.materialize(uri, &dir).await?;
            let name = match uri.file_name() {
                "" => path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                name => name.to_string(),
            };
            if !names.insert(name.clone()) {
                return Err(BundleError::DuplicateEntry(name).into());
            }
            entries.push(BundleEntry::new(name, path));
        }

        let target = staging.join(RESOURCES_BUNDLE);
        let count = write_bundle_async(target.clone(), entries).await?;
        self.metrics.record_bundle(BundleKind::Resources.as_label(), false);
        debug!(entries = count, "resources bundle written");

        Ok(Some(LauncherFile::new(
            BundleKind::Resources.artifact_name(),
            FileUri::from_path(target),
            BundleKind::Resources.is_archive(),
        )))
    }

    async fn resolve_local_files(
        &self,
        plan: &LaunchPlan,
        staging: &Path,
    ) -> Result<BTreeMap<RunnableName, Vec<ResolvedFile>>, LaunchError> {
        let mut resolved = BTreeMap::new();
        for runnable in plan.runnables() {
            let mut files = Vec::with_capacity(runnable.local_files.len());
            for file in &runnable.local_files {
                files.push(self.resolver.resolve(file, staging).await?);
            }
            resolved.insert(runnable.name.clone(), files);
        }
        Ok(resolved)
    }

    /// Write the runtime-config directory, pack it and remove the directory.
    async fn runtime_config_bundle(
        &self,
        plan: &LaunchPlan,
        descriptor: &skiff_model::RuntimeDescriptor,
        staging: &Path,
    ) -> Result<LauncherFile, LaunchError> {
        let dir = staging.join("runtime-config");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| LaunchError::io("creating runtime config directory", e))?;

        write_runtime_config(&dir, plan, descriptor, &self.settings).await?;

        let target = staging.join(RUNTIME_CONFIG_BUNDLE);
        write_directory_bundle_async(target.clone(), dir.clone()).await?;
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| LaunchError::io("removing runtime config directory", e))?;
        self.metrics
            .record_bundle(BundleKind::RuntimeConfig.as_label(), false);

        Ok(LauncherFile::new(
            BundleKind::RuntimeConfig.artifact_name(),
            FileUri::from_path(target),
            BundleKind::RuntimeConfig.is_archive(),
        ))
    }
}

/// Run a bundle step, then check the deadline.
async fn checked<T, F>(deadline: &Deadline, step: F) -> Result<T, LaunchError>
where
    F: Future<Output = Result<T, LaunchError>>,
{
    let value = step.await?;
    deadline.check(LaunchStage::Bundling)?;
    Ok(value)
}

fn module_ids(ids: &[&str]) -> Vec<ModuleId> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use skiff_model::{ClusterTarget, ProgramRun, ProgramSpec, RunnableSpec};

    use super::*;
    use crate::launcher::LauncherError;
    use crate::preparer::Preparer;
    use crate::resolve::NoRemoteFetcher;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<LaunchRequest>>,
    }

    #[async_trait]
    impl ClusterLauncher for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn launch(&self, request: &LaunchRequest) -> Result<(), LauncherError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    fn catalog(root: &Path) -> ManifestCatalog {
        std::fs::write(root.join("class.bin"), b"bytes").unwrap();
        let mut catalog = ManifestCatalog::new(root);
        for id in BOOTSTRAP_MODULES.iter().chain(RUNTIME_MODULES) {
            catalog.insert(*id, ["class.bin"]);
        }
        catalog.insert("acme.Worker", ["class.bin"]);
        catalog
    }

    fn plan(settings: &LaunchSettings) -> LaunchPlan {
        let program = ProgramSpec::new("wordcount")
            .with_runnable(RunnableSpec::new("worker", "acme.Worker"));
        let run = ProgramRun::new("default", "app", "wordcount", ClusterTarget::new("local"));
        Preparer::new(program, run, settings).unwrap().freeze()
    }

    #[tokio::test]
    async fn zero_timeout_never_dispatches() {
        let work = tempfile::tempdir().unwrap();
        let settings = LaunchSettings {
            local_data_dir: work.path().join("data"),
            ..Default::default()
        };
        let cache = LocalContentCache::open(work.path().join("cache")).unwrap();
        let recorder = Arc::new(Recorder::default());
        let orchestrator = Orchestrator::new(
            settings.clone(),
            Arc::new(cache),
            Arc::new(catalog(work.path())),
            FileResolver::new(Arc::new(NoRemoteFetcher)),
            recorder.clone(),
        );

        let err = orchestrator
            .launch(plan(&settings), Duration::ZERO)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(recorder.requests.lock().unwrap().is_empty());
        assert_eq!(orchestrator.contexts().active(), 0);
        let leftovers = std::fs::read_dir(settings.staging_root()).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
