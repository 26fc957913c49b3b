use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use skiff_core::{
    bundle::{BOOTSTRAP_MODULES, BundleEntry, BundleError, ClassCatalog, ManifestCatalog, RUNTIME_MODULES},
    cache::LocalContentCache,
    launcher::{ClusterLauncher, LauncherError},
    metrics::{LaunchOutcome, MetricsBackend},
    resolve::{FileResolver, RemoteFetcher, ResolveError},
    LaunchError, LaunchSettings, Orchestrator, Preparer,
};
use skiff_model::{
    Arguments, ClusterTarget, FileUri, LaunchRequest, LocalFileRef, ProgramRun, ProgramSpec,
    RuntimeDescriptor, RunnableSpec,
    constants::{
        ARGUMENTS_FILE, LAUNCHER_BUNDLE, RESOURCES_BUNDLE, RUNTIME_CONFIG_BUNDLE,
        RUNTIME_SPEC_FILE,
    },
};

/// Launcher that snapshots every shipped file before the staging directory disappears.
#[derive(Default)]
struct RecordingLauncher {
    fail: bool,
    requests: Mutex<Vec<LaunchRequest>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
}

impl RecordingLauncher {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn content(&self, name: &str) -> Vec<u8> {
        self.contents.lock().unwrap()[name].clone()
    }
}

#[async_trait]
impl ClusterLauncher for RecordingLauncher {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn launch(&self, request: &LaunchRequest) -> Result<(), LauncherError> {
        if self.fail {
            return Err(LauncherError::Rejected {
                run_id: request.run_id,
                reason: "cluster full".into(),
            });
        }
        for file in &request.files {
            if let Some(path) = file.uri.to_local_path() {
                let bytes = tokio::fs::read(&path).await?;
                self.contents.lock().unwrap().insert(file.name.clone(), bytes);
            }
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Catalog wrapper counting how often each class is resolved.
struct CountingCatalog {
    inner: ManifestCatalog,
    lookups: Mutex<HashMap<String, usize>>,
}

impl CountingCatalog {
    fn lookups(&self, id: &str) -> usize {
        self.lookups.lock().unwrap().get(id).copied().unwrap_or(0)
    }
}

impl ClassCatalog for CountingCatalog {
    fn entries(&self, id: &str) -> Result<Vec<BundleEntry>, BundleError> {
        *self.lookups.lock().unwrap().entry(id.to_string()).or_default() += 1;
        self.inner.entries(id)
    }
}

#[derive(Default)]
struct RecordingMetrics {
    completed: Mutex<Vec<LaunchOutcome>>,
    bundles: Mutex<Vec<(String, bool)>>,
}

impl MetricsBackend for RecordingMetrics {
    fn record_launch_started(&self, _: &str) {}

    fn record_launch_completed(&self, _: &str, outcome: LaunchOutcome, _: u64) {
        self.completed.lock().unwrap().push(outcome);
    }

    fn record_bundle(&self, bundle: &str, cache_hit: bool) {
        self.bundles
            .lock()
            .unwrap()
            .push((bundle.to_string(), cache_hit));
    }
}

/// Serves `mem://` URIs from a fixed body.
struct MemFetcher {
    body: Vec<u8>,
    calls: AtomicUsize,
}

#[async_trait]
impl RemoteFetcher for MemFetcher {
    async fn copy_to(&self, uri: &FileUri, out: &mut tokio::fs::File) -> Result<u64, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !uri.has_scheme("mem") {
            return Err(ResolveError::UnsupportedScheme(uri.to_string()));
        }
        out.write_all(&self.body).await?;
        Ok(self.body.len() as u64)
    }
}

struct Harness {
    work: tempfile::TempDir,
    settings: LaunchSettings,
    catalog: Arc<CountingCatalog>,
    cache: Arc<LocalContentCache>,
    launcher: Arc<RecordingLauncher>,
    metrics: Arc<RecordingMetrics>,
    fetcher: Arc<MemFetcher>,
}

impl Harness {
    fn new() -> Self {
        Self::with_launcher(RecordingLauncher::default())
    }

    fn with_launcher(launcher: RecordingLauncher) -> Self {
        let work = tempfile::tempdir().unwrap();
        let classes = work.path().join("classes");
        std::fs::create_dir_all(&classes).unwrap();
        std::fs::write(classes.join("Launcher.class"), b"launcher").unwrap();
        std::fs::write(classes.join("Agent.class"), b"agent").unwrap();
        std::fs::write(classes.join("Worker.class"), b"worker").unwrap();
        std::fs::write(classes.join("Util.class"), b"util").unwrap();

        let mut inner = ManifestCatalog::new(&classes);
        for id in BOOTSTRAP_MODULES {
            inner.insert(*id, ["Launcher.class"]);
        }
        for id in RUNTIME_MODULES {
            inner.insert(*id, ["Agent.class"]);
        }
        inner.insert("acme.Worker", ["Worker.class"]);
        inner.insert("acme.Util", ["Util.class"]);

        let settings = LaunchSettings {
            local_data_dir: work.path().join("data"),
            cache_dir: work.path().join("cache"),
            ..Default::default()
        };
        let cache = Arc::new(LocalContentCache::open(&settings.cache_dir).unwrap());

        Self {
            settings,
            catalog: Arc::new(CountingCatalog {
                inner,
                lookups: Mutex::new(HashMap::new()),
            }),
            cache,
            launcher: Arc::new(launcher),
            metrics: Arc::new(RecordingMetrics::default()),
            fetcher: Arc::new(MemFetcher {
                body: b"remote bytes \x00\xff".to_vec(),
                calls: AtomicUsize::new(0),
            }),
            work,
        }
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            self.settings.clone(),
            self.cache.clone(),
            self.catalog.clone(),
            FileResolver::new(self.fetcher.clone()),
            self.launcher.clone(),
        )
        .with_metrics(self.metrics.clone())
    }

    fn preparer(&self, runnable: RunnableSpec) -> Preparer {
        let program = ProgramSpec::new("wordcount").with_runnable(runnable);
        let run = ProgramRun::new("default", "app", "wordcount", ClusterTarget::new("local"));
        Preparer::new(program, run, &self.settings).unwrap()
    }

    fn local_file(&self, name: &str, body: &[u8]) -> PathBuf {
        let path = self.work.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn staging_is_empty(&self) -> bool {
        match std::fs::read_dir(self.settings.staging_root()) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }
}

fn zip_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut out = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut out).unwrap();
    out
}

fn zip_names(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect()
}

#[tokio::test]
async fn single_runnable_ships_four_bundles_and_local_files() {
    let h = Harness::new();
    let input = h.local_file("input.csv", &[b'x'; 100]);
    let plan = h
        .preparer(
            RunnableSpec::new("worker", "acme.Worker")
                .with_local_file(LocalFileRef::new("input.csv", FileUri::from_path(&input))),
        )
        .with_application_arguments(["--verbose"])
        .with_configuration([("skiff.am.memory", "1024"), ("user.key", "x")])
        .freeze();
    let run_id = plan.run_id();

    let handle = h.orchestrator().launch_default(plan).await.unwrap();

    let names: Vec<_> = handle.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "launcher.zip",
            "runtime.zip",
            "application.zip",
            "runtime-config.zip",
            "input.csv"
        ]
    );
    assert!(!handle.files[0].archive);
    assert!(handle.files[1..4].iter().all(|f| f.archive));
    assert_eq!(handle.run_id, run_id);
    assert_eq!(handle.files[4].uri, FileUri::from_path(&input));

    let requests = h.launcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].files, handle.files);

    let config = h.launcher.content(RUNTIME_CONFIG_BUNDLE);
    let spec = String::from_utf8(zip_entry(&config, RUNTIME_SPEC_FILE)).unwrap();
    let descriptor = RuntimeDescriptor::decode(&spec).unwrap();
    assert_eq!(descriptor.run_id, run_id);
    assert_eq!(descriptor.arguments.application, vec!["--verbose"]);
    assert_eq!(descriptor.config.get("skiff.am.memory"), Some("1024"));
    assert!(descriptor.config.get("user.key").is_none());
    let resolved = &descriptor.runnables["worker"].local_files[0];
    assert_eq!(resolved.size, 100);
    assert!(!resolved.archive);
    assert!(!handle.files[4].archive);

    assert_eq!(zip_entry(&h.launcher.content("application.zip"), "Worker.class"), b"worker");
    assert!(h.staging_is_empty());
    assert_eq!(*h.metrics.completed.lock().unwrap(), vec![LaunchOutcome::Success]);
}

#[tokio::test]
async fn identical_class_sets_share_the_application_bundle() {
    let h = Harness::new();
    let orchestrator = h.orchestrator();

    let first = h
        .preparer(RunnableSpec::new("worker", "acme.Worker"))
        .with_dependencies(["acme.Util"])
        .with_application_arguments(["--day", "mon"])
        .freeze();
    let second = h
        .preparer(RunnableSpec::new("worker", "acme.Worker"))
        .with_dependencies(["acme.Util", "acme.Worker"])
        .with_application_arguments(["--day", "tue"])
        .freeze();

    let a = orchestrator.launch_default(first).await.unwrap();
    let first_config = h.launcher.content(RUNTIME_CONFIG_BUNDLE);
    let b = orchestrator.launch_default(second).await.unwrap();
    let second_config = h.launcher.content(RUNTIME_CONFIG_BUNDLE);

    let app = |handle: &skiff_core::RunHandle| {
        handle
            .files
            .iter()
            .find(|f| f.name == "application.zip")
            .unwrap()
            .uri
            .clone()
    };
    assert_eq!(app(&a), app(&b));
    assert!(app(&a).as_str().ends_with("-application.zip"));

    assert_ne!(first_config, second_config);
    let shipped: Arguments =
        serde_json::from_slice(&zip_entry(&first_config, ARGUMENTS_FILE)).unwrap();
    assert_eq!(shipped.application, vec!["--day", "mon"]);
    let args = |bytes: &[u8]| {
        let spec = String::from_utf8(zip_entry(bytes, RUNTIME_SPEC_FILE)).unwrap();
        RuntimeDescriptor::decode(&spec).unwrap().arguments.application
    };
    assert_eq!(args(&first_config), vec!["--day", "mon"]);
    assert_eq!(args(&second_config), vec!["--day", "tue"]);
    assert_eq!(h.catalog.lookups("acme.Util"), 1);
    assert_eq!(h.catalog.lookups(BOOTSTRAP_MODULES[0]), 1);

    let app_path = app(&a).to_local_path().unwrap();
    let mut names = zip_names(&app_path);
    names.sort();
    assert_eq!(names, vec!["Util.class", "Worker.class"]);

    let bundles = h.metrics.bundles.lock().unwrap().clone();
    let application: Vec<bool> = bundles
        .iter()
        .filter(|(kind, _)| kind == "application")
        .map(|(_, hit)| *hit)
        .collect();
    assert_eq!(application, vec![false, true]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_launches_build_shared_bundles_once() {
    let h = Harness::new();
    let orchestrator = Arc::new(h.orchestrator());

    let mut handles = Vec::new();
    for _ in 0..6 {
        let plan = h.preparer(RunnableSpec::new("worker", "acme.Worker")).freeze();
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move { orchestrator.launch_default(plan).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.launcher.requests().len(), 6);
    assert_eq!(h.catalog.lookups("acme.Worker"), 1);
    assert_eq!(h.catalog.lookups(RUNTIME_MODULES[0]), 1);
}

#[tokio::test]
async fn remote_local_files_are_staged_byte_identical() {
    let h = Harness::new();
    let plan = h
        .preparer(
            RunnableSpec::new("worker", "acme.Worker")
                .with_local_file(LocalFileRef::new("model.bin", "mem://store/model.bin")),
        )
        .freeze();

    let handle = h.orchestrator().launch_default(plan).await.unwrap();

    let staged = handle.files.iter().find(|f| f.name == "model.bin").unwrap();
    assert!(staged.uri.is_local());
    assert!(
        staged
            .uri
            .to_local_path()
            .unwrap()
            .starts_with(h.settings.staging_root().canonicalize().unwrap())
    );
    assert_eq!(h.launcher.content("model.bin"), h.fetcher.body);
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
    assert!(h.staging_is_empty());
}

#[tokio::test]
async fn resources_are_packed_into_their_own_bundle() {
    let h = Harness::new();
    let res = h.local_file("lookup.txt", b"lookup");
    let plan = h
        .preparer(RunnableSpec::new("worker", "acme.Worker"))
        .with_resources([FileUri::from_path(&res)])
        .freeze();

    let handle = h.orchestrator().launch_default(plan).await.unwrap();

    let names: Vec<_> = handle.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            LAUNCHER_BUNDLE,
            "runtime.zip",
            "application.zip",
            RESOURCES_BUNDLE,
            RUNTIME_CONFIG_BUNDLE
        ]
    );
    assert_eq!(zip_entry(&h.launcher.content(RESOURCES_BUNDLE), "lookup.txt"), b"lookup");
}

#[tokio::test]
async fn resources_with_the_same_file_name_fail_the_launch() {
    let h = Harness::new();
    std::fs::create_dir_all(h.work.path().join("a")).unwrap();
    std::fs::create_dir_all(h.work.path().join("b")).unwrap();
    let first = h.local_file("a/conf.xml", b"AAA");
    let second = h.local_file("b/conf.xml", b"BBB");
    let plan = h
        .preparer(RunnableSpec::new("worker", "acme.Worker"))
        .with_resources([FileUri::from_path(&first), FileUri::from_path(&second)])
        .freeze();

    let err = h.orchestrator().launch_default(plan).await.unwrap_err();

    assert!(matches!(
        err,
        LaunchError::Bundle(BundleError::DuplicateEntry(ref name)) if name == "conf.xml"
    ));
    assert!(h.launcher.requests().is_empty());
    assert!(h.staging_is_empty());
}

#[tokio::test]
async fn dispatch_failure_returns_no_handle_and_cleans_up() {
    let h = Harness::with_launcher(RecordingLauncher::failing());
    let plan = h.preparer(RunnableSpec::new("worker", "acme.Worker")).freeze();
    let orchestrator = h.orchestrator();

    let err = orchestrator.launch_default(plan).await.unwrap_err();

    assert!(matches!(err, LaunchError::Dispatch(LauncherError::Rejected { .. })));
    assert!(h.staging_is_empty());
    assert_eq!(orchestrator.contexts().active(), 0);
    assert_eq!(*h.metrics.completed.lock().unwrap(), vec![LaunchOutcome::Failure]);
}

#[tokio::test]
async fn unknown_class_fails_bundling() {
    let h = Harness::new();
    let plan = h
        .preparer(RunnableSpec::new("worker", "acme.Missing"))
        .freeze();

    let err = h.orchestrator().launch_default(plan).await.unwrap_err();

    assert!(matches!(err, LaunchError::Cache(_)));
    assert!(h.launcher.requests().is_empty());
    assert!(h.staging_is_empty());
}

#[tokio::test]
async fn expired_deadline_reports_timeout_without_dispatch() {
    let h = Harness::new();
    let plan = h.preparer(RunnableSpec::new("worker", "acme.Worker")).freeze();

    let err = h
        .orchestrator()
        .launch(plan, Duration::ZERO)
        .await
        .unwrap_err();

    assert!(matches!(err, LaunchError::Timeout { .. }));
    assert!(h.launcher.requests().is_empty());
    assert_eq!(*h.metrics.completed.lock().unwrap(), vec![LaunchOutcome::Timeout]);
}
