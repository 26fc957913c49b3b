mod launch_file;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use tracing::{info, warn};

use skiff_core::{LaunchSettings, Orchestrator};
use skiff_exec::{
    http::HttpFetcher,
    subprocess::{SubprocessConfig, SubprocessLauncher},
};
use skiff_observe::{LaunchEventLog, LoggerConfig, LoggerTimeZone, init_local_offset, init_logger};
use skiff_prometheus::PrometheusMetrics;

use launch_file::LaunchFile;

const FETCH_TIMEOUT: Duration = Duration::from_secs(300);

fn main() -> anyhow::Result<()> {
    // 1) environment
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("loading .env");
        }
    }

    // 2) logger; the local offset must be read before the runtime starts threads
    let log_cfg = LoggerConfig::from_env()?;
    if log_cfg.tz == LoggerTimeZone::Local {
        init_local_offset();
    }
    init_logger(&log_cfg)?;

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: skiff-launchd <launch-file.json>")?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building runtime")?
        .block_on(run(path))
}

async fn run(path: PathBuf) -> anyhow::Result<()> {
    let settings = LaunchSettings::from_env()?;
    let file = LaunchFile::load(&path)?;
    let timeout = file.timeout();

    // 3) collaborators
    let command = std::env::var("SKIFF_LAUNCHER_CMD")
        .context("SKIFF_LAUNCHER_CMD must name the cluster submit command")?;
    let mut launcher_cfg = SubprocessConfig::from_command_line(&command)?;
    // JSON array of extra arguments, for values that contain whitespace
    if let Ok(raw) = std::env::var("SKIFF_LAUNCHER_ARGS") {
        let args: Vec<String> = serde_json::from_str(&raw)
            .context("SKIFF_LAUNCHER_ARGS must be a JSON array of strings")?;
        launcher_cfg = launcher_cfg.with_args(args);
    }
    if let Some(ms) = env_millis("SKIFF_LAUNCHER_TIMEOUT_MS")? {
        launcher_cfg = launcher_cfg.with_timeout(ms);
    }
    let launcher = SubprocessLauncher::new(launcher_cfg)?;
    let fetcher = HttpFetcher::new(FETCH_TIMEOUT)?;

    let prometheus = PrometheusMetrics::new()?;
    let metrics = LaunchEventLog::wrap(Arc::new(prometheus.clone()));

    let orchestrator =
        Orchestrator::from_settings(settings.clone(), Arc::new(fetcher), Arc::new(launcher))?
            .with_metrics(Arc::new(metrics));

    // 4) launch
    let plan = file.into_plan(&settings)?;
    let result = match timeout {
        Some(limit) => orchestrator.launch(plan, limit).await,
        None => orchestrator.launch_default(plan).await,
    };

    if std::env::var_os("SKIFF_METRICS_DUMP").is_some() {
        match prometheus.encode_text() {
            Ok(text) => eprint!("{text}"),
            Err(e) => warn!(error = %e, "failed to encode metrics"),
        }
    }

    let handle = result?;
    info!(run_id = %handle.run_id, files = handle.files.len(), "launch dispatched");
    println!("{handle}");
    Ok(())
}

fn env_millis(var: &str) -> anyhow::Result<Option<Duration>> {
    match std::env::var(var) {
        Ok(raw) => {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{var} must be a number of milliseconds"))?;
            Ok(Some(Duration::from_millis(ms)))
        }
        Err(_) => Ok(None),
    }
}
