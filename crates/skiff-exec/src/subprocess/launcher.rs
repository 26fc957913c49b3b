use std::process::Stdio;

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, trace};

use skiff_core::launcher::{ClusterLauncher, LauncherError};
use skiff_model::LaunchRequest;

use super::{
    LAUNCHER_SUBPROCESS, SubprocessConfig,
    logger::{Stream, forward_lines},
};
use crate::ExecError;

/// [`ClusterLauncher`] that hands each request to an external command.
///
/// The request is written to the command's stdin as JSON. Exit status zero accepts the
/// launch; anything else rejects it with the last line the command wrote to stderr.
#[derive(Debug, Clone)]
pub struct SubprocessLauncher {
    config: SubprocessConfig,
}

impl SubprocessLauncher {
    pub fn new(config: SubprocessConfig) -> Result<Self, ExecError> {
        config.validate()?;
        config.trace_state();
        Ok(Self { config })
    }

    pub fn config(&self) -> &SubprocessConfig {
        &self.config
    }

    fn command(&self, request: &LaunchRequest) -> Command {
        let cfg = &self.config;
        let mut cmd = Command::new(&cfg.command);
        cmd.args(&cfg.args);
        if let Some(cwd) = &cfg.cwd {
            cmd.current_dir(cwd);
        }
        for kv in cfg.env.iter() {
            cmd.env(kv.key(), kv.value());
        }
        cmd.env("SKIFF_RUN_ID", request.run_id.to_string());
        cmd.env("SKIFF_CLUSTER", &request.cluster);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ClusterLauncher for SubprocessLauncher {
    fn name(&self) -> &'static str {
        LAUNCHER_SUBPROCESS
    }

    async fn launch(&self, request: &LaunchRequest) -> Result<(), LauncherError> {
        let payload = serde_json::to_vec(request).map_err(|e| LauncherError::Failed {
            launcher: LAUNCHER_SUBPROCESS,
            reason: format!("encoding request: {e}"),
        })?;

        trace!(
            run_id = %request.run_id,
            command = %self.config.command,
            files = request.files.len(),
            "spawning launcher command",
        );
        let mut child = self.command(request).spawn().map_err(|e| LauncherError::Failed {
            launcher: LAUNCHER_SUBPROCESS,
            reason: format!("spawn '{}' failed: {e}", self.config.command),
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let log = self.config.log;
        let stdout_task = tokio::spawn(async move {
            match stdout {
                Some(out) => forward_lines(out, Stream::Stdout, log).await,
                None => None,
            }
        });
        let stderr_task = tokio::spawn(async move {
            match stderr {
                Some(err) => forward_lines(err, Stream::Stderr, log).await,
                None => None,
            }
        });

        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                // a command that ignores stdin may close it early
                if let Err(e) = stdin.write_all(&payload).await {
                    debug!(error = %e, "launcher command closed stdin");
                }
            });
        }

        let status = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(res) => res?,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        debug!(error = %e, "failed to kill launcher command");
                    }
                    return Err(LauncherError::Failed {
                        launcher: LAUNCHER_SUBPROCESS,
                        reason: format!("command timed out after {}ms", limit.as_millis()),
                    });
                }
            },
            None => child.wait().await?,
        };

        let _ = stdout_task.await;
        let last_err = stderr_task.await.ok().flatten();

        if status.success() {
            debug!(run_id = %request.run_id, "launcher command accepted the run");
            return Ok(());
        }

        let code = match status.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        let reason = match last_err {
            Some(line) => format!("{code}: {line}"),
            None => code,
        };
        Err(LauncherError::Rejected {
            run_id: request.run_id,
            reason,
        })
    }
}
