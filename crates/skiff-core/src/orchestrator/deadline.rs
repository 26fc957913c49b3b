use std::time::{Duration, Instant};

use skiff_model::RunId;

use super::LaunchStage;
use crate::error::LaunchError;

/// Wall-clock budget of one launch, measured from its start.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    run_id: RunId,
    started: Instant,
    timeout: Duration,
}

impl Deadline {
    pub(crate) fn start(run_id: RunId, timeout: Duration) -> Self {
        Self {
            run_id,
            started: Instant::now(),
            timeout,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fails once the elapsed time reaches the timeout.
    pub(crate) fn check(&self, stage: LaunchStage) -> Result<(), LaunchError> {
        let elapsed = self.elapsed();
        if elapsed >= self.timeout {
            return Err(LaunchError::Timeout {
                run_id: self.run_id,
                stage,
                elapsed_ms: elapsed.as_millis() as u64,
                timeout_ms: self.timeout.as_millis() as u64,
            });
        }
        Ok(())
    }
}
