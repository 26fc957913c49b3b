use std::fmt;

use tracing::{debug, warn};

use skiff_model::RunId;

use crate::error::LaunchError;

/// Progress of a single launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStage {
    Initializing,
    Staging,
    Bundling,
    Serializing,
    Dispatching,
    Cleaning,
    Done,
    Failed,
}

impl LaunchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchStage::Initializing => "initializing",
            LaunchStage::Staging => "staging",
            LaunchStage::Bundling => "bundling",
            LaunchStage::Serializing => "serializing",
            LaunchStage::Dispatching => "dispatching",
            LaunchStage::Cleaning => "cleaning",
            LaunchStage::Done => "done",
            LaunchStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LaunchStage::Done | LaunchStage::Failed)
    }
}

impl fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records stage transitions of one launch.
#[derive(Debug)]
pub(crate) struct StageTracker {
    run_id: RunId,
    current: LaunchStage,
}

impl StageTracker {
    pub(crate) fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            current: LaunchStage::Initializing,
        }
    }

    pub(crate) fn current(&self) -> LaunchStage {
        self.current
    }

    pub(crate) fn advance(&mut self, next: LaunchStage) {
        debug!(run_id = %self.run_id, from = %self.current, to = %next, "launch stage");
        self.current = next;
    }

    pub(crate) fn fail(&mut self, err: &LaunchError) {
        warn!(
            run_id = %self.run_id,
            stage = %self.current,
            kind = err.kind(),
            error = %err,
            "launch failed"
        );
        self.current = LaunchStage::Failed;
    }
}
