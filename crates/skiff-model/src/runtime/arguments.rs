use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::RunnableName;

/// Positional startup arguments: program-wide ones first, then per-runnable ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Arguments {
    #[serde(default)]
    pub application: Vec<String>,
    #[serde(default)]
    pub runnables: BTreeMap<RunnableName, Vec<String>>,
}

impl Arguments {
    /// Full argument vector seen by `runnable`: application arguments followed by its own.
    pub fn for_runnable(&self, runnable: &str) -> Vec<String> {
        let mut out = self.application.clone();
        if let Some(own) = self.runnables.get(runnable) {
            out.extend(own.iter().cloned());
        }
        out
    }
}
