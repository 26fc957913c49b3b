use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::RunnableName;

/// Remote debugging switch for container JVMs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct DebugOptions {
    pub enabled: bool,
    /// Suspend the JVM until a debugger attaches.
    pub suspend: bool,
    /// Runnables to debug; empty means every runnable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runnables: Vec<RunnableName>,
}

impl DebugOptions {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled(suspend: bool, runnables: Vec<RunnableName>) -> Self {
        Self {
            enabled: true,
            suspend,
            runnables,
        }
    }

    /// `true` if the given runnable should start with a debug agent.
    pub fn applies_to(&self, runnable: &str) -> bool {
        self.enabled && (self.runnables.is_empty() || self.runnables.iter().any(|r| r == runnable))
    }
}

/// Effective JVM options shipped to the remote side.
///
/// `runnables` already contains the global options joined with the runnable-specific ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct JvmOptions {
    #[serde(default)]
    pub extra: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub runnables: BTreeMap<RunnableName, String>,
    #[serde(default)]
    pub debug: DebugOptions,
}

impl JvmOptions {
    /// Options a given runnable's JVM starts with.
    pub fn for_runnable(&self, runnable: &str) -> &str {
        self.runnables
            .get(runnable)
            .map(String::as_str)
            .unwrap_or(&self.extra)
    }
}

/// Join two option strings with a single space, skipping empty sides.
pub fn join_options(base: &str, extra: &str) -> String {
    match (base.is_empty(), extra.is_empty()) {
        (true, _) => extra.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base} {extra}"),
    }
}
