use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{ClusterTarget, EventHandlerSpec, Properties, RunId, RunnableName, RunnableSpec};

/// Description of a runnable program: its runnables and optional event handler.
///
/// The launch pipeline accepts exactly one runnable per program; the map form is
/// kept so descriptors stay addressable by runnable name on the remote side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ProgramSpec {
    pub name: String,
    pub runnables: BTreeMap<RunnableName, RunnableSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_handler: Option<EventHandlerSpec>,
}

impl ProgramSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runnables: BTreeMap::new(),
            event_handler: None,
        }
    }

    /// Add (or replace) a runnable keyed by its name.
    pub fn with_runnable(mut self, runnable: RunnableSpec) -> Self {
        self.runnables.insert(runnable.name.clone(), runnable);
        self
    }

    pub fn with_event_handler(mut self, handler: EventHandlerSpec) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn contains_runnable(&self, name: &str) -> bool {
        self.runnables.contains_key(name)
    }

    pub fn runnable_names(&self) -> impl Iterator<Item = &str> {
        self.runnables.keys().map(|k| k.as_str())
    }
}

/// Identity and context of one program run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ProgramRun {
    #[cfg_attr(feature = "schema", schemars(with = "String"))]
    pub run_id: RunId,
    pub namespace: String,
    pub application: String,
    pub program: String,
    /// Cluster the run is dispatched to.
    pub cluster: ClusterTarget,
    /// User/system arguments of the run; also tagged onto the logging context.
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub arguments: Properties,
}

impl ProgramRun {
    /// New run with a fresh [`RunId`].
    pub fn new(
        namespace: impl Into<String>,
        application: impl Into<String>,
        program: impl Into<String>,
        cluster: ClusterTarget,
    ) -> Self {
        Self {
            run_id: RunId::new(),
            namespace: namespace.into(),
            application: application.into(),
            program: program.into(),
            cluster,
            arguments: Properties::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_runnable_keys_by_name() {
        let spec = ProgramSpec::new("wordcount")
            .with_runnable(RunnableSpec::new("driver", "com.acme.WordCount"));

        assert!(spec.contains_runnable("driver"));
        assert!(!spec.contains_runnable("worker"));
        assert_eq!(spec.runnable_names().collect::<Vec<_>>(), vec!["driver"]);
    }

    #[test]
    fn serde_roundtrip_keeps_runnables() {
        let spec = ProgramSpec::new("wordcount")
            .with_runnable(RunnableSpec::new("driver", "com.acme.WordCount"))
            .with_event_handler(EventHandlerSpec::new("com.acme.Handler"));

        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"eventHandler\""));
        let back: ProgramSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
