use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{LocalFileRef, ModuleId, Properties, RunnableName};

/// Container resources requested for a runnable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    pub virtual_cores: u32,
    pub memory_mb: u32,
    pub instances: u32,
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            virtual_cores: 1,
            memory_mb: 512,
            instances: 1,
        }
    }
}

/// Entry point of a runnable: the identifier the remote agent instantiates, plus its static config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    pub class_name: ModuleId,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub config: Properties,
}

impl EntryPoint {
    pub fn new(class_name: impl Into<ModuleId>) -> Self {
        Self {
            class_name: class_name.into(),
            config: Properties::new(),
        }
    }
}

/// Declarative description of the single program unit being launched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct RunnableSpec {
    pub name: RunnableName,
    pub entry_point: EntryPoint,
    #[serde(default)]
    pub resources: ResourceSpec,
    /// Files the runnable expects to find localized when it starts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_files: Vec<LocalFileRef>,
}

impl RunnableSpec {
    pub fn new(name: impl Into<RunnableName>, entry_point: impl Into<ModuleId>) -> Self {
        Self {
            name: name.into(),
            entry_point: EntryPoint::new(entry_point),
            resources: ResourceSpec::default(),
            local_files: Vec::new(),
        }
    }

    /// Builder-style helper to declare a runtime file.
    pub fn with_local_file(mut self, file: LocalFileRef) -> Self {
        self.local_files.push(file);
        self
    }

    pub fn with_resources(mut self, resources: ResourceSpec) -> Self {
        self.resources = resources;
        self
    }
}
