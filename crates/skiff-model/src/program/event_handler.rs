use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{ModuleId, Properties};

/// Identifier of the handler that only logs lifecycle events.
pub const LOG_ONLY_EVENT_HANDLER: &str = "skiff.agent.LogOnlyEventHandler";

/// Handler the remote application master notifies about container lifecycle events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct EventHandlerSpec {
    pub class_name: ModuleId,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub configs: Properties,
}

impl EventHandlerSpec {
    pub fn new(class_name: impl Into<ModuleId>) -> Self {
        Self {
            class_name: class_name.into(),
            configs: Properties::new(),
        }
    }

    /// Handler used when the program does not configure one.
    pub fn log_only() -> Self {
        Self::new(LOG_ONLY_EVENT_HANDLER)
    }
}
