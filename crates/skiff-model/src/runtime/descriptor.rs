use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{
    Arguments, EntryPoint, Env, EventHandlerSpec, JvmOptions, LogLevel, Properties, ResolvedFile,
    ResourceSpec, RunId, RunnableName,
    error::{ModelError, ModelResult},
};

/// Format tag written into every descriptor.
pub const DESCRIPTOR_FORMAT: &str = "skiff.runtime";

/// Current descriptor version. Readers reject anything newer.
pub const DESCRIPTOR_VERSION: u32 = 1;

/// Runnable as seen by the remote agent: resolved files instead of declarations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct RuntimeRunnable {
    pub name: RunnableName,
    pub entry_point: EntryPoint,
    pub resources: ResourceSpec,
    #[serde(default)]
    pub local_files: Vec<ResolvedFile>,
}

/// Self-contained execution plan consumed by the remote execution agent.
///
/// Everything the agent needs to start the program is inside; it never calls
/// back into the preparer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct RuntimeDescriptor {
    pub format: String,
    pub version: u32,
    #[cfg_attr(feature = "schema", schemars(with = "String"))]
    pub run_id: RunId,
    pub program_name: String,
    pub runnables: BTreeMap<RunnableName, RuntimeRunnable>,
    pub event_handler: EventHandlerSpec,
    pub arguments: Arguments,
    #[serde(default)]
    pub environments: BTreeMap<RunnableName, Env>,
    #[serde(default)]
    pub log_levels: BTreeMap<RunnableName, BTreeMap<String, LogLevel>>,
    #[serde(default)]
    pub max_retries: BTreeMap<RunnableName, u32>,
    pub jvm_options: JvmOptions,
    /// Launch configuration restricted to the propagated namespace.
    #[serde(default)]
    pub config: Properties,
    #[serde(default)]
    pub runnable_configs: BTreeMap<RunnableName, Properties>,
}

impl RuntimeDescriptor {
    /// Serialize as pretty JSON.
    pub fn encode(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a descriptor, rejecting foreign formats and newer versions
    /// before looking at the rest of the structure.
    pub fn decode(raw: &str) -> ModelResult<Self> {
        #[derive(Deserialize)]
        struct Header {
            format: String,
            version: u32,
        }

        let header: Header = serde_json::from_str(raw)?;
        if header.format != DESCRIPTOR_FORMAT || header.version > DESCRIPTOR_VERSION {
            return Err(ModelError::IncompatibleDescriptor {
                format: header.format,
                version: header.version,
            });
        }
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileUri, LocalFileRef};

    fn sample() -> RuntimeDescriptor {
        let file = LocalFileRef::new("data.csv", "/tmp/data.csv").resolve_to(
            FileUri::new("/tmp/data.csv"),
            7,
            100,
        );
        let mut runnables = BTreeMap::new();
        runnables.insert(
            "driver".to_string(),
            RuntimeRunnable {
                name: "driver".into(),
                entry_point: EntryPoint::new("com.acme.Driver"),
                resources: ResourceSpec::default(),
                local_files: vec![file],
            },
        );
        RuntimeDescriptor {
            format: DESCRIPTOR_FORMAT.into(),
            version: DESCRIPTOR_VERSION,
            run_id: RunId::new(),
            program_name: "wordcount".into(),
            runnables,
            event_handler: EventHandlerSpec::log_only(),
            arguments: Arguments::default(),
            environments: BTreeMap::new(),
            log_levels: BTreeMap::new(),
            max_retries: BTreeMap::new(),
            jvm_options: JvmOptions::default(),
            config: Properties::new(),
            runnable_configs: BTreeMap::new(),
        }
    }

    #[test]
    fn encode_then_decode_is_lossless() {
        let d = sample();
        let back = RuntimeDescriptor::decode(&d.encode().unwrap()).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn decode_rejects_newer_version() {
        let mut d = sample();
        d.version = DESCRIPTOR_VERSION + 1;
        let raw = serde_json::to_string(&d).unwrap();

        match RuntimeDescriptor::decode(&raw) {
            Err(ModelError::IncompatibleDescriptor { version, .. }) => {
                assert_eq!(version, DESCRIPTOR_VERSION + 1)
            }
            other => panic!("expected IncompatibleDescriptor, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_foreign_format() {
        let raw = r#"{"format":"twill","version":1}"#;
        assert!(matches!(
            RuntimeDescriptor::decode(raw),
            Err(ModelError::IncompatibleDescriptor { .. })
        ));
    }

    #[test]
    fn decode_reports_malformed_json() {
        assert!(matches!(
            RuntimeDescriptor::decode("{"),
            Err(ModelError::MalformedDescriptor(_))
        ));
    }
}
