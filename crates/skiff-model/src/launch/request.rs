use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{FileUri, Properties, RunId};

/// Cluster a run is dispatched to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClusterTarget {
    pub name: String,
    /// Cluster-specific properties forwarded untouched to the launcher.
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl ClusterTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Properties::new(),
        }
    }
}

/// One file the launcher must localize for the remote side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct LauncherFile {
    pub name: String,
    #[cfg_attr(feature = "schema", schemars(with = "String"))]
    pub uri: FileUri,
    pub archive: bool,
}

impl LauncherFile {
    pub fn new(name: impl Into<String>, uri: FileUri, archive: bool) -> Self {
        Self {
            name: name.into(),
            uri,
            archive,
        }
    }
}

impl fmt::Display for LauncherFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LauncherFile(name='{}', uri='{}', archive={})",
            self.name, self.uri, self.archive
        )
    }
}

/// Final payload handed to the cluster launcher.
///
/// Files are ordered: packaged bundles first, then each runnable's resolved files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    #[cfg_attr(feature = "schema", schemars(with = "String"))]
    pub run_id: RunId,
    pub cluster: String,
    pub files: Vec<LauncherFile>,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl LaunchRequest {
    /// Look up a file entry by its localized name.
    pub fn file(&self, name: &str) -> Option<&LauncherFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_camel_case() {
        let req = LaunchRequest {
            run_id: RunId::new(),
            cluster: "dataproc-1".into(),
            files: vec![LauncherFile::new(
                "launcher.zip",
                FileUri::new("file:///tmp/launcher.zip"),
                false,
            )],
            properties: [("region", "us-east1")].into_iter().collect(),
        };

        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("runId").is_some());
        assert_eq!(json["files"][0]["archive"], false);
        assert_eq!(json["properties"]["region"], "us-east1");
    }

    #[test]
    fn file_lookup_by_name() {
        let req = LaunchRequest {
            run_id: RunId::new(),
            cluster: "c".into(),
            files: vec![
                LauncherFile::new("a", FileUri::new("/a"), false),
                LauncherFile::new("b", FileUri::new("/b"), true),
            ],
            properties: Properties::new(),
        };

        assert!(req.file("b").unwrap().archive);
        assert!(req.file("c").is_none());
        assert_eq!(req.file_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
