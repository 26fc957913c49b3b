use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::FileUri;

/// File a runnable needs at runtime, as declared in configuration.
///
/// Size and modification time may be unknown at this point; they become concrete
/// once the file is resolved into a [`ResolvedFile`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct LocalFileRef {
    /// Name the file is localized under on the remote side.
    pub name: String,
    #[cfg_attr(feature = "schema", schemars(with = "String"))]
    pub uri: FileUri,
    /// Expand the file on arrival.
    #[serde(default)]
    pub archive: bool,
    /// Inclusion pattern applied when expanding; only meaningful for archives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl LocalFileRef {
    /// Declare a plain (non-archive) file.
    pub fn new(name: impl Into<String>, uri: impl Into<FileUri>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            archive: false,
            pattern: None,
            last_modified_ms: None,
            size: None,
        }
    }

    /// Declare an archive, optionally restricted to entries matching `pattern`.
    pub fn archive(name: impl Into<String>, uri: impl Into<FileUri>, pattern: Option<String>) -> Self {
        Self {
            archive: true,
            pattern,
            ..Self::new(name, uri)
        }
    }

    /// Attach the concrete location, time and size, producing a resolved file.
    pub fn resolve_to(&self, uri: FileUri, last_modified_ms: i64, size: u64) -> ResolvedFile {
        ResolvedFile {
            name: self.name.clone(),
            uri,
            archive: self.archive,
            pattern: self.pattern.clone(),
            last_modified_ms,
            size,
        }
    }
}

/// File with a concrete location, modification time and size, ready to ship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFile {
    pub name: String,
    #[cfg_attr(feature = "schema", schemars(with = "String"))]
    pub uri: FileUri,
    pub archive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub last_modified_ms: i64,
    pub size: u64,
}
