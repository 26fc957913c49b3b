use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Reference to a file by URI or bare filesystem path.
///
/// Only the parts the launch pipeline needs are parsed: scheme, authority and path.
/// Bare paths (`/data/x.jar`) have no scheme and are treated as local files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileUri(String);

impl FileUri {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build a `file://` URI from an absolute local path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self(format!("file://{}", path.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URI scheme, if any.
    ///
    /// Single-letter prefixes (`C:\...`) are treated as drive letters, not schemes.
    pub fn scheme(&self) -> Option<&str> {
        let idx = self.0.find(':')?;
        let candidate = &self.0[..idx];
        let mut chars = candidate.chars();
        let first = chars.next()?;
        let valid = candidate.len() > 1
            && first.is_ascii_alphabetic()
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        valid.then_some(candidate)
    }

    /// `true` for bare paths and `file:` URIs.
    pub fn is_local(&self) -> bool {
        match self.scheme() {
            None => true,
            Some(s) => s.eq_ignore_ascii_case("file"),
        }
    }

    /// `true` if the URI scheme equals `scheme` (case-insensitive).
    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.scheme()
            .is_some_and(|s| s.eq_ignore_ascii_case(scheme))
    }

    /// Authority component (`host:port`) of a `scheme://authority/path` URI.
    pub fn authority(&self) -> Option<&str> {
        let scheme = self.scheme()?;
        let rest = self.0[scheme.len() + 1..].strip_prefix("//")?;
        let end = rest.find('/').unwrap_or(rest.len());
        Some(&rest[..end])
    }

    /// Path component.
    ///
    /// Query and fragment are cut only from remote URIs; `?` and `#` are ordinary characters
    /// in bare paths and `file:` URIs.
    pub fn path(&self) -> &str {
        let without_scheme = match self.scheme() {
            Some(scheme) => {
                let rest = &self.0[scheme.len() + 1..];
                match rest.strip_prefix("//") {
                    Some(after) => after.find('/').map(|i| &after[i..]).unwrap_or(""),
                    None => rest,
                }
            }
            None => self.0.as_str(),
        };
        if self.is_local() {
            return without_scheme;
        }
        let end = without_scheme
            .find(['?', '#'])
            .unwrap_or(without_scheme.len());
        &without_scheme[..end]
    }

    /// Local filesystem path for bare paths and `file:` URIs.
    pub fn to_local_path(&self) -> Option<PathBuf> {
        self.is_local().then(|| PathBuf::from(self.path()))
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        let path = self.path();
        path.rsplit('/').next().unwrap_or(path)
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileUri {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FileUri {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Extension of a file name including the leading dot, or `""`.
pub fn file_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &name[idx..],
    }
}
