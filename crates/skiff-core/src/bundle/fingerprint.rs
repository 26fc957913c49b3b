use std::{collections::BTreeSet, fmt};

use sha2::{Digest, Sha256};

use skiff_model::constants::APPLICATION_BUNDLE;

/// Content fingerprint of a set of class ids.
///
/// Lowercase hex of the first 128 bits of a SHA-256 over the sorted, de-duplicated ids.
/// Independent of input order and multiplicity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sorted: BTreeSet<String> = ids
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut hasher = Sha256::new();
        for id in &sorted {
            hasher.update(id.as_bytes());
            // separator keeps ["ab", "c"] and ["a", "bc"] apart
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        let hex = digest[..16].iter().map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache key of the application bundle built from these ids.
    pub fn application_bundle_name(&self) -> String {
        format!("{}-{APPLICATION_BUNDLE}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
