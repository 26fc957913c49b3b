use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Identifier of one execution of a program.
///
/// Created once per launch attempt and never changed afterwards.
/// Time-ordered (UUID v7), so staging directories and logs sort by start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RunId {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        Uuid::parse_str(s.trim())
            .map(RunId)
            .map_err(|_| ModelError::InvalidRunId(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::RunId;

    #[test]
    fn parse_roundtrips_display() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-run".parse::<RunId>().is_err());
    }
}
