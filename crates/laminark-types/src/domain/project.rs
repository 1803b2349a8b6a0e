use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic 32-character tag scoping every row to a host working directory.
///
/// Computed by `laminark-core` from the canonical project root; stored here as an
/// opaque newtype so storage and graph code never construct one ad hoc.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectTag(String);

impl ProjectTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProjectTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProjectTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
