use serde::{Deserialize, Serialize};
use std::fmt;

/// What an edit does with a value the registry rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Refuse the edit.
    #[default]
    Reject,
    /// Accept the edit and mark the key as flagged.
    Flag,
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Flag => write!(f, "flag"),
        }
    }
}
