//! Role classification for roster rows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an attendee; selects the certificate template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Participant,
    Staff,
}

impl Role {
    /// Classify a raw `Role` cell.
    ///
    /// Matching ignores case and surrounding whitespace. Anything other than
    /// `participant` or `staff` returns `None`; there is no fallback variant.
    pub fn classify(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "participant" => Some(Self::Participant),
            "staff" => Some(Self::Staff),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "Participant",
            Self::Staff => "Staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
