//! State of a server-side blob copy operation.

use serde::Serialize;
use std::fmt;

/// Status the store attaches to the destination blob of a copy.
///
/// Anything other than `Pending` is terminal; only `Success` allows the
/// source blob to be deleted.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CopyStatus {
    Pending,
    Success,
    Aborted,
    Failed,
}

impl CopyStatus {
    /// Parse the store's status field. Unknown values map to `None`.
    pub fn parse(value: &str) -> Option<CopyStatus> {
        match value {
            "pending" => Some(CopyStatus::Pending),
            "success" => Some(CopyStatus::Success),
            "aborted" => Some(CopyStatus::Aborted),
            "failed" => Some(CopyStatus::Failed),
            _ => None,
        }
    }

    /// Whether the copy has finished, one way or the other.
    pub fn is_terminal(self) -> bool {
        !matches!(self, CopyStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CopyStatus::Pending => "pending",
            CopyStatus::Success => "success",
            CopyStatus::Aborted => "aborted",
            CopyStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
