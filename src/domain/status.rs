//! Document status state machine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of one stored version
///
/// `AVAILABLE`, `LOCKED` and `PENDING_DELETE` are mutually exclusive across the
/// versions of one id. `DELETED` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    /// Staged by an in-flight bundle, not yet visible
    Pending,
    /// Committed and readable
    Available,
    /// Held by a bundle that reads, updates or deletes it
    Locked,
    /// Scheduled for deletion by an in-flight bundle
    PendingDelete,
    /// Tombstone
    Deleted,
}

impl DocumentStatus {
    /// Statuses whose lease may be reclaimed once `lockEndTs` has passed
    pub const LEASED: [DocumentStatus; 3] = [
        DocumentStatus::Locked,
        DocumentStatus::Pending,
        DocumentStatus::PendingDelete,
    ];

    /// True for statuses that carry a lease
    pub fn is_leased(self) -> bool {
        Self::LEASED.contains(&self)
    }

    /// Wire name as stored in items and the search index
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "PENDING",
            DocumentStatus::Available => "AVAILABLE",
            DocumentStatus::Locked => "LOCKED",
            DocumentStatus::PendingDelete => "PENDING_DELETE",
            DocumentStatus::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(DocumentStatus::Pending),
            "AVAILABLE" => Ok(DocumentStatus::Available),
            "LOCKED" => Ok(DocumentStatus::Locked),
            "PENDING_DELETE" => Ok(DocumentStatus::PendingDelete),
            "DELETED" => Ok(DocumentStatus::Deleted),
            other => Err(format!("Unknown document status '{other}'")),
        }
    }
}
