//! Classification of a file-level change.

use serde::{Deserialize, Serialize};

/// What kind of operation a file diff represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// File was added
    Added,
    /// File was deleted
    Deleted,
    /// File was moved to a new path
    Renamed,
    /// File content changed in place
    Modified,
    /// No determinable change
    None,
}

impl ChangeKind {
    /// Decide the change kind from descriptor flags and blob identities.
    ///
    /// The flags are checked first, in order; the identities are only compared
    /// when none of them is set.
    pub fn classify<Id: PartialEq>(
        new_file: bool,
        deleted_file: bool,
        renamed: bool,
        before: Option<&Id>,
        after: Option<&Id>,
    ) -> Self {
        if new_file {
            return ChangeKind::Added;
        }
        if deleted_file {
            return ChangeKind::Deleted;
        }
        if renamed {
            return ChangeKind::Renamed;
        }
        match (before, after) {
            (Some(before), Some(after)) if before != after => ChangeKind::Modified,
            _ => ChangeKind::None,
        }
    }

    /// Payload name, `None` for no determinable change.
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            ChangeKind::Added => Some("added"),
            ChangeKind::Deleted => Some("deleted"),
            ChangeKind::Renamed => Some("renamed"),
            ChangeKind::Modified => Some("modified"),
            ChangeKind::None => None,
        }
    }
}
