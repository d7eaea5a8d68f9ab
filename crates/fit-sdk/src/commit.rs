use chrono::{DateTime, Utc};
use fit_dag::ChainEntry;
use fit_index::WorkdirStatus;
use fit_types::ObjectId;
use serde::Serialize;

/// Result of a commit or snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    pub id: ObjectId,
    pub tree: ObjectId,
    /// `None` for a root commit.
    pub parent: Option<ObjectId>,
    /// Branch advanced, `None` when HEAD is detached.
    pub branch: Option<String>,
}

/// One commit as shown by `log`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub id: ObjectId,
    pub author: String,
    pub timestamp: i64,
    pub message: String,
}

impl LogEntry {
    /// Commit time as a UTC date, if the timestamp is representable.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

impl From<ChainEntry> for LogEntry {
    fn from(entry: ChainEntry) -> Self {
        Self {
            id: entry.id,
            message: entry.commit.message_str().into_owned(),
            author: entry.commit.author,
            timestamp: entry.commit.timestamp,
        }
    }
}

/// A branch as listed by `branch`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BranchInfo {
    pub name: String,
    pub target: ObjectId,
    pub current: bool,
}

/// Where HEAD ended up after a checkout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutTarget {
    Branch { name: String, commit: ObjectId },
    Detached { commit: ObjectId },
}

impl CheckoutTarget {
    pub fn commit(&self) -> ObjectId {
        match self {
            Self::Branch { commit, .. } | Self::Detached { commit } => *commit,
        }
    }
}

/// Repository status for `status`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoStatus {
    /// Checked-out branch, `None` when detached.
    pub branch: Option<String>,
    /// Commit HEAD resolves to, `None` before the first commit.
    pub head: Option<ObjectId>,
    pub changes: WorkdirStatus,
}

impl RepoStatus {
    /// Staged plus unstaged changes to tracked files.
    pub fn pending_changes(&self) -> usize {
        self.changes.staged.len() + self.changes.modified.len()
    }
}
