//! Working directory status types.
//!
//! Status compares three states: the tree HEAD points at, the index, and
//! the files on disk.

/// Complete status of the working directory relative to HEAD and the index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkdirStatus {
    /// Index differs from HEAD: these go into the next commit.
    pub staged: Vec<StatusEntry>,
    /// Working file differs from its index entry.
    pub modified: Vec<StatusEntry>,
    /// Files present in the working directory but not tracked.
    pub untracked: Vec<String>,
}

impl WorkdirStatus {
    /// Create an empty status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no changes of any kind.
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.modified.is_empty() && self.untracked.is_empty()
    }

    /// Returns `true` if there are any staged changes.
    pub fn has_staged_changes(&self) -> bool {
        !self.staged.is_empty()
    }
}

/// A single status entry representing a file change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEntry {
    /// The file path relative to the workdir root.
    pub path: String,
    /// The kind of change.
    pub status: FileStatus,
}

impl StatusEntry {
    /// Create a new status entry.
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
        }
    }
}

/// The kind of file change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileStatus {
    /// A path that did not previously exist.
    New,
    /// An existing path whose content or mode has changed.
    Modified,
    /// A path that has been removed.
    Deleted,
}

impl FileStatus {
    /// Label used by `fit status`.
    pub fn label(&self) -> &'static str {
        match self {
            FileStatus::New => "new file",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_status_is_clean() {
        let status = WorkdirStatus::new();
        assert!(status.is_clean());
        assert!(!status.has_staged_changes());
    }

    #[test]
    fn status_with_staged_is_not_clean() {
        let mut status = WorkdirStatus::new();
        status.staged.push(StatusEntry::new("file.txt", FileStatus::New));
        assert!(!status.is_clean());
        assert!(status.has_staged_changes());
    }

    #[test]
    fn untracked_alone_is_not_clean() {
        let mut status = WorkdirStatus::new();
        status.untracked.push("scratch".into());
        assert!(!status.is_clean());
        assert!(!status.has_staged_changes());
    }
}
