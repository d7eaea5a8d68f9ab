//! Index entry type and its line format.

use fit_store::EntryMode;
use fit_types::ObjectId;

/// An entry in the staging index, representing a tracked file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    /// Relative path from the workdir root, `/`-separated.
    pub path: String,
    /// Content-addressed ID of the file's blob in the object store.
    pub object_id: ObjectId,
    /// File mode (regular, executable, symlink).
    pub mode: EntryMode,
}

impl IndexEntry {
    /// Create a new index entry.
    pub fn new(path: impl Into<String>, object_id: ObjectId, mode: EntryMode) -> Self {
        Self {
            path: path.into(),
            object_id,
            mode,
        }
    }

    /// Render as `"<octal-mode> <64-hex> <path>"` (no newline).
    pub fn to_line(&self) -> String {
        format!("{} {} {}", self.mode, self.object_id, self.path)
    }

    /// Parse one index line. The path is everything after the second space,
    /// so it may itself contain spaces.
    pub fn parse_line(line: &str) -> Result<Self, String> {
        let mut fields = line.splitn(3, ' ');
        let (Some(mode), Some(hash), Some(path)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err("expected `<mode> <hash> <path>`".into());
        };
        let mode = EntryMode::parse_octal(mode).ok_or_else(|| format!("invalid mode {mode:?}"))?;
        let object_id = ObjectId::from_hex(hash).map_err(|e| format!("invalid hash: {e}"))?;
        if path.is_empty() {
            return Err("empty path".into());
        }
        Ok(Self::new(path, object_id, mode))
    }
}
