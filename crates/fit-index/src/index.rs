//! The core Index structure managing staged entries.
//!
//! Entries are kept in insertion order and are unique by path: staging a
//! path that is already tracked replaces its entry in place. The order is
//! the order of the resulting tree.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fit_store::{Blob, EntryMode, ObjectStore};
use fit_types::ObjectId;
use tracing::{debug, warn};

use crate::entry::IndexEntry;
use crate::error::{IndexError, IndexResult};
use crate::status::{FileStatus, StatusEntry, WorkdirStatus};
use crate::tree::{build_tree, flatten_tree, TreeLayout};

/// Name of the repository directory, never tracked.
const REPO_DIR: &str = ".fit";

/// The staging index: tracks which files go into the next commit.
pub struct Index {
    /// Where the index is persisted.
    path: PathBuf,
    /// Tracked entries in insertion order.
    entries: Vec<IndexEntry>,
    /// The object store for writing blobs and trees.
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Index {
    /// Create a new empty index persisted at `path`.
    pub fn new(path: impl Into<PathBuf>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            store,
        }
    }

    /// Load the index file. A missing file is an empty index.
    pub fn load(path: impl Into<PathBuf>, store: Arc<dyn ObjectStore>) -> IndexResult<Self> {
        let mut index = Self::new(path, store);
        let text = match fs::read_to_string(&index.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(index),
            Err(e) => return Err(e.into()),
        };
        for (i, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let entry = IndexEntry::parse_line(line)
                .map_err(|reason| IndexError::Malformed { line: i + 1, reason })?;
            index.upsert(entry);
        }
        debug!(path = %index.path.display(), entries = index.len(), "loaded index");
        Ok(index)
    }

    /// Rewrite the index file with the current entries, in order.
    pub fn save(&self) -> IndexResult<()> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_line());
            out.push('\n');
        }
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(out.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| IndexError::Io(e.error))?;
        Ok(())
    }

    /// Where the index is persisted.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tracked entries in order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get an entry by path.
    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    fn upsert(&mut self, entry: IndexEntry) {
        match self.entries.iter_mut().find(|e| e.path == entry.path) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    // ---------------------------------------------------------------
    // Stage operations
    // ---------------------------------------------------------------

    /// Stage an already-stored object under `path`. In memory only.
    pub fn stage(&mut self, path: &str, object_id: ObjectId, mode: EntryMode) -> IndexResult<()> {
        let path = normalize_path(path)?;
        self.upsert(IndexEntry::new(path, object_id, mode));
        Ok(())
    }

    /// Remove an entry from the index entirely.
    pub fn remove(&mut self, path: &str) -> IndexResult<IndexEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.path == path)
            .ok_or_else(|| IndexError::PathNotFound(path.to_string()))?;
        Ok(self.entries.remove(pos))
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Stage `path` (relative to `workdir`) and persist the index.
    ///
    /// A directory stages every file beneath it. Returns the staged entries.
    pub fn add(&mut self, workdir: &Path, path: &str) -> IndexResult<Vec<IndexEntry>> {
        let rel = normalize_path(path)?;
        let abs = workdir.join(&rel);
        let meta = match fs::symlink_metadata(&abs) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexError::NotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let staged = if meta.is_dir() {
            let mut staged = Vec::new();
            for file in walk_files(workdir, &abs)? {
                staged.push(self.stage_file(workdir, &file)?);
            }
            staged
        } else {
            vec![self.stage_file(workdir, &rel)?]
        };
        self.save()?;
        Ok(staged)
    }

    /// Stage every file under `workdir` (skipping `.fit`) and drop entries
    /// whose files are gone, then persist. Returns the number of entries.
    pub fn add_all(&mut self, workdir: &Path) -> IndexResult<usize> {
        let files = walk_files(workdir, workdir)?;
        let present: HashSet<&str> = files.iter().map(String::as_str).collect();
        self.entries.retain(|e| present.contains(e.path.as_str()));
        for file in &files {
            self.stage_file(workdir, file)?;
        }
        self.save()?;
        Ok(self.len())
    }

    fn stage_file(&mut self, workdir: &Path, rel: &str) -> IndexResult<IndexEntry> {
        let abs = workdir.join(rel);
        let meta = fs::symlink_metadata(&abs)?;
        let mode = file_mode(&meta);
        let blob = Blob::new(read_content(&abs, mode)?);
        let object_id = self.store.write(&blob.to_stored_object())?;
        debug!(path = rel, id = %object_id.short_hex(), %mode, "staged");
        let entry = IndexEntry::new(rel, object_id, mode);
        self.upsert(entry.clone());
        Ok(entry)
    }

    // ---------------------------------------------------------------
    // Tree building
    // ---------------------------------------------------------------

    /// Write the staged entries as tree objects and return the root id.
    pub fn write_tree(&self, layout: TreeLayout) -> IndexResult<ObjectId> {
        build_tree(&*self.store, &self.entries, layout)
    }

    /// Replace the index contents with the files of an existing tree.
    pub fn read_tree(&mut self, tree_id: &ObjectId) -> IndexResult<()> {
        self.entries = flatten_tree(&*self.store, tree_id)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Status computation
    // ---------------------------------------------------------------

    /// Compare HEAD's tree, the index, and the working directory.
    pub fn status(&self, workdir: &Path, head_tree: Option<&ObjectId>) -> IndexResult<WorkdirStatus> {
        let mut result = WorkdirStatus::new();

        let head = match head_tree {
            Some(id) => flatten_tree(&*self.store, id)?,
            None => Vec::new(),
        };
        let head_map: HashMap<&str, &IndexEntry> =
            head.iter().map(|e| (e.path.as_str(), e)).collect();

        for entry in &self.entries {
            match head_map.get(entry.path.as_str()) {
                None => result
                    .staged
                    .push(StatusEntry::new(&entry.path, FileStatus::New)),
                Some(h) if h.object_id != entry.object_id || h.mode != entry.mode => result
                    .staged
                    .push(StatusEntry::new(&entry.path, FileStatus::Modified)),
                Some(_) => {}
            }
        }
        for h in &head {
            if self.get(&h.path).is_none() {
                result
                    .staged
                    .push(StatusEntry::new(&h.path, FileStatus::Deleted));
            }
        }

        for entry in &self.entries {
            let abs = workdir.join(&entry.path);
            let meta = match fs::symlink_metadata(&abs) {
                Ok(meta) => meta,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    result
                        .modified
                        .push(StatusEntry::new(&entry.path, FileStatus::Deleted));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if meta.is_dir() {
                result
                    .modified
                    .push(StatusEntry::new(&entry.path, FileStatus::Deleted));
                continue;
            }
            let content = read_content(&abs, file_mode(&meta))?;
            let id = Blob::new(content).to_stored_object().compute_id();
            if id != entry.object_id {
                result
                    .modified
                    .push(StatusEntry::new(&entry.path, FileStatus::Modified));
            }
        }

        let tracked: HashSet<&str> = self.entries.iter().map(|e| e.path.as_str()).collect();
        result.untracked = walk_files(workdir, workdir)?
            .into_iter()
            .filter(|p| !tracked.contains(p.as_str()))
            .collect();

        Ok(result)
    }
}

/// Normalise a user-supplied relative path to the `/`-separated index form.
fn normalize_path(path: &str) -> IndexResult<String> {
    if path.starts_with('/') || path.contains(|c| matches!(c, '\n' | '\r' | '\0')) {
        return Err(IndexError::InvalidPath(path.to_string()));
    }
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(IndexError::InvalidPath(path.to_string())),
            _ => parts.push(part),
        }
    }
    if parts.first() == Some(&REPO_DIR) {
        return Err(IndexError::InvalidPath(path.to_string()));
    }
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> EntryMode {
    use std::os::unix::fs::PermissionsExt;
    if meta.file_type().is_symlink() {
        EntryMode::Symlink
    } else {
        EntryMode::from_mode_bits(meta.permissions().mode())
    }
}

#[cfg(not(unix))]
fn file_mode(meta: &fs::Metadata) -> EntryMode {
    if meta.file_type().is_symlink() {
        EntryMode::Symlink
    } else {
        EntryMode::Regular
    }
}

/// File bytes, or the link target for symlinks.
fn read_content(abs: &Path, mode: EntryMode) -> IndexResult<Vec<u8>> {
    if mode == EntryMode::Symlink {
        let target = fs::read_link(abs)?;
        return Ok(target.to_string_lossy().into_owned().into_bytes());
    }
    Ok(fs::read(abs)?)
}

/// Every file or symlink under `start`, as sorted workdir-relative paths.
fn walk_files(workdir: &Path, start: &Path) -> IndexResult<Vec<String>> {
    let repo_dir = workdir.join(REPO_DIR);
    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(start)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.path() != repo_dir);
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(workdir) else {
            continue;
        };
        let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
        match parts {
            Some(parts) => files.push(parts.join("/")),
            None => warn!(path = %entry.path().display(), "skipping non UTF-8 path"),
        }
    }
    Ok(files)
}
