//! On-disk reference store.
//!
//! Layout, relative to the repository directory:
//!
//! ```text
//! HEAD                 "ref: refs/heads/<branch>\n" or "<64 hex>\n"
//! refs/heads/<branch>  "<64 hex>\n"
//! ```
//!
//! Every write goes through a temp file in the target directory followed by a
//! rename, so a reader sees either the old or the new value.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use fit_types::ObjectId;
use tracing::{debug, warn};

use crate::error::{RefError, Result};
use crate::names::validate_branch_name;
use crate::traits::RefStore;
use crate::types::{Head, Ref, HEADS_PREFIX};

/// Filesystem-backed [`RefStore`] rooted at a repository directory.
#[derive(Clone, Debug)]
pub struct FsRefStore {
    root: PathBuf,
}

impl FsRefStore {
    /// Create a store rooted at `root` (the `.fit` directory).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create `refs/heads/`.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.heads_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn heads_dir(&self) -> PathBuf {
        self.root.join(HEADS_PREFIX.trim_end_matches('/'))
    }

    fn head_path(&self) -> PathBuf {
        self.root.join("HEAD")
    }

    /// Path of the file backing `branch`. Validates the name first.
    pub fn ref_path(&self, branch: &str) -> Result<PathBuf> {
        validate_branch_name(branch)?;
        Ok(self.heads_dir().join(branch))
    }

    fn write_atomic(path: &Path, contents: &str) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.persist(path).map_err(|e| RefError::Io(e.error))?;
        Ok(())
    }

    fn read_optional(path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn parse_ref_file(path: &Path, text: &str) -> Result<ObjectId> {
        ObjectId::from_hex(text.trim_end()).map_err(|e| RefError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl RefStore for FsRefStore {
    fn read_ref(&self, branch: &str) -> Result<Option<ObjectId>> {
        let path = self.ref_path(branch)?;
        match Self::read_optional(&path)? {
            Some(text) => Self::parse_ref_file(&path, &text).map(Some),
            None => Ok(None),
        }
    }

    fn write_ref(&self, branch: &str, target: &ObjectId) -> Result<()> {
        let path = self.ref_path(branch)?;
        Self::write_atomic(&path, &format!("{target}\n"))?;
        debug!(branch, target = %target.short_hex(), "updated ref");
        Ok(())
    }

    fn delete_ref(&self, branch: &str) -> Result<bool> {
        let path = self.ref_path(branch)?;
        if self.current_branch()?.as_deref() == Some(branch) {
            return Err(RefError::DeleteCurrentBranch {
                name: branch.to_string(),
            });
        }
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        // Prune directories left empty by a nested branch name.
        let heads = self.heads_dir();
        let mut dir = path.parent();
        while let Some(d) = dir {
            if d == heads.as_path() || fs::remove_dir(d).is_err() {
                break;
            }
            dir = d.parent();
        }
        debug!(branch, "deleted ref");
        Ok(true)
    }

    fn list_refs(&self) -> Result<Vec<Ref>> {
        let heads = self.heads_dir();
        if !heads.exists() {
            return Ok(Vec::new());
        }

        let mut refs = Vec::new();
        for entry in walkdir::WalkDir::new(&heads).min_depth(1) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&heads) else {
                continue;
            };
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if validate_branch_name(&name).is_err() {
                warn!(path = %entry.path().display(), "skipping stray file under refs/heads");
                continue;
            }
            let text = fs::read_to_string(entry.path())?;
            refs.push(Ref::new(name, Self::parse_ref_file(entry.path(), &text)?));
        }
        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(refs)
    }

    fn head(&self) -> Result<Option<Head>> {
        let path = self.head_path();
        let Some(text) = Self::read_optional(&path)? else {
            return Ok(None);
        };
        Head::parse(&text)
            .map(Some)
            .ok_or_else(|| RefError::Malformed {
                path,
                reason: format!("unrecognised HEAD contents {:?}", text.trim_end()),
            })
    }

    fn set_head(&self, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        Self::write_atomic(&self.head_path(), &Head::Symbolic(branch.to_string()).encode())?;
        debug!(branch, "HEAD now symbolic");
        Ok(())
    }

    fn set_head_detached(&self, target: &ObjectId) -> Result<()> {
        Self::write_atomic(&self.head_path(), &Head::Detached(*target).encode())?;
        debug!(target = %target.short_hex(), "HEAD detached");
        Ok(())
    }
}
