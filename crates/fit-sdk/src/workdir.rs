//! Writing trees out to the working directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use fit_index::{flatten_tree, IndexEntry};
use fit_store::{Blob, EntryMode, ObjectStore};
use fit_types::ObjectId;
use tracing::debug;

use crate::error::{SdkError, SdkResult};

/// Materialise every file of `tree` under `dest`, overwriting what is there.
///
/// Returns the entries written. Entries that would land outside `dest` or
/// inside `.fit`, that repeat a path or nest under another entry, or whose
/// parent directories in `dest` include a symlink are refused before
/// anything is written.
pub fn write_tree(store: &dyn ObjectStore, tree: &ObjectId, dest: &Path) -> SdkResult<Vec<IndexEntry>> {
    let entries = flatten_tree(store, tree)?;
    reject_colliding_paths(&entries)?;
    let targets = entries
        .iter()
        .map(|e| safe_join(dest, &e.path))
        .collect::<SdkResult<Vec<_>>>()?;
    for entry in &entries {
        reject_symlinked_parents(dest, &entry.path)?;
    }

    for (entry, target) in entries.iter().zip(&targets) {
        let blob = Blob::from_stored_object(&entry.object_id, store.read(&entry.object_id)?)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        write_file(target, &blob.data, entry.mode)?;
        debug!(path = %entry.path, id = %entry.object_id.short_hex(), "restored");
    }
    Ok(entries)
}

/// Remove a tracked file, then any directories it leaves empty.
pub fn remove_file(workdir: &Path, rel: &str) -> SdkResult<()> {
    let target = safe_join(workdir, rel)?;
    reject_symlinked_parents(workdir, rel)?;
    match fs::remove_file(&target) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    }
    let mut dir = target.parent();
    while let Some(d) = dir {
        if d == workdir || fs::remove_dir(d).is_err() {
            break;
        }
        dir = d.parent();
    }
    Ok(())
}

fn safe_join(root: &Path, rel: &str) -> SdkResult<PathBuf> {
    let unsafe_path = || SdkError::UnsafePath(rel.to_string());
    let mut path = root.to_path_buf();
    for (i, part) in rel.split('/').enumerate() {
        match part {
            "" | "." | ".." => return Err(unsafe_path()),
            ".fit" if i == 0 => return Err(unsafe_path()),
            _ if part.contains('\\') => return Err(unsafe_path()),
            _ => path.push(part),
        }
    }
    Ok(path)
}

/// A path may appear once, and never as the directory of another entry.
fn reject_colliding_paths(entries: &[IndexEntry]) -> SdkResult<()> {
    let mut paths = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !paths.insert(entry.path.as_str()) {
            return Err(SdkError::UnsafePath(entry.path.clone()));
        }
    }
    for entry in entries {
        let mut rest = entry.path.as_str();
        while let Some((parent, _)) = rest.rsplit_once('/') {
            if paths.contains(parent) {
                return Err(SdkError::UnsafePath(entry.path.clone()));
            }
            rest = parent;
        }
    }
    Ok(())
}

/// Fail if any existing directory between `root` and `rel` is a symlink.
fn reject_symlinked_parents(root: &Path, rel: &str) -> SdkResult<()> {
    let Some((parents, _)) = rel.rsplit_once('/') else {
        return Ok(());
    };
    let mut path = root.to_path_buf();
    for part in parents.split('/') {
        path.push(part);
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(SdkError::UnsafePath(rel.to_string()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn write_file(target: &Path, data: &[u8], mode: EntryMode) -> SdkResult<()> {
    if let Ok(meta) = fs::symlink_metadata(target) {
        if meta.is_dir() {
            fs::remove_dir_all(target)?;
        } else {
            fs::remove_file(target)?;
        }
    }
    match mode {
        EntryMode::Symlink => write_symlink(target, data),
        EntryMode::Executable => {
            fs::write(target, data)?;
            set_executable(target)
        }
        _ => Ok(fs::write(target, data)?),
    }
}

#[cfg(unix)]
fn write_symlink(target: &Path, data: &[u8]) -> SdkResult<()> {
    use std::os::unix::ffi::OsStrExt;
    let link = std::ffi::OsStr::from_bytes(data);
    std::os::unix::fs::symlink(link, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_symlink(target: &Path, data: &[u8]) -> SdkResult<()> {
    Ok(fs::write(target, data)?)
}

#[cfg(unix)]
fn set_executable(target: &Path) -> SdkResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(target, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_target: &Path) -> SdkResult<()> {
    Ok(())
}
