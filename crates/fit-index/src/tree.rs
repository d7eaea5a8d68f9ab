//! Conversion between index entries and tree objects.
//!
//! [`TreeLayout::Nested`] splits paths on `/` and writes one subtree per
//! directory. [`TreeLayout::Flat`] writes a single tree whose entry names are
//! the full paths. Both keep the index order: nested subtrees appear where
//! their directory was first seen.

use fit_store::{EntryMode, ObjectStore, Tree, TreeEntry};
use fit_types::ObjectId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::IndexEntry;
use crate::error::{IndexError, IndexResult};

/// How index paths map onto tree objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeLayout {
    /// One tree object per directory.
    #[default]
    Nested,
    /// One tree holding full paths as entry names.
    Flat,
}

/// A directory being assembled, children in first-appearance order.
#[derive(Default)]
struct DirNode {
    children: Vec<(String, Child)>,
}

enum Child {
    File(EntryMode, ObjectId),
    Dir(DirNode),
}

impl DirNode {
    fn insert(&mut self, full_path: &str, components: &[&str], entry: &IndexEntry) -> IndexResult<()> {
        let conflict = || IndexError::InvalidPath(format!("{full_path}: file and directory share a name"));
        match components {
            [] => Err(IndexError::InvalidPath(full_path.to_string())),
            [name] => {
                if self.children.iter().any(|(n, _)| n == name) {
                    return Err(conflict());
                }
                self.children
                    .push((name.to_string(), Child::File(entry.mode, entry.object_id)));
                Ok(())
            }
            [dir, rest @ ..] => {
                let pos = match self.children.iter().position(|(n, _)| n == dir) {
                    Some(pos) => pos,
                    None => {
                        self.children
                            .push((dir.to_string(), Child::Dir(DirNode::default())));
                        self.children.len() - 1
                    }
                };
                match &mut self.children[pos].1 {
                    Child::Dir(node) => node.insert(full_path, rest, entry),
                    Child::File(..) => Err(conflict()),
                }
            }
        }
    }

    fn write(self, store: &dyn ObjectStore) -> IndexResult<ObjectId> {
        let mut entries = Vec::with_capacity(self.children.len());
        for (name, child) in self.children {
            let entry = match child {
                Child::File(mode, id) => TreeEntry::new(mode, name, id),
                Child::Dir(node) => TreeEntry::new(EntryMode::Directory, name, node.write(store)?),
            };
            entries.push(entry);
        }
        Ok(Tree::new(entries).write_to(store)?)
    }
}

/// Write `entries` as tree objects and return the root tree id.
pub fn build_tree(
    store: &dyn ObjectStore,
    entries: &[IndexEntry],
    layout: TreeLayout,
) -> IndexResult<ObjectId> {
    let id = match layout {
        TreeLayout::Flat => Tree::new(
            entries
                .iter()
                .map(|e| TreeEntry::new(e.mode, e.path.clone(), e.object_id))
                .collect(),
        )
        .write_to(store)?,
        TreeLayout::Nested => {
            let mut root = DirNode::default();
            for entry in entries {
                let components: Vec<&str> = entry.path.split('/').collect();
                root.insert(&entry.path, &components, entry)?;
            }
            root.write(store)?
        }
    };
    debug!(tree = %id.short_hex(), entries = entries.len(), ?layout, "wrote tree");
    Ok(id)
}

/// Expand a tree into index entries, descending into subtrees in order.
///
/// Flat trees come back unchanged since their names already hold full paths.
pub fn flatten_tree(store: &dyn ObjectStore, tree_id: &ObjectId) -> IndexResult<Vec<IndexEntry>> {
    let mut out = Vec::new();
    flatten_into(store, tree_id, "", &mut out)?;
    Ok(out)
}

fn flatten_into(
    store: &dyn ObjectStore,
    tree_id: &ObjectId,
    prefix: &str,
    out: &mut Vec<IndexEntry>,
) -> IndexResult<()> {
    for entry in Tree::read_from(store, tree_id)?.entries {
        let path = if prefix.is_empty() {
            entry.name
        } else {
            format!("{prefix}/{}", entry.name)
        };
        if entry.mode.is_dir() {
            flatten_into(store, &entry.object_id, &path, out)?;
        } else {
            out.push(IndexEntry::new(path, entry.object_id, entry.mode));
        }
    }
    Ok(())
}
