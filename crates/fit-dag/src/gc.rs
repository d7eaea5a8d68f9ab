//! Mark-and-sweep garbage collection over the object store.
//!
//! Roots are every branch tip plus a detached HEAD. Marking is iterative
//! with an explicit stack so deep histories cannot exhaust the call stack.
//! Objects missing from the store are tolerated during marking; an object
//! that exists but does not decode aborts the collection before anything is
//! deleted.

use std::collections::HashSet;

use fit_refs::{Head, RefStore};
use fit_store::{Commit, ObjectKind, ObjectStore, Tree};
use fit_types::ObjectId;
use tracing::{debug, info, warn};

use crate::error::DagResult;

/// Knobs for a collection run.
#[derive(Clone, Copy, Debug, Default)]
pub struct GcOptions {
    /// Report what would be removed without deleting anything.
    pub dry_run: bool,
}

/// Outcome of a collection run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Objects found in the store.
    pub scanned: usize,
    /// Objects reachable from a root.
    pub reachable: usize,
    /// Unreachable objects deleted (or that would be, on a dry run).
    pub removed: usize,
    /// Unreachable objects whose deletion failed.
    pub failed: usize,
}

/// Every object reachable from `roots`.
pub fn mark_reachable(store: &dyn ObjectStore, roots: &[ObjectId]) -> DagResult<HashSet<ObjectId>> {
    let mut marked = HashSet::new();
    let mut stack: Vec<ObjectId> = roots.iter().filter(|id| !id.is_null()).copied().collect();

    while let Some(id) = stack.pop() {
        if !marked.insert(id) {
            continue;
        }
        let Some(obj) = store.try_read(&id)? else {
            debug!(id = %id.short_hex(), "dangling reference");
            continue;
        };
        match obj.kind {
            ObjectKind::Blob => {}
            ObjectKind::Tree => {
                let tree = Tree::from_stored_object(&id, obj)?;
                stack.extend(tree.entries.iter().map(|e| e.object_id));
            }
            ObjectKind::Commit => {
                let commit = Commit::from_stored_object(&id, obj)?;
                stack.push(commit.tree);
                if commit.has_parent() {
                    stack.push(commit.parent);
                }
            }
        }
    }
    Ok(marked)
}

/// Delete every object not reachable from a branch or detached HEAD.
pub fn collect_garbage(
    store: &dyn ObjectStore,
    refs: &dyn RefStore,
    options: GcOptions,
) -> DagResult<GcReport> {
    let all = store.list()?;

    let mut roots: Vec<ObjectId> = refs.list_refs()?.into_iter().map(|r| r.target).collect();
    if let Some(Head::Detached(id)) = refs.head()? {
        roots.push(id);
    }
    let marked = mark_reachable(store, &roots)?;

    let mut report = GcReport {
        scanned: all.len(),
        reachable: all.iter().filter(|id| marked.contains(*id)).count(),
        ..GcReport::default()
    };

    for id in all.iter().filter(|id| !marked.contains(*id)) {
        if options.dry_run {
            debug!(id = %id.short_hex(), "would remove");
            report.removed += 1;
            continue;
        }
        match store.delete(id) {
            Ok(_) => {
                debug!(id = %id.short_hex(), "removed");
                report.removed += 1;
            }
            Err(e) => {
                warn!(id = %id.short_hex(), error = %e, "failed to remove object");
                report.failed += 1;
            }
        }
    }

    info!(
        scanned = report.scanned,
        reachable = report.reachable,
        removed = report.removed,
        failed = report.failed,
        dry_run = options.dry_run,
        "garbage collection finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::linear_history;
    use fit_refs::InMemoryRefStore;
    use fit_store::{Blob, EntryMode, InMemoryObjectStore, LooseObjectStore, TreeEntry};

    fn blob(store: &dyn ObjectStore, data: &[u8]) -> ObjectId {
        store.write(&Blob::new(data.to_vec()).to_stored_object()).unwrap()
    }

    #[test]
    fn unreachable_objects_are_removed() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let kept = blob(&store, b"kept");
        let tree = Tree::new(vec![TreeEntry::new(EntryMode::Regular, "k", kept)])
            .write_to(&store)
            .unwrap();
        let commit = Commit::new(tree, ObjectId::null(), "t", 0, "c")
            .write_to(&store)
            .unwrap();
        refs.write_ref("main", &commit).unwrap();
        let junk = blob(&store, b"junk");

        let report = collect_garbage(&store, &refs, GcOptions::default()).unwrap();
        assert_eq!(
            report,
            GcReport {
                scanned: 4,
                reachable: 3,
                removed: 1,
                failed: 0
            }
        );
        assert!(!store.exists(&junk).unwrap());
        for id in [kept, tree, commit] {
            assert!(store.exists(&id).unwrap());
        }

        let again = collect_garbage(&store, &refs, GcOptions::default()).unwrap();
        assert_eq!(again.removed, 0);
    }

    #[test]
    fn dry_run_deletes_nothing() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let junk = blob(&store, b"junk");
        let report = collect_garbage(&store, &refs, GcOptions { dry_run: true }).unwrap();
        assert_eq!(report.removed, 1);
        assert!(store.exists(&junk).unwrap());
    }

    #[test]
    fn whole_history_is_kept() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let ids = linear_history(&store, 500);
        refs.write_ref("main", ids.last().unwrap()).unwrap();
        let report = collect_garbage(&store, &refs, GcOptions::default()).unwrap();
        assert_eq!(report.removed, 0);
        assert_eq!(report.reachable, 501);
    }

    #[test]
    fn detached_head_is_a_root() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let ids = linear_history(&store, 2);
        refs.set_head_detached(&ids[1]).unwrap();
        let report = collect_garbage(&store, &refs, GcOptions::default()).unwrap();
        assert_eq!(report.removed, 0);
    }

    #[test]
    fn dangling_references_are_tolerated() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let root = Tree::new(vec![TreeEntry::new(
            EntryMode::Regular,
            "ghost",
            ObjectId::digest(b"ghost"),
        )])
        .write_to(&store)
        .unwrap();
        let commit = Commit::new(root, ObjectId::digest(b"lost parent"), "t", 0, "c")
            .write_to(&store)
            .unwrap();
        refs.write_ref("main", &commit).unwrap();
        let report = collect_garbage(&store, &refs, GcOptions::default()).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.reachable, 2);
        assert_eq!(report.removed, 0);
    }

    #[test]
    fn sweeps_loose_store_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("objects"));
        store.init().unwrap();
        let refs = InMemoryRefStore::new();
        let junk = blob(&store, b"junk");
        let report = collect_garbage(&store, &refs, GcOptions::default()).unwrap();
        assert_eq!(report.removed, 1);
        assert!(!store.object_path(&junk).exists());
    }
}
