//! The set of objects a transfer must carry.
//!
//! A transfer is self-contained: every walked commit travels with its full
//! tree. Order is tip commit first, each commit immediately followed by the
//! objects of its tree (depth first, tree order), with duplicates dropped.

use std::collections::HashSet;

use fit_store::{ObjectStore, Tree};
use fit_types::ObjectId;
use tracing::debug;

use crate::error::DagResult;
use crate::history::{walk_chain, MAX_CHAIN_LENGTH};

/// Object closure of the chain ending at `tip`, capped at
/// [`MAX_CHAIN_LENGTH`] commits.
pub fn transfer_set(store: &dyn ObjectStore, tip: &ObjectId) -> DagResult<Vec<ObjectId>> {
    let commits: Vec<_> = walk_chain(store, tip, MAX_CHAIN_LENGTH)?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in &commits {
        if seen.insert(entry.id) {
            out.push(entry.id);
        }
        tree_closure(store, &entry.commit.tree, &mut seen, &mut out)?;
    }
    debug!(
        tip = %tip.short_hex(),
        commits = commits.len(),
        objects = out.len(),
        "computed transfer set"
    );
    Ok(out)
}

/// Objects reachable from each of `roots` that are trees (walked) or
/// anything else (included as-is). Commits are not followed.
pub fn object_closure(store: &dyn ObjectStore, roots: &[ObjectId]) -> DagResult<Vec<ObjectId>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for root in roots {
        tree_closure(store, root, &mut seen, &mut out)?;
    }
    Ok(out)
}

/// Append `tree_id` and everything beneath it. A missing tree is recorded
/// (the pack writer skips absent ids) but not descended into.
fn tree_closure(
    store: &dyn ObjectStore,
    tree_id: &ObjectId,
    seen: &mut HashSet<ObjectId>,
    out: &mut Vec<ObjectId>,
) -> DagResult<()> {
    if !seen.insert(*tree_id) {
        return Ok(());
    }
    out.push(*tree_id);

    let tree = match Tree::read_from(store, tree_id) {
        Ok(tree) => tree,
        Err(e) if e.is_not_found() => {
            debug!(tree = %tree_id.short_hex(), "tree missing, not descending");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    for entry in &tree.entries {
        if entry.mode.is_dir() {
            tree_closure(store, &entry.object_id, seen, out)?;
        } else if seen.insert(entry.object_id) {
            out.push(entry.object_id);
        }
    }
    Ok(())
}
