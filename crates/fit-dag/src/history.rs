//! Walking the parent chain of a commit.

use fit_store::{Commit, ObjectStore};
use fit_types::ObjectId;
use tracing::{debug, warn};

use crate::error::DagResult;

/// Longest chain a transfer walks. Older history is silently left behind.
pub const MAX_CHAIN_LENGTH: usize = 256;

/// One commit visited by [`walk_chain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainEntry {
    pub id: ObjectId,
    pub commit: Commit,
}

/// Follow `parent` links from `start`, newest first, visiting at most `limit`
/// commits.
///
/// The walk stops at a root commit, at the limit, or at a commit missing
/// from the store. A null `start` yields an empty chain.
pub fn walk_chain(
    store: &dyn ObjectStore,
    start: &ObjectId,
    limit: usize,
) -> DagResult<Vec<ChainEntry>> {
    let mut chain = Vec::new();
    let mut next = *start;
    while !next.is_null() {
        if chain.len() == limit {
            debug!(limit, "commit chain truncated");
            break;
        }
        let commit = match Commit::read_from(store, &next) {
            Ok(commit) => commit,
            Err(e) if e.is_not_found() => {
                warn!(id = %next.short_hex(), "commit missing, chain ends here");
                break;
            }
            Err(e) => return Err(e.into()),
        };
        let parent = commit.parent;
        chain.push(ChainEntry { id: next, commit });
        next = parent;
    }
    Ok(chain)
}
