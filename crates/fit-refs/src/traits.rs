//! The [`RefStore`] trait defining the reference storage interface.

use fit_types::ObjectId;

use crate::error::{RefError, Result};
use crate::types::{Head, Ref};

/// Storage backend for branch refs and HEAD.
///
/// Branch arguments are short names ("main"), not canonical paths.
/// Implementations validate names before touching storage.
pub trait RefStore: Send + Sync {
    /// Read the commit a branch points to. `Ok(None)` if it does not exist.
    fn read_ref(&self, branch: &str) -> Result<Option<ObjectId>>;

    /// Create or move a branch.
    fn write_ref(&self, branch: &str, target: &ObjectId) -> Result<()>;

    /// Delete a branch. Returns `Ok(true)` if it existed.
    ///
    /// Fails with [`RefError::DeleteCurrentBranch`] for the branch HEAD names.
    fn delete_ref(&self, branch: &str) -> Result<bool>;

    /// All branches, sorted by name.
    fn list_refs(&self) -> Result<Vec<Ref>>;

    /// Read the current HEAD state. `Ok(None)` if HEAD has not been set.
    fn head(&self) -> Result<Option<Head>>;

    /// Point HEAD at a branch (symbolic). The branch need not exist yet.
    fn set_head(&self, branch: &str) -> Result<()>;

    /// Detach HEAD at a commit.
    fn set_head_detached(&self, target: &ObjectId) -> Result<()>;

    /// Follow HEAD one level to a commit id.
    fn resolve_head(&self) -> Result<ObjectId> {
        match self.head()? {
            Some(Head::Symbolic(branch)) => self.read_ref(&branch)?.ok_or(RefError::NoCommits),
            Some(Head::Detached(id)) => Ok(id),
            None => Err(RefError::NoCommits),
        }
    }

    /// Advance whatever HEAD points at to `target`.
    ///
    /// Symbolic HEAD moves its branch; detached HEAD is overwritten. An unset
    /// HEAD is treated as detached.
    fn update_head(&self, target: &ObjectId) -> Result<()> {
        match self.head()? {
            Some(Head::Symbolic(branch)) => self.write_ref(&branch, target),
            _ => self.set_head_detached(target),
        }
    }

    /// Name of the checked-out branch, `None` when detached or unset.
    fn current_branch(&self) -> Result<Option<String>> {
        Ok(match self.head()? {
            Some(Head::Symbolic(branch)) => Some(branch),
            _ => None,
        })
    }

    /// Branch names, sorted.
    fn branches(&self) -> Result<Vec<String>> {
        Ok(self.list_refs()?.into_iter().map(|r| r.name).collect())
    }
}
