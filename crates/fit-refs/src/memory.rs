//! In-memory reference store for testing and ephemeral use.

use std::collections::BTreeMap;
use std::sync::RwLock;

use fit_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::validate_branch_name;
use crate::traits::RefStore;
use crate::types::{Head, Ref};

/// An in-memory implementation of [`RefStore`].
///
/// Branches live in a `BTreeMap` behind a `RwLock`, so listing is naturally
/// sorted. Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, ObjectId>>,
    head: RwLock<Option<Head>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, branch: &str) -> Result<Option<ObjectId>> {
        validate_branch_name(branch)?;
        let refs = self.refs.read().map_err(|_| RefError::Poisoned)?;
        Ok(refs.get(branch).copied())
    }

    fn write_ref(&self, branch: &str, target: &ObjectId) -> Result<()> {
        validate_branch_name(branch)?;
        let mut refs = self.refs.write().map_err(|_| RefError::Poisoned)?;
        refs.insert(branch.to_string(), *target);
        Ok(())
    }

    fn delete_ref(&self, branch: &str) -> Result<bool> {
        validate_branch_name(branch)?;
        if self.current_branch()?.as_deref() == Some(branch) {
            return Err(RefError::DeleteCurrentBranch {
                name: branch.to_string(),
            });
        }
        let mut refs = self.refs.write().map_err(|_| RefError::Poisoned)?;
        Ok(refs.remove(branch).is_some())
    }

    fn list_refs(&self) -> Result<Vec<Ref>> {
        let refs = self.refs.read().map_err(|_| RefError::Poisoned)?;
        Ok(refs
            .iter()
            .map(|(name, target)| Ref::new(name.clone(), *target))
            .collect())
    }

    fn head(&self) -> Result<Option<Head>> {
        let head = self.head.read().map_err(|_| RefError::Poisoned)?;
        Ok(head.clone())
    }

    fn set_head(&self, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        let mut head = self.head.write().map_err(|_| RefError::Poisoned)?;
        *head = Some(Head::Symbolic(branch.to_string()));
        Ok(())
    }

    fn set_head_detached(&self, target: &ObjectId) -> Result<()> {
        let mut head = self.head.write().map_err(|_| RefError::Poisoned)?;
        *head = Some(Head::Detached(*target));
        Ok(())
    }
}
