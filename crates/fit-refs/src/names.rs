//! Branch name validation following git-style conventions.
//!
//! Branch names become paths under `refs/heads/`, so they are checked before
//! any path is formed. Valid branch names:
//! - Must be non-empty and at most [`MAX_BRANCH_NAME_LEN`] bytes
//! - Must not contain whitespace, control characters, `~`, `^`, `:`, `?`,
//!   `*`, `[`, `\`
//! - Must not contain `..` or `@{`
//! - Must not start or end with `.` or `/`
//! - Must not end with `.lock`
//! - Components between slashes must be non-empty and not start with `.`

use crate::error::{RefError, Result};

/// Longest branch name accepted, in bytes. Matches the network limit.
pub const MAX_BRANCH_NAME_LEN: usize = 255;

/// Characters that are forbidden anywhere in a branch name.
const FORBIDDEN_CHARS: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidBranchName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a branch name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use fit_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature/auth").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("../escape").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "branch name must not be empty"));
    }
    if name.len() > MAX_BRANCH_NAME_LEN {
        return Err(invalid(
            name,
            format!("longer than {MAX_BRANCH_NAME_LEN} bytes"),
        ));
    }

    if let Some(ch) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }

    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err(invalid(name, "must not start or end with '.'"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid(name, "must not start or end with '/'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }

    Ok(())
}
