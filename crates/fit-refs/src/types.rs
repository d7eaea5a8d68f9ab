//! Core reference types.

use fit_types::ObjectId;

/// Namespace holding branch refs.
pub const HEADS_PREFIX: &str = "refs/heads/";

/// A branch: a name and the commit it points to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ref {
    /// Branch name (e.g. "main", "feature/auth").
    pub name: String,
    /// Commit at the tip of the branch.
    pub target: ObjectId,
}

impl Ref {
    pub fn new(name: impl Into<String>, target: ObjectId) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }

    /// Returns the canonical name for this ref (e.g. "refs/heads/main").
    pub fn canonical_name(&self) -> String {
        format!("{HEADS_PREFIX}{}", self.name)
    }
}

/// The state of HEAD: either symbolic (pointing to a branch) or detached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Head {
    /// HEAD points to a branch by name.
    Symbolic(String),
    /// HEAD is detached, pointing directly to a commit.
    Detached(ObjectId),
}

impl Head {
    /// Render the HEAD file contents.
    pub fn encode(&self) -> String {
        match self {
            Head::Symbolic(branch) => format!("ref: {HEADS_PREFIX}{branch}\n"),
            Head::Detached(id) => format!("{id}\n"),
        }
    }

    /// Parse HEAD file contents. Returns `None` if the text is neither form.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_end_matches(|c| c == '\n' || c == '\r');
        if let Some(target) = text.strip_prefix("ref: ") {
            let branch = target.strip_prefix(HEADS_PREFIX)?;
            return Some(Head::Symbolic(branch.to_string()));
        }
        ObjectId::from_hex(text).ok().map(Head::Detached)
    }

    /// Branch name when symbolic.
    pub fn branch(&self) -> Option<&str> {
        match self {
            Head::Symbolic(branch) => Some(branch),
            Head::Detached(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_text_forms() {
        let sym = Head::Symbolic("feature/x".into());
        assert_eq!(sym.encode(), "ref: refs/heads/feature/x\n");
        assert_eq!(Head::parse(&sym.encode()), Some(sym));

        let id = ObjectId::digest(b"c");
        let det = Head::Detached(id);
        assert_eq!(det.encode(), format!("{}\n", id.to_hex()));
        assert_eq!(Head::parse(&det.encode()), Some(det));
    }

    #[test]
    fn head_parse_rejects_garbage() {
        assert_eq!(Head::parse("ref: refs/tags/v1\n"), None);
        assert_eq!(Head::parse("not a hash\n"), None);
        assert_eq!(Head::parse(""), None);
    }

    #[test]
    fn canonical_name() {
        let r = Ref::new("main", ObjectId::null());
        assert_eq!(r.canonical_name(), "refs/heads/main");
    }
}
