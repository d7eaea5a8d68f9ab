use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid remote {0:?}: expected host or host:port")]
    InvalidRemote(String),

    #[error("cannot connect to {remote}: {source}")]
    Connect {
        remote: String,
        #[source]
        source: std::io::Error,
    },

    #[error("local branch {0} has no commits")]
    UnknownBranch(String),

    #[error("branch {branch} not found on {remote}")]
    RemoteBranchNotFound { remote: String, branch: String },

    #[error("remote sent a pack whose first object is not a commit")]
    NotACommit,

    #[error("{remote} closed the connection without confirming the push")]
    NoAcknowledgement { remote: String },

    #[error("{remote} rejected the push: {reason}")]
    Rejected { remote: String, reason: String },

    #[error("reply from {remote} exceeds {limit} bytes")]
    ReplyTooLarge { remote: String, limit: u64 },

    #[error("protocol error: {0}")]
    Protocol(#[from] fit_protocol::ProtocolError),

    #[error("pack error: {0}")]
    Pack(#[from] fit_pack::PackError),

    #[error("graph error: {0}")]
    Dag(#[from] fit_dag::DagError),

    #[error("store error: {0}")]
    Store(#[from] fit_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] fit_refs::RefError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
