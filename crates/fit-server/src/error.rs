use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("protocol error: {0}")]
    Protocol(#[from] fit_protocol::ProtocolError),

    #[error("store error: {0}")]
    Store(#[from] fit_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] fit_refs::RefError),

    #[error("pack error: {0}")]
    Pack(#[from] fit_pack::PackError),

    #[error("graph error: {0}")]
    Dag(#[from] fit_dag::DagError),

    #[error("push rejected: {0}")]
    Rejected(String),

    #[error("pack exceeds {limit} bytes")]
    PackTooLarge { limit: u64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
