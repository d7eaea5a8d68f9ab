use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("version mismatch: local {local}, remote {remote}")]
    VersionMismatch { local: u8, remote: u8 },

    #[error("unknown command: {0}")]
    UnknownCommand(u8),

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
