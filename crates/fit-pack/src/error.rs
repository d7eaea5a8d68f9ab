use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid pack magic: expected FPAK, got {actual:?}")]
    InvalidMagic { actual: [u8; 4] },

    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    #[error("bad pack: {0}")]
    BadPack(String),

    #[error("store error: {0}")]
    Store(#[from] fit_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackError {
    pub(crate) fn bad(reason: impl Into<String>) -> Self {
        Self::BadPack(reason.into())
    }
}

pub type PackResult<T> = Result<T, PackError>;
