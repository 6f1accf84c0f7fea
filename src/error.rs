use thiserror::Error;

/// Failures at I/O boundaries. Store reducers never produce these: a missing
/// tab or group is a no-op, not an error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("codec: {0}")]
    Codec(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser: {0}")]
    Browser(String),

    #[error("native port closed")]
    PortClosed,
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Codec(format!("json: {}", e))
    }
}

impl From<lz4_flex::block::DecompressError> for Error {
    fn from(e: lz4_flex::block::DecompressError) -> Self {
        Error::Codec(format!("lz4 decompress: {}", e))
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Codec(format!("base64: {}", e))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
