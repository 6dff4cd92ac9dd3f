use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a flow log: bad magic bytes")]
    BadMagic,
    #[error("unsupported flow log version {0}")]
    UnsupportedVersion(u8),
    #[error("failed to encode record: {0}")]
    Encode(String),
}
