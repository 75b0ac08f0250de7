use thiserror::Error;

pub type QetagResult<T> = Result<T, QetagError>;

#[derive(Debug, Error)]
pub enum QetagError {
    #[error("block hash error: {0}")]
    Hash(String),

    #[error("invalid etag: {0}")]
    InvalidEtag(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
