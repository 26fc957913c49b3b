use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid launcher configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http client error: {0}")]
    Http(String),
}
