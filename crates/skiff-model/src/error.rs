use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown log level: {0}")]
    UnknownLogLevel(String),

    #[error("invalid run id: {0}")]
    InvalidRunId(String),

    #[error("incompatible runtime descriptor: format '{format}' version {version}")]
    IncompatibleDescriptor { format: String, version: u32 },

    #[error("malformed runtime descriptor: {0}")]
    MalformedDescriptor(#[from] serde_json::Error),

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
