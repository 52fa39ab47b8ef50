use thiserror::Error;

pub type NurtureResult<T> = Result<T, NurtureError>;

#[derive(Error, Debug)]
pub enum NurtureError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sequence not found: {0}")]
    SequenceNotFound(String),

    #[error("Sequence is not active: {0}")]
    SequenceInactive(String),

    #[error("Enrollment not found: {0}")]
    EnrollmentNotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
