use thiserror::Error;

use super::types::{Domain, Guid};

#[derive(Error, Debug)]
pub enum SphynxError {
    #[error("Can't compute '{operation}' in {domain}")]
    OperationNotSupported { domain: Domain, operation: String },

    #[error("Input '{name}' (guid: {guid}) not found among entities")]
    InputNotFound { name: String, guid: Guid },

    #[error("Guid {0} is not found")]
    NotFound(Guid),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid guid: {0}")]
    InvalidGuid(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, SphynxError>;

impl<T> From<std::sync::PoisonError<T>> for SphynxError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SphynxError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Execution(format!("worker task failed: {}", err))
    }
}
