use service_core::error::AppError;
use thiserror::Error;

/// Failure of a public data operation.
///
/// Carries only the operation's message; the underlying store error is
/// logged where it happens and never travels past the executor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("{0}")]
    DataAccess(&'static str),
}

impl DataError {
    pub fn message(&self) -> &'static str {
        match self {
            DataError::DataAccess(message) => message,
        }
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        AppError::DatabaseError(anyhow::anyhow!(err.message()))
    }
}
