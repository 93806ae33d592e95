use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("NO_PROJECT: {0}")]
    NoProject(String),
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),
    #[error("CREATE_FAILED: {0}")]
    CreateFailed(String),
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
