use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Json conversion(Serde) error: {0}")]
    Serde(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cookie error: {0}")]
    Cookie(String),
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Config(msg) => Self::Config(msg),
            StorageError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}
