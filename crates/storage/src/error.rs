use thiserror::Error;

use mapwatch_core::ObserverId;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("observer not found: {0}")]
    ObserverNotFound(ObserverId),

    #[error("unbound query parameter: {0}")]
    UnboundParameter(String),

    #[error("query parameter '{name}' is not {expected}")]
    BadParameter { name: String, expected: &'static str },

    #[error("commit failed: {0}")]
    Commit(String),

    #[error("{0}")]
    Other(String),
}

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
