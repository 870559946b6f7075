//! Error types for rule registration, validation and orchestration.

use thiserror::Error;

/// Errors that can occur while building the registry or running the engine.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The whole configuration failed structural or schema validation.
    #[error("invalid rule configuration: {}", .0.join("; "))]
    InvalidConfiguration(Vec<String>),

    /// A rule was registered under a malformed name (registry construction).
    #[error("invalid rule name '{0}'")]
    InvalidRuleName(String),

    /// Two rules were registered under the same name (registry construction).
    #[error("duplicate rule name '{0}'")]
    DuplicateRuleName(String),

    /// A single rule failed while initializing or updating its state.
    #[error("rule '{rule}' processing failed: {message}")]
    Processing { rule: String, message: String },

    /// Query execution or state persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] mapwatch_storage::StorageError),
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;
