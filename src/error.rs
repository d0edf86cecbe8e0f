//! Error types for forum operations.

use thiserror::Error;

/// Result type alias for forum operations.
pub type Result<T> = std::result::Result<T, ForumError>;

/// Main error type for forum operations.
///
/// Empty results are never errors: list, page, search and relevance calls
/// return zeroed structures when nothing matches. Only direct lookups report
/// [`ForumError::NotFound`].
#[derive(Error, Debug)]
pub enum ForumError {
    /// A direct lookup found no row
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored value could not be parsed as its record shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// A record could not be encoded for storage
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Storage engine failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForumError {
    /// Creates a new not-found error.
    pub fn not_found<T: ToString>(msg: T) -> Self {
        Self::NotFound(msg.to_string())
    }

    /// Creates a new decode error.
    pub fn decode<T: ToString>(msg: T) -> Self {
        Self::Decode(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new storage error.
    pub fn storage<T: ToString>(msg: T) -> Self {
        Self::Storage(msg.to_string())
    }

    /// Creates a new invalid input error.
    pub fn invalid_input<T: ToString>(msg: T) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    /// Creates a new configuration error.
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Returns true if this error is a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for ForumError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
