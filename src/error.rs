/// Error types for hiproc
///
/// This module defines all possible errors that can occur in the application.
/// Uses thiserror for ergonomic error handling.
///
/// A lookup that finds nothing is not an error here. Store operations return
/// `Option` for that case so callers can tell "absent or not yours" apart
/// from a genuine failure.

use thiserror::Error;

/// Main error type for hiproc operations
#[derive(Error, Debug)]
pub enum RecallError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid command format or content
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Command exceeds maximum length
    #[error("Command exceeds maximum allowed length of {0} characters")]
    CommandTooLong(usize),
}

/// Result type alias for hiproc operations
pub type Result<T> = std::result::Result<T, RecallError>;

/// Convert RecallError to a user-friendly error message
impl RecallError {
    pub fn user_message(&self) -> String {
        match self {
            RecallError::Database(e) => {
                format!("Database error occurred. Please try again. Details: {}", e)
            }
            RecallError::Io(e) => {
                format!("File system error. Check permissions. Details: {}", e)
            }
            RecallError::InvalidCommand(reason) => {
                format!("Invalid command: {}", reason)
            }
            RecallError::Config(msg) => {
                format!("Configuration issue: {}", msg)
            }
            RecallError::Serialization(e) => {
                format!("Data format error: {}", e)
            }
            RecallError::CommandTooLong(max) => {
                format!("Command exceeds maximum length of {} characters", max)
            }
        }
    }
}
