//! Error types for the yearboard core
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to a UI shell as message strings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller-side precondition failed. Rejected before any backend call.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    /// The backend lacks an optional column. The note store recovers by
    /// retrying the same logical write with the unsupported fields omitted.
    #[error("Backend schema is missing column: {column}")]
    SchemaMismatch { column: String },

    /// Any other rejected backend write, surfaced with a code/message pair
    /// so the UI can show diagnostics.
    #[error("Backend error ({code}): {message}")]
    Backend { code: String, message: String },

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
