//! Error types for the ep-app service layer.

use std::path::PathBuf;

use ep_core::EditError;

/// Application error type shared by every service and frontend.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read document: {path}")]
    DocumentRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write document: {path}")]
    DocumentWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Edit failed: {0}")]
    Edit(#[from] EditError),

    #[error("An engine run is already in progress")]
    AlreadyRunning,

    #[error("Engine error: {0}")]
    Engine(String),
}

/// Result type for ep-app operations.
pub type AppResult<T> = Result<T, AppError>;
