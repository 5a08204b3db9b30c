//! Error types for the cf-app service layer.

use std::path::PathBuf;

use cf_controls::ControlError;

/// Application error type that wraps errors from the backend crates and
/// gives the CLI one error surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read plant file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write plant file: {path}")]
    ProjectFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Plant validation failed: {0}")]
    Validation(String),

    #[error("Failed to build plant: {0}")]
    Build(#[from] ControlError),

    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for cf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<cf_project::ProjectError> for AppError {
    fn from(err: cf_project::ProjectError) -> Self {
        match err {
            cf_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<cf_project::ValidationError> for AppError {
    fn from(err: cf_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}
