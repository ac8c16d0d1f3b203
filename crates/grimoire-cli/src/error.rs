//! Grimoire replay tool: error types.

use grimoire_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors for the replay tool.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required setting is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The log file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The log file is not a JSON list of entries.
    #[error("malformed log: {0}")]
    Json(#[from] serde_json::Error),

    /// The entries do not replay.
    #[error("replay failed: {0}")]
    Domain(#[from] DomainError),
}
