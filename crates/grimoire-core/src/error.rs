//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::ids::RoleId;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No history exists for the requested game.
    #[error("game not found: {0}")]
    GameNotFound(Uuid),

    /// Optimistic concurrency conflict while appending to a game log.
    #[error("concurrency conflict on game {game_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The game that had the conflict.
        game_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// The operator asked for something the rules do not allow right now.
    #[error("validation error: {0}")]
    Validation(String),

    /// A log entry would produce (or a stored log contains) an impossible
    /// state. Always a programming error.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The operator's answer to a pending prompt is no longer valid. The
    /// pending resolution is untouched and may be resumed again.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// A player holds a role missing from the catalog.
    #[error("unknown role: {0}")]
    UnknownRole(RoleId),

    /// A persistence or (de)serialization error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
