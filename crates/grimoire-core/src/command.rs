//! Command abstractions.

use uuid::Uuid;

/// Trait implemented by every operator command sent to a game.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging).
    fn command_type(&self) -> &'static str;

    /// The game this command targets.
    fn game_id(&self) -> Uuid;

    /// Correlation ID to trace this command through the log.
    fn correlation_id(&self) -> Uuid;
}
