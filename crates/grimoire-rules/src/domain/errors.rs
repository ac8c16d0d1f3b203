//! Errors raised by content-authored functions.

use grimoire_core::ids::EffectId;
use thiserror::Error;
use uuid::Uuid;

/// An error returned by a handler, modifier, predicate or ability.
///
/// Apart from [`ContentError::InvalidSelection`], these are authoring bugs:
/// the engine logs them and carries on with a safe default.
#[derive(Debug, Error)]
pub enum ContentError {
    /// An effect instance's data is missing a key or has the wrong shape.
    #[error("effect {effect} has malformed data: {reason}")]
    MalformedData {
        /// The effect whose data was read.
        effect: EffectId,
        /// What was wrong.
        reason: String,
    },

    /// A content function referenced a player that is not seated.
    #[error("player {0} is not seated")]
    UnknownPlayer(Uuid),

    /// The operator's answer cannot be used. Recoverable: the operator may
    /// answer again.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// The function was called with an intent it does not handle.
    #[error("unsupported intent: {0}")]
    Unsupported(String),
}
