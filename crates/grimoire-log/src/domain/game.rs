//! The game aggregate: an append-only history and its projection.

use grimoire_core::clock::Clock;
use grimoire_core::error::DomainError;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use super::changes::{StateChanges, StateDelta};
use super::history::{EntryDraft, EntryPayload, HistoryEntry};
use super::message::Message;
use super::state::GameState;

/// A game: its identifier and its history.
///
/// Games are values. [`Game::append`] returns a new game and never touches
/// the entries of the original one.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    id: Uuid,
    history: Vec<HistoryEntry>,
    state: GameState,
}

impl Game {
    /// Creates a game with an empty log.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            history: Vec::new(),
            state: GameState::initial(),
        }
    }

    /// Rebuilds a game from a stored history, checking every snapshot
    /// against the replayed fold.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvariantViolation` if an entry's delta cannot be
    /// applied or its stored `state_after` differs from the replayed state.
    pub fn replay(id: Uuid, history: Vec<HistoryEntry>) -> Result<Self, DomainError> {
        let state = fold_history(&history)?;
        Ok(Self { id, history, state })
    }

    /// Game identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The full history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Number of entries in the log.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn version(&self) -> i64 {
        self.history.len() as i64
    }

    /// The current state: the last entry's snapshot, or the initial state.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Owned copy of the current state.
    #[must_use]
    pub fn project_state(&self) -> GameState {
        self.history
            .last()
            .map_or_else(GameState::initial, |entry| entry.state_after.clone())
    }

    /// Entries appended after the most recent entry of the given type, or the
    /// whole history if there is none.
    #[must_use]
    pub fn entries_since(&self, entry_type: &str) -> &[HistoryEntry] {
        let start = self
            .history
            .iter()
            .rposition(|e| e.entry_type() == entry_type)
            .map_or(0, |i| i + 1);
        &self.history[start..]
    }

    /// Appends entries, recording `delta` on the first one and stamping every
    /// entry with the resulting state.
    ///
    /// With no drafts, a non-empty delta is recorded on a synthesized
    /// `state_adjusted` entry and an empty delta is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvariantViolation` if the delta cannot be
    /// applied to the current state. The game is left unchanged.
    pub fn append(
        &self,
        drafts: Vec<EntryDraft>,
        delta: StateDelta,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let drafts = if drafts.is_empty() {
            if delta.is_empty() {
                return Ok(self.clone());
            }
            vec![EntryDraft::new(
                EntryPayload::StateAdjusted,
                Message::key("log.state_adjusted"),
            )]
        } else {
            drafts
        };

        let state_after = delta.apply(&self.state)?;
        let timestamp = clock.now();
        let mut delta = Some(delta);

        let mut history = self.history.clone();
        for draft in drafts {
            history.push(HistoryEntry {
                id: Uuid::new_v4(),
                timestamp,
                message: draft.message,
                data: draft.data,
                delta: delta.take().unwrap_or_default(),
                state_after: state_after.clone(),
            });
        }

        debug!(
            game_id = %self.id,
            appended = history.len() - self.history.len(),
            phase = %state_after.phase,
            round = state_after.round,
            "appended history entries"
        );

        Ok(Self {
            id: self.id,
            history,
            state: state_after,
        })
    }

    /// Commits a resolved batch atomically.
    ///
    /// # Errors
    ///
    /// See [`Game::append`].
    pub fn commit(&self, changes: StateChanges, clock: &dyn Clock) -> Result<Self, DomainError> {
        let (drafts, delta) = changes.into_parts();
        self.append(drafts, delta, clock)
    }

    /// Entries appended by `self` on top of `earlier`.
    #[must_use]
    pub fn appended_since<'a>(&'a self, earlier: &Game) -> &'a [HistoryEntry] {
        let start = earlier.history.len().min(self.history.len());
        &self.history[start..]
    }

    /// SHA-256 of the canonical JSON of the history, as lowercase hex.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if serialization fails.
    pub fn fingerprint(&self) -> Result<String, DomainError> {
        let bytes = serde_json::to_vec(&self.history)
            .map_err(|e| DomainError::Infrastructure(format!("history serialization failed: {e}")))?;
        let digest = Sha256::digest(&bytes);
        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }
}

/// Replays a history from the initial state.
///
/// # Errors
///
/// Returns `DomainError::InvariantViolation` if any entry's delta cannot be
/// applied, or if a stored snapshot differs from the replayed state.
pub fn fold_history(history: &[HistoryEntry]) -> Result<GameState, DomainError> {
    let mut state = GameState::initial();
    for (index, entry) in history.iter().enumerate() {
        let next = entry.delta.apply(&state)?;
        if next != entry.state_after {
            return Err(DomainError::InvariantViolation(format!(
                "replay diverged at entry {index} ({})",
                entry.entry_type()
            )));
        }
        state = next;
    }
    Ok(state)
}
