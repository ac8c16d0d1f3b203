//! Stored form of history entries.
//!
//! The persistence layer keeps each entry as JSON next to a few indexed
//! columns. Reconstitution deserializes the entries and replays them, so a
//! stored log that no longer folds to its own snapshots is rejected.

use grimoire_core::error::DomainError;
use grimoire_core::repository::StoredEntry;
use uuid::Uuid;

use crate::domain::game::Game;
use crate::domain::history::HistoryEntry;

/// Converts the entries appended on top of `base_version` into stored form.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if an entry cannot be serialized.
#[allow(clippy::cast_possible_wrap)]
pub fn to_stored_entries(
    game_id: Uuid,
    base_version: i64,
    entries: &[HistoryEntry],
    correlation_id: Uuid,
) -> Result<Vec<StoredEntry>, DomainError> {
    entries
        .iter()
        .enumerate()
        .map(|(offset, entry)| {
            let payload = serde_json::to_value(entry).map_err(|e| {
                DomainError::Infrastructure(format!("entry serialization failed: {e}"))
            })?;
            Ok(StoredEntry {
                entry_id: entry.id,
                game_id,
                entry_type: entry.entry_type().to_owned(),
                payload,
                sequence_number: base_version + offset as i64 + 1,
                correlation_id,
                occurred_at: entry.timestamp,
            })
        })
        .collect()
}

/// Reconstitutes a `Game` from stored entries.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if an entry cannot be deserialized
/// or the entries are out of sequence, and `DomainError::InvariantViolation`
/// if replay diverges from the stored snapshots.
pub fn reconstitute(game_id: Uuid, stored: &[StoredEntry]) -> Result<Game, DomainError> {
    let mut history = Vec::with_capacity(stored.len());
    for (index, entry) in stored.iter().enumerate() {
        #[allow(clippy::cast_possible_wrap)]
        let expected = index as i64 + 1;
        if entry.sequence_number != expected {
            return Err(DomainError::Infrastructure(format!(
                "entry {} has sequence number {}, expected {expected}",
                entry.entry_id, entry.sequence_number
            )));
        }
        let decoded: HistoryEntry = serde_json::from_value(entry.payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("entry deserialization failed: {e}"))
        })?;
        history.push(decoded);
    }
    Game::replay(game_id, history)
}
