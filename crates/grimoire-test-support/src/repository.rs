//! Test repositories: `GameRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use grimoire_core::error::DomainError;
use grimoire_core::repository::{GameRepository, StoredEntry};
use uuid::Uuid;

/// Records every `append_entries` call. `load_entries` returns the configured
/// entries that belong to the requested game.
#[derive(Debug)]
pub struct RecordingGameRepository {
    load_result: Mutex<Vec<StoredEntry>>,
    appended: Mutex<Vec<(Uuid, i64, Vec<StoredEntry>)>>,
}

impl RecordingGameRepository {
    /// Create a recording repository that returns `load_result` from every
    /// `load_entries` call.
    #[must_use]
    pub fn new(load_result: Vec<StoredEntry>) -> Self {
        Self {
            load_result: Mutex::new(load_result),
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all appended batches.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_entries(&self) -> Vec<(Uuid, i64, Vec<StoredEntry>)> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl GameRepository for RecordingGameRepository {
    async fn load_entries(&self, game_id: Uuid) -> Result<Vec<StoredEntry>, DomainError> {
        Ok(self
            .load_result
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn append_entries(
        &self,
        game_id: Uuid,
        expected_version: i64,
        entries: &[StoredEntry],
    ) -> Result<(), DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((game_id, expected_version, entries.to_vec()));
        Ok(())
    }
}

/// Knows no games: every log loads empty and appends are dropped.
#[derive(Debug)]
pub struct EmptyGameRepository;

#[async_trait]
impl GameRepository for EmptyGameRepository {
    async fn load_entries(&self, _game_id: Uuid) -> Result<Vec<StoredEntry>, DomainError> {
        Ok(vec![])
    }

    async fn append_entries(
        &self,
        _game_id: Uuid,
        _expected_version: i64,
        _entries: &[StoredEntry],
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

/// A game log store that cannot be reached.
#[derive(Debug)]
pub struct FailingGameRepository;

#[async_trait]
impl GameRepository for FailingGameRepository {
    async fn load_entries(&self, _game_id: Uuid) -> Result<Vec<StoredEntry>, DomainError> {
        Err(DomainError::Infrastructure("game log store unavailable".into()))
    }

    async fn append_entries(
        &self,
        _game_id: Uuid,
        _expected_version: i64,
        _entries: &[StoredEntry],
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("game log store unavailable".into()))
    }
}

/// Keeps game logs in memory and checks appends the way a game log store
/// must.
///
/// A batch is accepted only if `expected_version` is the sequence number of
/// the log's last entry (the version the command loaded) and the batch
/// continues the log: every entry belongs to the game and numbers follow on
/// from `expected_version` without gaps.
#[derive(Debug, Default)]
pub struct InMemoryGameRepository {
    logs: Mutex<HashMap<Uuid, Vec<StoredEntry>>>,
}

impl InMemoryGameRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current version of a game's log: its last sequence number, or 0.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn version(&self, game_id: Uuid) -> i64 {
        self.logs
            .lock()
            .unwrap()
            .get(&game_id)
            .and_then(|log| log.last())
            .map_or(0, |entry| entry.sequence_number)
    }
}

fn check_continuation(
    game_id: Uuid,
    expected_version: i64,
    entries: &[StoredEntry],
) -> Result<(), DomainError> {
    for (next, entry) in (expected_version + 1..).zip(entries) {
        if entry.game_id != game_id {
            return Err(DomainError::InvariantViolation(format!(
                "entry {} belongs to game {}, not {game_id}",
                entry.entry_id, entry.game_id
            )));
        }
        if entry.sequence_number != next {
            return Err(DomainError::InvariantViolation(format!(
                "entry {} is numbered {} but continues the log at {next}",
                entry.entry_id, entry.sequence_number
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn load_entries(&self, game_id: Uuid) -> Result<Vec<StoredEntry>, DomainError> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .get(&game_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_entries(
        &self,
        game_id: Uuid,
        expected_version: i64,
        entries: &[StoredEntry],
    ) -> Result<(), DomainError> {
        let mut logs = self.logs.lock().unwrap();
        let log = logs.entry(game_id).or_default();
        let actual = log.last().map_or(0, |entry| entry.sequence_number);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                game_id,
                expected: expected_version,
                actual,
            });
        }
        check_continuation(game_id, expected_version, entries)?;
        log.extend_from_slice(entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn entry(game_id: Uuid, sequence_number: i64) -> StoredEntry {
        StoredEntry {
            entry_id: Uuid::new_v4(),
            game_id,
            entry_type: "state_adjusted".to_owned(),
            payload: serde_json::json!({ "type": "state_adjusted" }),
            sequence_number,
            correlation_id: Uuid::new_v4(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_append_from_stale_version_conflicts() {
        // Arrange
        let repo = InMemoryGameRepository::new();
        let game_id = Uuid::new_v4();
        repo.append_entries(game_id, 0, &[entry(game_id, 1), entry(game_id, 2)])
            .await
            .unwrap();
        repo.append_entries(game_id, 2, &[entry(game_id, 3)])
            .await
            .unwrap();

        // Act
        let result = repo.append_entries(game_id, 2, &[entry(game_id, 3)]).await;

        // Assert
        assert!(matches!(
            result,
            Err(DomainError::ConcurrencyConflict { expected: 2, actual: 3, .. })
        ));
        assert_eq!(repo.version(game_id), 3);
    }

    #[tokio::test]
    async fn test_batch_must_continue_the_log() {
        let repo = InMemoryGameRepository::new();
        let game_id = Uuid::new_v4();

        let gap = repo.append_entries(game_id, 0, &[entry(game_id, 2)]).await;
        let foreign = repo
            .append_entries(game_id, 0, &[entry(Uuid::new_v4(), 1)])
            .await;

        assert!(matches!(gap, Err(DomainError::InvariantViolation(msg)) if msg.contains("continues the log at 1")));
        assert!(matches!(foreign, Err(DomainError::InvariantViolation(_))));
        assert!(repo.load_entries(game_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_games_keep_separate_logs() {
        let repo = InMemoryGameRepository::new();
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

        repo.append_entries(first, 0, &[entry(first, 1)]).await.unwrap();
        repo.append_entries(second, 0, &[entry(second, 1)]).await.unwrap();

        let loaded = repo.load_entries(first).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].game_id, first);
        assert_eq!(repo.version(second), 1);
        assert_eq!(repo.version(Uuid::new_v4()), 0);
    }
}
