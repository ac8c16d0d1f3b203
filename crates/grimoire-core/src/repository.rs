//! Game log repository abstraction.
//!
//! The persistence layer stores each game's history verbatim. Correctness of
//! replay depends on entries round-tripping to structurally equal values.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of one history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Unique entry identifier.
    pub entry_id: Uuid,
    /// Game this entry belongs to.
    pub game_id: Uuid,
    /// Entry type name (`night_action`, `death`, ...).
    pub entry_type: String,
    /// The serialized history entry.
    pub payload: serde_json::Value,
    /// Position within the game log, starting at 1.
    pub sequence_number: i64,
    /// Correlation ID of the command that appended the entry.
    pub correlation_id: Uuid,
    /// Timestamp of the entry.
    pub occurred_at: DateTime<Utc>,
}

/// Repository trait for loading and appending game logs.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Load all entries for a game, ordered by sequence number.
    async fn load_entries(&self, game_id: Uuid) -> Result<Vec<StoredEntry>, DomainError>;

    /// Append new entries to a game log with optimistic concurrency.
    /// `expected_version` is the number of entries the caller loaded.
    async fn append_entries(
        &self,
        game_id: Uuid,
        expected_version: i64,
        entries: &[StoredEntry],
    ) -> Result<(), DomainError>;
}
