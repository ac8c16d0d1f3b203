//! History entries: the canonical source of truth of a game.

use chrono::{DateTime, Utc};
use grimoire_core::ids::{EffectId, RoleId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::changes::StateDelta;
use super::message::Message;
use super::state::{Alignment, GameState};

/// Why a player is being killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillCause {
    /// The demon's nightly kill.
    Demon,
    /// Any other character ability.
    Ability,
    /// Executed after a successful vote.
    Execution,
    /// Entered directly by the narrator.
    Narrator,
}

/// What happened to a night action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionResult {
    /// The action took effect.
    Succeeded,
    /// An effect stopped the action.
    Prevented,
    /// An effect moved the action elsewhere.
    Redirected,
    /// The acting player's ability was not working.
    Malfunctioned,
    /// The narrator passed over the player's turn.
    Skipped,
}

/// What a narrator changed by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NarratorActionKind {
    /// An effect was placed on a player.
    AddEffect {
        /// The affected player.
        player_id: Uuid,
        /// The effect placed.
        effect_type: EffectId,
    },
    /// An effect was taken off a player.
    RemoveEffect {
        /// The affected player.
        player_id: Uuid,
        /// The effect removed.
        effect_type: EffectId,
    },
    /// A player's role was replaced.
    ChangeRole {
        /// The affected player.
        player_id: Uuid,
        /// The new role.
        role_id: RoleId,
    },
    /// The narrator killed a player outside any ability.
    Kill {
        /// The affected player.
        player_id: Uuid,
    },
    /// A dead player was brought back.
    Revive {
        /// The affected player.
        player_id: Uuid,
    },
}

/// Typed payload of a history entry. The variant is the entry's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EntryPayload {
    /// Seats were filled and roles dealt.
    GameStarted {
        /// Number of seated players.
        player_count: usize,
    },
    /// A night began.
    NightStarted {
        /// The round of the new night.
        round: u32,
    },
    /// A day began.
    DayStarted {
        /// The round of the new day.
        round: u32,
    },
    /// A night ability resolved.
    NightAction {
        /// The player whose ability or effect produced the entry.
        actor_id: Option<Uuid>,
        /// The player the action was aimed at.
        target_id: Option<Uuid>,
        /// How the action resolved.
        result: ActionResult,
    },
    /// A player died.
    Death {
        /// The player who died.
        player_id: Uuid,
        /// What killed them.
        cause: KillCause,
    },
    /// A nomination was accepted and voting opened.
    Nomination {
        /// The nominating player.
        nominator_id: Uuid,
        /// The nominated player.
        nominee_id: Uuid,
    },
    /// Ballots were counted.
    VoteTallied {
        /// The nominee being voted on.
        nominee_id: Uuid,
        /// Players who voted in favour.
        voters: Vec<Uuid>,
        /// Votes needed for execution.
        threshold: usize,
        /// True if the threshold was reached.
        passed: bool,
    },
    /// A player was executed.
    Execution {
        /// The executed player.
        player_id: Uuid,
    },
    /// A player's role changed as the result of an ability.
    RoleChanged {
        /// The affected player.
        player_id: Uuid,
        /// The role before the change.
        from: RoleId,
        /// The role after the change.
        to: RoleId,
    },
    /// The narrator changed the grimoire by hand.
    NarratorAction(NarratorActionKind),
    /// State changed without a more specific entry.
    StateAdjusted,
    /// A side won.
    GameEnded {
        /// The winning side.
        winner: Alignment,
    },
}

impl EntryPayload {
    /// Returns the entry type name.
    #[must_use]
    pub fn entry_type(&self) -> &'static str {
        match self {
            Self::GameStarted { .. } => "game_started",
            Self::NightStarted { .. } => "night_started",
            Self::DayStarted { .. } => "day_started",
            Self::NightAction { .. } => "night_action",
            Self::Death { .. } => "death",
            Self::Nomination { .. } => "nomination",
            Self::VoteTallied { .. } => "vote_tallied",
            Self::Execution { .. } => "execution",
            Self::RoleChanged { .. } => "role_changed",
            Self::NarratorAction(_) => "narrator_action",
            Self::StateAdjusted => "state_adjusted",
            Self::GameEnded { .. } => "game_ended",
        }
    }
}

/// An entry that has not been appended yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    /// Typed payload.
    pub data: EntryPayload,
    /// Message for the operator.
    pub message: Message,
}

impl EntryDraft {
    /// Creates a draft.
    #[must_use]
    pub fn new(data: EntryPayload, message: Message) -> Self {
        Self { data, message }
    }
}

/// An appended, immutable history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
    /// Message for the operator.
    pub message: Message,
    /// Typed payload.
    pub data: EntryPayload,
    /// The state change this entry applied.
    #[serde(default, skip_serializing_if = "StateDelta::is_empty")]
    pub delta: StateDelta,
    /// Snapshot of the game after this entry.
    pub state_after: GameState,
}

impl HistoryEntry {
    /// Returns the entry type name.
    #[must_use]
    pub fn entry_type(&self) -> &'static str {
        self.data.entry_type()
    }
}
