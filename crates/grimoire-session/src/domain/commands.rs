//! Commands for the session context.

use grimoire_core::command::Command;
use grimoire_core::ids::{EffectId, RoleId};
use grimoire_log::domain::effects::EffectInstance;
use grimoire_rules::domain::definitions::UiAnswer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resolution::PendingAction;
use super::setup::SeatAssignment;

macro_rules! impl_command {
    ($command:ty, $type_name:literal) => {
        impl Command for $command {
            fn command_type(&self) -> &'static str {
                $type_name
            }

            fn game_id(&self) -> Uuid {
                self.game_id
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }
        }
    };
}

/// Command to seat the players of a new game.
#[derive(Debug, Clone)]
pub struct StartGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game to create.
    pub game_id: Uuid,
    /// Seats in table order.
    pub seats: Vec<SeatAssignment>,
}

impl_command!(StartGame, "session.start_game");

/// Command to begin the next night.
#[derive(Debug, Clone)]
pub struct BeginNight {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game identifier.
    pub game_id: Uuid,
}

impl_command!(BeginNight, "session.begin_night");

/// Command to end the night and start the day.
#[derive(Debug, Clone)]
pub struct EndNight {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game identifier.
    pub game_id: Uuid,
}

impl_command!(EndNight, "session.end_night");

/// Command to resolve one player's night ability.
#[derive(Debug, Clone)]
pub struct SubmitNightAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game identifier.
    pub game_id: Uuid,
    /// The woken player.
    pub actor_id: Uuid,
    /// The players the ability is used on.
    pub targets: Vec<Uuid>,
}

impl_command!(SubmitNightAction, "session.submit_night_action");

/// Command to pass over the next player due to wake.
#[derive(Debug, Clone)]
pub struct SkipWake {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game identifier.
    pub game_id: Uuid,
    /// The player whose turn is skipped.
    pub actor_id: Uuid,
}

impl_command!(SkipWake, "session.skip_wake");

/// Command to nominate a player for execution.
#[derive(Debug, Clone)]
pub struct Nominate {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game identifier.
    pub game_id: Uuid,
    /// The nominating player.
    pub nominator_id: Uuid,
    /// The nominated player.
    pub nominee_id: Uuid,
}

impl_command!(Nominate, "session.nominate");

/// Command to record the votes for the active nominee.
#[derive(Debug, Clone)]
pub struct RecordVotes {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game identifier.
    pub game_id: Uuid,
    /// Players who voted in favour.
    pub voters: Vec<Uuid>,
}

impl_command!(RecordVotes, "session.record_votes");

/// Command to answer a narrator prompt and continue the paused action.
#[derive(Debug, Clone)]
pub struct AnswerPrompt {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game identifier.
    pub game_id: Uuid,
    /// The paused action, as returned when the prompt was raised.
    pub pending: PendingAction,
    /// The narrator's answer.
    pub answer: UiAnswer,
}

impl_command!(AnswerPrompt, "session.answer_prompt");

/// A change the narrator makes by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NarratorCommand {
    AddEffect {
        player_id: Uuid,
        effect: EffectInstance,
    },
    RemoveEffect {
        player_id: Uuid,
        effect_type: EffectId,
        /// Which instance to remove; all of them when absent.
        occurrence: Option<usize>,
    },
    ChangeRole {
        player_id: Uuid,
        role_id: RoleId,
    },
    Kill {
        player_id: Uuid,
    },
    Revive {
        player_id: Uuid,
    },
}

/// Command to apply a narrator action.
#[derive(Debug, Clone)]
pub struct ApplyNarratorAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game identifier.
    pub game_id: Uuid,
    /// What to change.
    pub action: NarratorCommand,
}

impl_command!(ApplyNarratorAction, "session.narrator_action");
