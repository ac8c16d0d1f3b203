//! Running intents through the pipeline on behalf of the phase machine.
//!
//! Intents proposed by one action are resolved one after another against the
//! game as it stands after the previous one was committed. When a handler
//! asks the narrator a question the remaining work is captured in a
//! [`PendingAction`] and nothing of the paused intent is committed.

use std::collections::VecDeque;

use grimoire_core::clock::Clock;
use grimoire_core::error::DomainError;
use grimoire_log::domain::changes::StateChanges;
use grimoire_log::domain::game::Game;
use grimoire_log::domain::history::{ActionResult, EntryDraft, EntryPayload};
use grimoire_log::domain::message::Message;
use grimoire_log::domain::state::{GameState, Phase};
use grimoire_rules::domain::catalog::Catalog;
use grimoire_rules::domain::definitions::{UiAnswer, UiRequest};
use grimoire_rules::domain::intents::Intent;
use grimoire_rules::domain::pipeline::{self, PendingResolution, PipelineOutcome};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::victory::commit_and_check;

/// Who proposed the intents being resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ActionSource {
    /// A player's night ability. Each resolved intent is documented with a
    /// `night_action` entry.
    NightAbility { actor_id: Uuid },
    /// A nomination during the day.
    Nomination,
    /// An execution after a vote.
    Vote,
    /// The narrator acting by hand.
    Narrator,
}

/// An action paused on a narrator prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub source: ActionSource,
    /// The intent as proposed, before any redirect.
    pub intent: Intent,
    pub resolution: PendingResolution,
    /// Intents of the same action still to resolve.
    pub queued: Vec<Intent>,
    /// Entries and changes to commit together with the paused intent.
    pub prelude: StateChanges,
    /// The game version the prompt was raised at.
    pub base_version: i64,
}

impl PendingAction {
    /// The question for the narrator.
    #[must_use]
    pub fn request(&self) -> &UiRequest {
        &self.resolution.request
    }
}

/// Where a step left the game.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Everything was committed.
    Committed(Game),
    /// The narrator must answer before the action can finish. Entries
    /// committed before the pause are already in `game`.
    AwaitingInput { game: Game, pending: Box<PendingAction> },
}

impl StepOutcome {
    /// The game after the step.
    #[must_use]
    pub fn game(&self) -> &Game {
        match self {
            Self::Committed(game) | Self::AwaitingInput { game, .. } => game,
        }
    }

    /// The paused action, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingAction> {
        match self {
            Self::Committed(_) => None,
            Self::AwaitingInput { pending, .. } => Some(pending),
        }
    }

    /// Splits the outcome into the game and the paused action.
    #[must_use]
    pub fn into_parts(self) -> (Game, Option<PendingAction>) {
        match self {
            Self::Committed(game) => (game, None),
            Self::AwaitingInput { game, pending } => (game, Some(*pending)),
        }
    }
}

enum Settled {
    Done(StateChanges),
    Paused(Box<PendingResolution>),
}

/// Resolves `intents` in order, committing `prelude` with the first batch.
///
/// With no intents the prelude is committed alone. Once the game ends the
/// remaining intents are dropped.
///
/// # Errors
///
/// Returns an error if a commit fails.
pub fn run_intents(
    game: &Game,
    source: ActionSource,
    prelude: StateChanges,
    intents: Vec<Intent>,
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<StepOutcome, DomainError> {
    drive(game.clone(), source, prelude, intents.into(), catalog, clock)
}

/// Continues a paused action with the narrator's answer.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the game has changed since the
/// prompt was raised, and `DomainError::InvalidSelection` if the answer is
/// rejected. In both cases `pending` stays usable.
pub fn resume_action(
    game: &Game,
    pending: &PendingAction,
    answer: &UiAnswer,
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<StepOutcome, DomainError> {
    if game.version() != pending.base_version {
        return Err(DomainError::Validation(format!(
            "the prompt was raised at version {} but the game is at version {}",
            pending.base_version,
            game.version()
        )));
    }
    let outcome = pipeline::resume(&pending.resolution, answer, game.state(), catalog)?;
    match settle(&pending.source, &pending.intent, outcome, game.state()) {
        Settled::Done(changes) => {
            let batch = pending.prelude.clone().merge(changes);
            let next = commit_and_check(game, batch, catalog, clock)?;
            drive(
                next,
                pending.source.clone(),
                StateChanges::new(),
                pending.queued.iter().cloned().collect(),
                catalog,
                clock,
            )
        }
        Settled::Paused(resolution) => Ok(StepOutcome::AwaitingInput {
            game: game.clone(),
            pending: Box::new(PendingAction {
                resolution: *resolution,
                ..pending.clone()
            }),
        }),
    }
}

fn drive(
    mut game: Game,
    source: ActionSource,
    mut prelude: StateChanges,
    mut queued: VecDeque<Intent>,
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<StepOutcome, DomainError> {
    while let Some(intent) = queued.pop_front() {
        if game.state().phase == Phase::Ended {
            debug!(game_id = %game.id(), dropped = queued.len() + 1, "game over, dropping intents");
            break;
        }
        let outcome = pipeline::resolve_intent(intent.clone(), game.state(), catalog);
        match settle(&source, &intent, outcome, game.state()) {
            Settled::Done(changes) => {
                let batch = std::mem::take(&mut prelude).merge(changes);
                game = commit_and_check(&game, batch, catalog, clock)?;
            }
            Settled::Paused(resolution) => {
                let pending = PendingAction {
                    source,
                    intent,
                    resolution: *resolution,
                    queued: queued.into(),
                    prelude,
                    base_version: game.version(),
                };
                return Ok(StepOutcome::AwaitingInput {
                    game,
                    pending: Box::new(pending),
                });
            }
        }
    }
    if !prelude.is_empty() {
        game = commit_and_check(&game, prelude, catalog, clock)?;
    }
    Ok(StepOutcome::Committed(game))
}

/// Turns a finished resolution into the batch to commit, documenting night
/// abilities with a `night_action` entry ahead of the resolution's own
/// changes.
fn settle(
    source: &ActionSource,
    proposed: &Intent,
    outcome: PipelineOutcome,
    state: &GameState,
) -> Settled {
    let record = match (&outcome, source) {
        (PipelineOutcome::RequestUi(_), _) => None,
        (PipelineOutcome::Allow { intent, .. }, ActionSource::NightAbility { actor_id }) => {
            let result = if intent.target() == proposed.target() {
                ActionResult::Succeeded
            } else {
                ActionResult::Redirected
            };
            Some(night_action(*actor_id, intent.target(), result))
        }
        (PipelineOutcome::Prevent { reason, .. }, ActionSource::NightAbility { actor_id }) => {
            debug!(actor = %actor_id, target = %proposed.target(), %reason, "night action prevented");
            Some(night_action(
                *actor_id,
                proposed.target(),
                ActionResult::Prevented,
            ))
        }
        _ => None,
    };
    if let PipelineOutcome::RequestUi(resolution) = outcome {
        return Settled::Paused(resolution);
    }
    let changes = outcome.into_changes(state).unwrap_or_default();
    match record {
        Some(draft) => Settled::Done(StateChanges::new().entry(draft).merge(changes)),
        None => Settled::Done(changes),
    }
}

/// A `night_action` entry.
#[must_use]
pub fn night_action(actor_id: Uuid, target_id: Uuid, result: ActionResult) -> EntryDraft {
    EntryDraft::new(
        EntryPayload::NightAction {
            actor_id: Some(actor_id),
            target_id: Some(target_id),
            result,
        },
        Message::key(match result {
            ActionResult::Succeeded => "log.night_action.succeeded",
            ActionResult::Prevented => "log.night_action.prevented",
            ActionResult::Redirected => "log.night_action.redirected",
            ActionResult::Malfunctioned => "log.night_action.malfunctioned",
            ActionResult::Skipped => "log.night_action.skipped",
        })
        .player(actor_id)
        .player(target_id),
    )
}
