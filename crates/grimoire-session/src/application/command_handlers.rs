//! Command handlers for the session context.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: load the game, run the step, persist the new
//! entries.

use grimoire_core::clock::Clock;
use grimoire_core::command::Command;
use grimoire_core::error::DomainError;
use grimoire_core::repository::{GameRepository, StoredEntry};
use grimoire_log::application::storage::{reconstitute, to_stored_entries};
use grimoire_log::domain::game::Game;
use grimoire_rules::domain::catalog::Catalog;
use tracing::info;
use uuid::Uuid;

use crate::domain::commands::{
    AnswerPrompt, ApplyNarratorAction, BeginNight, EndNight, NarratorCommand, Nominate,
    RecordVotes, SkipWake, StartGame, SubmitNightAction,
};
use crate::domain::resolution::{PendingAction, StepOutcome, resume_action};
use crate::domain::{narrator, night, phases, setup, voting};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct SessionCommandResult {
    /// The game affected by the command.
    pub game_id: Uuid,
    /// The stored entries produced and persisted.
    pub stored_entries: Vec<StoredEntry>,
    /// The action waiting on a narrator answer, if the command paused.
    pub pending: Option<PendingAction>,
}

fn log_command(command: &dyn Command) {
    info!(
        correlation_id = %command.correlation_id(),
        command_type = command.command_type(),
        game_id = %command.game_id(),
        "handling command"
    );
}

/// Loads and reconstitutes a game.
///
/// # Errors
///
/// Returns `DomainError::GameNotFound` if no entries exist for the ID and
/// `DomainError::Infrastructure` if the stored log cannot be replayed.
pub(crate) async fn load_game(
    game_id: Uuid,
    repo: &dyn GameRepository,
) -> Result<Game, DomainError> {
    let stored = repo.load_entries(game_id).await?;
    if stored.is_empty() {
        return Err(DomainError::GameNotFound(game_id));
    }
    reconstitute(game_id, &stored)
}

async fn persist(
    before: &Game,
    outcome: StepOutcome,
    correlation_id: Uuid,
    repo: &dyn GameRepository,
) -> Result<SessionCommandResult, DomainError> {
    let (after, pending) = outcome.into_parts();
    let stored_entries = to_stored_entries(
        before.id(),
        before.version(),
        after.appended_since(before),
        correlation_id,
    )?;
    if !stored_entries.is_empty() {
        repo.append_entries(before.id(), before.version(), &stored_entries)
            .await?;
    }
    Ok(SessionCommandResult {
        game_id: before.id(),
        stored_entries,
        pending,
    })
}

/// Handles the `StartGame` command: seats the players of a new game and
/// persists the `game_started` entry.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the game already exists or the seats
/// are invalid, and `DomainError` if appending fails.
pub async fn handle_start_game(
    command: &StartGame,
    catalog: &Catalog,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<SessionCommandResult, DomainError> {
    log_command(command);
    let existing = repo.load_entries(command.game_id).await?;
    if !existing.is_empty() {
        return Err(DomainError::Validation(format!(
            "game {} already exists",
            command.game_id
        )));
    }
    let game = Game::new(command.game_id);
    let started = setup::start_game(&game, &command.seats, catalog, clock)?;
    persist(
        &game,
        StepOutcome::Committed(started),
        command.correlation_id,
        repo,
    )
    .await
}

/// Handles the `BeginNight` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, the transition, or appending fails.
pub async fn handle_begin_night(
    command: &BeginNight,
    catalog: &Catalog,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<SessionCommandResult, DomainError> {
    log_command(command);
    let game = load_game(command.game_id, repo).await?;
    let next = phases::begin_night(&game, catalog, clock)?;
    persist(&game, StepOutcome::Committed(next), command.correlation_id, repo).await
}

/// Handles the `EndNight` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, the transition, or appending fails.
pub async fn handle_end_night(
    command: &EndNight,
    catalog: &Catalog,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<SessionCommandResult, DomainError> {
    log_command(command);
    let game = load_game(command.game_id, repo).await?;
    let next = phases::end_night(&game, catalog, clock)?;
    persist(&game, StepOutcome::Committed(next), command.correlation_id, repo).await
}

/// Handles the `SubmitNightAction` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, the ability, or appending fails.
pub async fn handle_submit_night_action(
    command: &SubmitNightAction,
    catalog: &Catalog,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<SessionCommandResult, DomainError> {
    log_command(command);
    let game = load_game(command.game_id, repo).await?;
    let outcome =
        night::resolve_night_action(&game, command.actor_id, &command.targets, catalog, clock)?;
    persist(&game, outcome, command.correlation_id, repo).await
}

/// Handles the `SkipWake` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, the turn check, or appending fails.
pub async fn handle_skip_wake(
    command: &SkipWake,
    catalog: &Catalog,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<SessionCommandResult, DomainError> {
    log_command(command);
    let game = load_game(command.game_id, repo).await?;
    let next = night::skip_wake(&game, command.actor_id, catalog, clock)?;
    persist(&game, StepOutcome::Committed(next), command.correlation_id, repo).await
}

/// Handles the `Nominate` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, the nomination, or appending fails.
pub async fn handle_nominate(
    command: &Nominate,
    catalog: &Catalog,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<SessionCommandResult, DomainError> {
    log_command(command);
    let game = load_game(command.game_id, repo).await?;
    let outcome = voting::nominate(
        &game,
        command.nominator_id,
        command.nominee_id,
        catalog,
        clock,
    )?;
    persist(&game, outcome, command.correlation_id, repo).await
}

/// Handles the `RecordVotes` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, the tally, or appending fails.
pub async fn handle_record_votes(
    command: &RecordVotes,
    catalog: &Catalog,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<SessionCommandResult, DomainError> {
    log_command(command);
    let game = load_game(command.game_id, repo).await?;
    let outcome = voting::record_votes(&game, &command.voters, catalog, clock)?;
    persist(&game, outcome, command.correlation_id, repo).await
}

/// Handles the `AnswerPrompt` command: continues a paused action.
///
/// # Errors
///
/// Returns `DomainError::InvalidSelection` if the answer is rejected (the
/// pending action can be answered again), `DomainError::Validation` if the
/// game has moved on since the prompt, and `DomainError` if appending fails.
pub async fn handle_answer_prompt(
    command: &AnswerPrompt,
    catalog: &Catalog,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<SessionCommandResult, DomainError> {
    log_command(command);
    let game = load_game(command.game_id, repo).await?;
    let outcome = resume_action(&game, &command.pending, &command.answer, catalog, clock)?;
    persist(&game, outcome, command.correlation_id, repo).await
}

/// Handles the `ApplyNarratorAction` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, the action, or appending fails.
pub async fn handle_narrator_action(
    command: &ApplyNarratorAction,
    catalog: &Catalog,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<SessionCommandResult, DomainError> {
    log_command(command);
    let game = load_game(command.game_id, repo).await?;
    let outcome = match &command.action {
        NarratorCommand::AddEffect { player_id, effect } => StepOutcome::Committed(
            narrator::add_effect(&game, *player_id, effect.clone(), catalog, clock)?,
        ),
        NarratorCommand::RemoveEffect {
            player_id,
            effect_type,
            occurrence,
        } => StepOutcome::Committed(narrator::remove_effect(
            &game,
            *player_id,
            effect_type,
            *occurrence,
            clock,
        )?),
        NarratorCommand::ChangeRole { player_id, role_id } => StepOutcome::Committed(
            narrator::change_role(&game, *player_id, role_id, catalog, clock)?,
        ),
        NarratorCommand::Kill { player_id } => narrator::kill(&game, *player_id, catalog, clock)?,
        NarratorCommand::Revive { player_id } => {
            StepOutcome::Committed(narrator::revive(&game, *player_id, clock)?)
        }
    };
    persist(&game, outcome, command.correlation_id, repo).await
}
