//! Win-condition evaluation.

use grimoire_core::clock::Clock;
use grimoire_core::error::DomainError;
use grimoire_log::domain::changes::{StateChanges, StatePatch};
use grimoire_log::domain::game::Game;
use grimoire_log::domain::history::{EntryDraft, EntryPayload};
use grimoire_log::domain::message::Message;
use grimoire_log::domain::state::{Alignment, Phase};
use grimoire_rules::domain::catalog::Catalog;
use grimoire_rules::domain::definitions::{WinCondition, WinContext, WinTrigger};
use tracing::info;

/// The first verdict for `trigger`, looking at seats in order and, for each
/// seat, at the role's conditions before those of its effect instances.
#[must_use]
pub fn evaluate_win(game: &Game, trigger: WinTrigger, catalog: &Catalog) -> Option<Alignment> {
    let state = game.state();
    if state.phase == Phase::Ended {
        return None;
    }
    for player in &state.players {
        let ctx = WinContext {
            game,
            owner: player,
            trigger,
            catalog,
        };
        let role_conditions = catalog
            .roles()
            .get(&player.role_id)
            .map(|role| role.win_conditions.as_slice())
            .unwrap_or_default();
        if let Some(winner) = first_verdict(role_conditions, &ctx) {
            return Some(winner);
        }
        for instance in &player.effects {
            let Some(def) = catalog.effects().definition_of(instance) else {
                continue;
            };
            if let Some(winner) = first_verdict(&def.win_conditions, &ctx) {
                return Some(winner);
            }
        }
    }
    None
}

fn first_verdict(conditions: &[WinCondition], ctx: &WinContext<'_>) -> Option<Alignment> {
    conditions
        .iter()
        .filter(|c| c.triggers.contains(&ctx.trigger))
        .find_map(|c| (c.check)(ctx))
}

/// Evaluates each trigger in turn and ends the game on the first verdict.
///
/// # Errors
///
/// Returns an error if the `game_ended` entry cannot be committed.
pub fn check_win(
    game: &Game,
    triggers: &[WinTrigger],
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<Game, DomainError> {
    for trigger in triggers {
        if let Some(winner) = evaluate_win(game, *trigger, catalog) {
            return end_game(game, winner, *trigger, clock);
        }
    }
    Ok(game.clone())
}

fn end_game(
    game: &Game,
    winner: Alignment,
    trigger: WinTrigger,
    clock: &dyn Clock,
) -> Result<Game, DomainError> {
    let changes = StateChanges::new()
        .entry(EntryDraft::new(
            EntryPayload::GameEnded { winner },
            Message::key("log.game_ended"),
        ))
        .patch(StatePatch::phase(Phase::Ended).with_winner(winner));
    let ended = game.commit(changes, clock)?;
    info!(game_id = %game.id(), %winner, ?trigger, "game ended");
    Ok(ended)
}

/// The triggers a committed batch raises: executions, then deaths.
#[must_use]
pub fn triggers_for(changes: &StateChanges) -> Vec<WinTrigger> {
    let executed = changes
        .entries
        .iter()
        .any(|e| matches!(e.data, EntryPayload::Execution { .. }));
    let died = executed
        || changes
            .entries
            .iter()
            .any(|e| matches!(e.data, EntryPayload::Death { .. }));
    let mut triggers = Vec::new();
    if executed {
        triggers.push(WinTrigger::AfterExecution);
    }
    if died {
        triggers.push(WinTrigger::AfterDeath);
    }
    triggers
}

/// Commits `changes` and checks the win triggers they raise.
///
/// # Errors
///
/// Returns an error if either commit fails.
pub fn commit_and_check(
    game: &Game,
    changes: StateChanges,
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<Game, DomainError> {
    let triggers = triggers_for(&changes);
    let next = game.commit(changes, clock)?;
    check_win(&next, &triggers, catalog, clock)
}
