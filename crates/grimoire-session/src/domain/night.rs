//! The night: who wakes, in what order, and what their abilities do.

use std::collections::HashSet;

use grimoire_core::clock::Clock;
use grimoire_core::error::DomainError;
use grimoire_core::ids::RoleId;
use grimoire_log::domain::changes::StateChanges;
use grimoire_log::domain::game::Game;
use grimoire_log::domain::history::{ActionResult, EntryDraft, EntryPayload};
use grimoire_log::domain::message::Message;
use grimoire_log::domain::state::{Phase, PlayerState};
use grimoire_rules::domain::catalog::Catalog;
use grimoire_rules::domain::errors::ContentError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::resolution::{ActionSource, StepOutcome, night_action, run_intents};

/// A player due to wake tonight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeEntry {
    pub player_id: Uuid,
    pub role_id: RoleId,
    pub night_order: u32,
}

/// Players whose role wakes tonight, by night order and then seat.
///
/// Roles without a night order never wake; the others wake when their own
/// `should_wake` predicate holds.
#[must_use]
pub fn wake_list(game: &Game, catalog: &Catalog) -> Vec<WakeEntry> {
    let mut entries: Vec<(u32, usize, WakeEntry)> = game
        .state()
        .players
        .iter()
        .enumerate()
        .filter_map(|(seat, player)| {
            let role = catalog.roles().get(&player.role_id)?;
            let order = role.night_order?;
            (role.should_wake)(game, player).then(|| {
                (
                    order,
                    seat,
                    WakeEntry {
                        player_id: player.id,
                        role_id: role.id.clone(),
                        night_order: order,
                    },
                )
            })
        })
        .collect();
    entries.sort_by_key(|(order, seat, _)| (*order, *seat));
    entries.into_iter().map(|(_, _, entry)| entry).collect()
}

/// Tonight's wake entries that have neither acted nor been skipped, in wake
/// order. Empty outside the night.
///
/// Derived from the `night_action` entries appended since the night began,
/// so players who die before their turn drop off on their own.
#[must_use]
pub fn outstanding_wakes(game: &Game, catalog: &Catalog) -> Vec<WakeEntry> {
    if game.state().phase != Phase::Night {
        return Vec::new();
    }
    let woken: HashSet<Uuid> = game
        .entries_since("night_started")
        .iter()
        .filter_map(|e| match e.data {
            EntryPayload::NightAction { actor_id, .. } => actor_id,
            _ => None,
        })
        .collect();
    wake_list(game, catalog)
        .into_iter()
        .filter(|w| !woken.contains(&w.player_id))
        .collect()
}

/// Checks that `actor_id` is the next player due to wake.
fn expect_turn<'a>(
    game: &'a Game,
    actor_id: Uuid,
    catalog: &Catalog,
) -> Result<&'a PlayerState, DomainError> {
    let state = game.state();
    if state.phase != Phase::Night {
        return Err(DomainError::Validation(format!(
            "night abilities cannot be used during {}",
            state.phase
        )));
    }
    let actor = state
        .player(actor_id)
        .ok_or_else(|| DomainError::Validation(format!("player {actor_id} is not seated")))?;
    if !wake_list(game, catalog).iter().any(|w| w.player_id == actor_id) {
        return Err(DomainError::Validation(format!(
            "{} does not wake tonight",
            actor.name
        )));
    }
    let outstanding = outstanding_wakes(game, catalog);
    let Some(position) = outstanding.iter().position(|w| w.player_id == actor_id) else {
        return Err(DomainError::Validation(format!(
            "{} has already acted tonight",
            actor.name
        )));
    };
    if position == 0 {
        return Ok(actor);
    }
    let next_id = outstanding[0].player_id;
    let next_name = state
        .player(next_id)
        .map_or_else(|| next_id.to_string(), |p| p.name.clone());
    Err(DomainError::Validation(format!(
        "{next_name} wakes before {}",
        actor.name
    )))
}

/// Resolves the night ability of `actor_id` against the chosen `targets`.
///
/// Players act strictly in wake-list order. Targets are validated by the
/// role's ability even when the actor is malfunctioning; a malfunctioning
/// actor's ability then does nothing and is recorded as `malfunctioned`.
/// Each intent the ability proposes is resolved in turn and documented with a
/// `night_action` entry.
///
/// # Errors
///
/// Returns `DomainError::Validation` outside the night, for a player who is
/// not on tonight's wake list, who has already acted tonight, or whose turn
/// has not come yet, and for targets who are not seated.
/// Returns `DomainError::InvalidSelection` if the ability rejects the targets.
pub fn resolve_night_action(
    game: &Game,
    actor_id: Uuid,
    targets: &[Uuid],
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<StepOutcome, DomainError> {
    let actor = expect_turn(game, actor_id, catalog)?;
    let state = game.state();
    if let Some(stray) = targets.iter().find(|id| state.player(**id).is_none()) {
        return Err(DomainError::Validation(format!("player {stray} is not seated")));
    }

    let role = catalog.role(&actor.role_id)?;
    let intents = match role.ability {
        Some(ability) => match ability(actor, targets, state) {
            Ok(intents) => intents,
            Err(ContentError::InvalidSelection(reason)) => {
                return Err(DomainError::InvalidSelection(reason));
            }
            Err(ContentError::UnknownPlayer(id)) => {
                return Err(DomainError::Validation(format!("player {id} is not seated")));
            }
            Err(e) => {
                warn!(
                    actor = %actor_id,
                    role = %actor.role_id,
                    error = %e,
                    "ability failed, recording it without effect"
                );
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let first_target = targets.first().copied().unwrap_or(actor_id);
    let record_only = |result| {
        let changes = StateChanges::new().entry(night_action(actor_id, first_target, result));
        run_intents(game, ActionSource::Narrator, changes, Vec::new(), catalog, clock)
    };
    if catalog.effects().is_malfunctioning(actor) {
        return record_only(ActionResult::Malfunctioned);
    }
    if intents.is_empty() {
        return record_only(ActionResult::Succeeded);
    }
    run_intents(
        game,
        ActionSource::NightAbility { actor_id },
        StateChanges::new(),
        intents,
        catalog,
        clock,
    )
}

/// Passes over the next player due to wake without using their ability.
///
/// # Errors
///
/// Returns `DomainError::Validation` under the same conditions as
/// [`resolve_night_action`] rejects an actor.
pub fn skip_wake(
    game: &Game,
    actor_id: Uuid,
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<Game, DomainError> {
    expect_turn(game, actor_id, catalog)?;
    let changes = StateChanges::new().entry(EntryDraft::new(
        EntryPayload::NightAction {
            actor_id: Some(actor_id),
            target_id: None,
            result: ActionResult::Skipped,
        },
        Message::key("log.night_action.skipped").player(actor_id),
    ));
    let next = game.commit(changes, clock)?;
    info!(game_id = %game.id(), actor = %actor_id, "wake skipped");
    Ok(next)
}
