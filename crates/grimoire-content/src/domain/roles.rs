//! Built-in roles.

use grimoire_log::domain::effects::{EffectInstance, Expiry};
use grimoire_log::domain::game::Game;
use grimoire_log::domain::history::{EntryPayload, KillCause};
use grimoire_log::domain::state::{Alignment, GameState, PlayerState, Team};
use grimoire_rules::domain::definitions::{RoleDefinition, WinCondition, WinContext, WinTrigger};
use grimoire_rules::domain::errors::ContentError;
use grimoire_rules::domain::intents::Intent;
use uuid::Uuid;

use super::effects::{
    BOUNCE, MISREGISTER, MISREGISTER_GOOD, POISONED, SAFE, SAFE_FROM_DEMON, SAINT, SUCCESSION,
    VIRGIN,
};

pub const IMP: &str = "imp";
pub const POISONER: &str = "poisoner";
pub const SPY: &str = "spy";
pub const SCARLET_WOMAN: &str = "scarlet_woman";
pub const MONK: &str = "monk";
pub const SOLDIER: &str = "soldier";
pub const EMPATH: &str = "empath";
pub const MAYOR: &str = "mayor";
pub const VIRGIN_ROLE: &str = "virgin";
pub const RECLUSE: &str = "recluse";
pub const SAINT_ROLE: &str = "saint";

/// Every built-in role.
#[must_use]
pub fn all() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new(POISONER, Team::Minion)
            .wakes_at(10)
            .ability(poison),
        RoleDefinition::new(MONK, Team::Townsfolk)
            .wakes_at(20)
            .should_wake(alive_after_first_night)
            .ability(protect),
        RoleDefinition::new(IMP, Team::Demon)
            .wakes_at(30)
            .should_wake(alive_after_first_night)
            .initial_effect(EffectInstance::new(SUCCESSION))
            .win_condition(WinCondition::new(
                vec![
                    WinTrigger::AfterDeath,
                    WinTrigger::AfterExecution,
                    WinTrigger::EndOfNight,
                    WinTrigger::EndOfDay,
                ],
                demon_parity,
            ))
            .ability(kill),
        RoleDefinition::new(EMPATH, Team::Townsfolk).wakes_at(40),
        RoleDefinition::new(SPY, Team::Minion)
            .wakes_at(50)
            .initial_effect(EffectInstance::new(MISREGISTER_GOOD)),
        RoleDefinition::new(SCARLET_WOMAN, Team::Minion),
        RoleDefinition::new(SOLDIER, Team::Townsfolk)
            .initial_effect(EffectInstance::new(SAFE_FROM_DEMON)),
        RoleDefinition::new(MAYOR, Team::Townsfolk)
            .initial_effect(EffectInstance::new(BOUNCE))
            .win_condition(WinCondition::new(vec![WinTrigger::EndOfDay], mayor_peace)),
        RoleDefinition::new(VIRGIN_ROLE, Team::Townsfolk).initial_effect(EffectInstance::new(VIRGIN)),
        RoleDefinition::new(RECLUSE, Team::Outsider).initial_effect(EffectInstance::new(MISREGISTER)),
        RoleDefinition::new(SAINT_ROLE, Team::Outsider).initial_effect(EffectInstance::new(SAINT)),
    ]
}

fn alive_after_first_night(game: &Game, player: &PlayerState) -> bool {
    player.is_alive() && game.state().round > 1
}

fn single_target(targets: &[Uuid], state: &GameState) -> Result<Uuid, ContentError> {
    match targets {
        [id] if state.player(*id).is_some() => Ok(*id),
        [id] => Err(ContentError::UnknownPlayer(*id)),
        _ => Err(ContentError::InvalidSelection(
            "choose exactly one player".to_owned(),
        )),
    }
}

fn poison(actor: &PlayerState, targets: &[Uuid], state: &GameState) -> Result<Vec<Intent>, ContentError> {
    let target = single_target(targets, state)?;
    Ok(vec![Intent::ApplyEffect {
        source_id: Some(actor.id),
        target_id: target,
        effect: EffectInstance::new(POISONED).expiring(Expiry::EndOfDay),
    }])
}

fn protect(actor: &PlayerState, targets: &[Uuid], state: &GameState) -> Result<Vec<Intent>, ContentError> {
    let target = single_target(targets, state)?;
    if target == actor.id {
        return Err(ContentError::InvalidSelection(
            "the monk cannot protect themselves".to_owned(),
        ));
    }
    Ok(vec![Intent::ApplyEffect {
        source_id: Some(actor.id),
        target_id: target,
        effect: EffectInstance::new(SAFE).expiring(Expiry::EndOfNight),
    }])
}

fn kill(actor: &PlayerState, targets: &[Uuid], state: &GameState) -> Result<Vec<Intent>, ContentError> {
    let target = single_target(targets, state)?;
    Ok(vec![Intent::Kill {
        source_id: Some(actor.id),
        target_id: target,
        cause: KillCause::Demon,
    }])
}

/// Good wins once no demon lives; evil wins when two players remain.
fn demon_parity(ctx: &WinContext<'_>) -> Option<Alignment> {
    let state = ctx.game.state();
    let living_demons = state
        .alive_players()
        .filter(|p| {
            ctx.catalog
                .roles()
                .get(&p.role_id)
                .is_some_and(|role| role.team == Team::Demon)
        })
        .count();
    if living_demons == 0 {
        Some(Alignment::Good)
    } else if state.alive_count() <= 2 {
        Some(Alignment::Evil)
    } else {
        None
    }
}

/// Good wins if the day ends with three players alive and nobody executed.
fn mayor_peace(ctx: &WinContext<'_>) -> Option<Alignment> {
    let state = ctx.game.state();
    let executed_today = ctx
        .game
        .entries_since("day_started")
        .iter()
        .any(|entry| matches!(entry.data, EntryPayload::Execution { .. }));
    let peaceful = ctx.owner.is_alive()
        && state.alive_count() == 3
        && !executed_today
        && !ctx.catalog.effects().is_malfunctioning(ctx.owner);
    peaceful.then_some(Alignment::Good)
}
