//! Changes the narrator makes by hand.
//!
//! Each action is documented with a `narrator_action` entry. Only the kill
//! goes through the intent pipeline, so protective effects still apply.

use grimoire_core::clock::Clock;
use grimoire_core::error::DomainError;
use grimoire_core::ids::{EffectId, RoleId};
use grimoire_log::domain::changes::{EffectRemoval, StateChanges};
use grimoire_log::domain::effects::EffectInstance;
use grimoire_log::domain::game::Game;
use grimoire_log::domain::history::{EntryDraft, EntryPayload, KillCause, NarratorActionKind};
use grimoire_log::domain::message::Message;
use grimoire_log::domain::state::{Phase, PlayerState};
use grimoire_rules::domain::catalog::Catalog;
use grimoire_rules::domain::intents::Intent;
use tracing::info;
use uuid::Uuid;

use super::resolution::{ActionSource, StepOutcome, run_intents};

fn target<'a>(game: &'a Game, player_id: Uuid) -> Result<&'a PlayerState, DomainError> {
    let state = game.state();
    if state.phase == Phase::Ended {
        return Err(DomainError::Validation(
            "the game has ended".to_owned(),
        ));
    }
    state
        .player(player_id)
        .ok_or_else(|| DomainError::Validation(format!("player {player_id} is not seated")))
}

fn record(kind: NarratorActionKind, message: Message) -> StateChanges {
    StateChanges::new().entry(EntryDraft::new(EntryPayload::NarratorAction(kind), message))
}

/// Places an effect instance on a player.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an unseated player, an effect the
/// catalog does not know, or an ended game.
pub fn add_effect(
    game: &Game,
    player_id: Uuid,
    effect: EffectInstance,
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<Game, DomainError> {
    target(game, player_id)?;
    if catalog.effects().get(&effect.effect_type).is_none() {
        return Err(DomainError::Validation(format!(
            "unknown effect {}",
            effect.effect_type
        )));
    }
    let effect_type = effect.effect_type.clone();
    let changes = record(
        NarratorActionKind::AddEffect {
            player_id,
            effect_type: effect_type.clone(),
        },
        Message::key("log.narrator.add_effect")
            .player(player_id)
            .effect(effect_type.clone()),
    )
    .add_effect(player_id, effect);
    info!(game_id = %game.id(), player = %player_id, effect = %effect_type, "narrator added effect");
    game.commit(changes, clock)
}

/// Removes one instance of an effect, or every instance when `occurrence`
/// is `None`.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an unseated player, a missing
/// instance, or an ended game.
pub fn remove_effect(
    game: &Game,
    player_id: Uuid,
    effect_type: &EffectId,
    occurrence: Option<usize>,
    clock: &dyn Clock,
) -> Result<Game, DomainError> {
    let player = target(game, player_id)?;
    let held = player.effects_of(effect_type.as_str()).count();
    let removal = match occurrence {
        Some(n) if n < held => EffectRemoval::Instance {
            player_id,
            effect_type: effect_type.clone(),
            occurrence: n,
        },
        None if held > 0 => EffectRemoval::AllOfType {
            player_id,
            effect_type: effect_type.clone(),
        },
        _ => {
            return Err(DomainError::Validation(format!(
                "{} has no such {effect_type} instance",
                player.name
            )));
        }
    };
    let changes = record(
        NarratorActionKind::RemoveEffect {
            player_id,
            effect_type: effect_type.clone(),
        },
        Message::key("log.narrator.remove_effect")
            .player(player_id)
            .effect(effect_type.clone()),
    )
    .remove_effect(removal);
    info!(game_id = %game.id(), player = %player_id, effect = %effect_type, "narrator removed effect");
    game.commit(changes, clock)
}

/// Gives a player a different role. Effects are left as they are.
///
/// # Errors
///
/// Returns `DomainError::UnknownRole` for a role missing from the catalog and
/// `DomainError::Validation` for an unseated player or an ended game.
pub fn change_role(
    game: &Game,
    player_id: Uuid,
    role_id: &RoleId,
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<Game, DomainError> {
    target(game, player_id)?;
    let role = catalog.role(role_id)?;
    let changes = record(
        NarratorActionKind::ChangeRole {
            player_id,
            role_id: role.id.clone(),
        },
        Message::key("log.narrator.change_role")
            .player(player_id)
            .role(role.id.clone()),
    )
    .change_role(player_id, role.id.clone());
    info!(game_id = %game.id(), player = %player_id, role = %role.id, "narrator changed role");
    game.commit(changes, clock)
}

/// Kills a living player through the intent pipeline.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an unseated or already dead player,
/// or an ended game.
pub fn kill(
    game: &Game,
    player_id: Uuid,
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<StepOutcome, DomainError> {
    let player = target(game, player_id)?;
    if !player.is_alive() {
        return Err(DomainError::Validation(format!(
            "{} is already dead",
            player.name
        )));
    }
    let prelude = record(
        NarratorActionKind::Kill { player_id },
        Message::key("log.narrator.kill").player(player_id),
    );
    let intent = Intent::Kill {
        source_id: None,
        target_id: player_id,
        cause: KillCause::Narrator,
    };
    info!(game_id = %game.id(), player = %player_id, "narrator kill");
    run_intents(game, ActionSource::Narrator, prelude, vec![intent], catalog, clock)
}

/// Brings a dead player back.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an unseated or living player, or an
/// ended game.
pub fn revive(game: &Game, player_id: Uuid, clock: &dyn Clock) -> Result<Game, DomainError> {
    let player = target(game, player_id)?;
    if player.is_alive() {
        return Err(DomainError::Validation(format!(
            "{} is not dead",
            player.name
        )));
    }
    let changes = record(
        NarratorActionKind::Revive { player_id },
        Message::key("log.narrator.revive").player(player_id),
    )
    .remove_effect(EffectRemoval::AllOfType {
        player_id,
        effect_type: EffectId::dead(),
    });
    info!(game_id = %game.id(), player = %player_id, "narrator revived player");
    game.commit(changes, clock)
}
