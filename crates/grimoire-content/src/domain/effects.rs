//! Built-in effects.

use grimoire_core::ids::EffectId;
use grimoire_log::domain::changes::{EffectRemoval, StateChanges};
use grimoire_log::domain::effects::{EffectInstance, GHOST_VOTE_SPENT};
use grimoire_log::domain::history::{EntryDraft, EntryPayload, KillCause};
use grimoire_log::domain::message::Message;
use grimoire_log::domain::state::{Alignment, PlayerState, Team};
use grimoire_rules::domain::definitions::{
    EffectDefinition, EffectKind, HandlerContext, HandlerResult, IntentHandler, PerceptionModifier,
    UiAnswer, UiRequest, WinCondition, WinContext, WinTrigger, targets_owner,
};
use grimoire_rules::domain::errors::ContentError;
use grimoire_rules::domain::intents::{Intent, IntentKind};
use grimoire_rules::domain::perception::{Aspect, apply_configured_override, perceive};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use super::roles::SCARLET_WOMAN;

pub const SAFE: &str = "safe";
pub const SAFE_FROM_DEMON: &str = "safe_from_demon";
pub const POISONED: &str = "poisoned";
pub const MISREGISTER: &str = "misregister";
pub const MISREGISTER_GOOD: &str = "misregister_good";
pub const SUCCESSION: &str = "succession";
pub const BOUNCE: &str = "bounce";
pub const VIRGIN: &str = "virgin";
pub const SAINT: &str = "saint";

/// Redirect-class handlers.
const REDIRECT_PRIORITY: i32 = 5;
/// Protection-class handlers.
const PROTECT_PRIORITY: i32 = 10;
const NOMINATION_PRIORITY: i32 = 50;
/// Post-resolution transformations; only reached if nothing prevented.
const SUCCESSION_PRIORITY: i32 = 100;

/// Every built-in effect.
#[must_use]
pub fn all() -> Vec<EffectDefinition> {
    vec![
        dead(),
        safe(),
        safe_from_demon(),
        poisoned(),
        misregister(MISREGISTER, vec![Team::Minion, Team::Demon], vec![Alignment::Evil]),
        misregister(
            MISREGISTER_GOOD,
            vec![Team::Townsfolk, Team::Outsider],
            vec![Alignment::Good],
        ),
        succession(),
        bounce(),
        virgin(),
        saint(),
    ]
}

fn dead() -> EffectDefinition {
    EffectDefinition::new(EffectId::DEAD)
        .restricts_nominating(|nominator, _nominee, _state| nominator.is_alive())
        .restricts_voting(|voter, _state| {
            !voter
                .effects_of(EffectId::DEAD)
                .any(|(_, e)| e.data_value(GHOST_VOTE_SPENT) == Some(&Value::Bool(true)))
        })
}

fn safe() -> EffectDefinition {
    EffectDefinition::new(SAFE).kind(EffectKind::Buff).handler(IntentHandler::new(
        IntentKind::Kill,
        PROTECT_PRIORITY,
        |intent, ctx| {
            targets_owner(intent, ctx)
                && matches!(
                    intent,
                    Intent::Kill {
                        cause: KillCause::Demon | KillCause::Ability,
                        ..
                    }
                )
        },
        |_intent, _ctx| Ok(HandlerResult::prevent("protected", StateChanges::new())),
    ))
}

fn safe_from_demon() -> EffectDefinition {
    EffectDefinition::new(SAFE_FROM_DEMON)
        .kind(EffectKind::Buff)
        .handler(IntentHandler::new(
            IntentKind::Kill,
            PROTECT_PRIORITY,
            |intent, ctx| {
                targets_owner(intent, ctx)
                    && matches!(
                        intent,
                        Intent::Kill {
                            cause: KillCause::Demon,
                            ..
                        }
                    )
                    && !ctx.catalog.effects().is_malfunctioning(ctx.owner)
            },
            |_intent, _ctx| Ok(HandlerResult::prevent("immune to the demon", StateChanges::new())),
        ))
}

fn poisoned() -> EffectDefinition {
    EffectDefinition::new(POISONED).kind(EffectKind::Debuff).poisons()
}

fn misregister(id: &str, teams: Vec<Team>, alignments: Vec<Alignment>) -> EffectDefinition {
    EffectDefinition::new(id)
        .registers_as(teams, alignments)
        .modifier(PerceptionModifier::new(
            vec![Aspect::Role, Aspect::Team, Aspect::Alignment],
            apply_configured_override,
        ))
}

fn succession() -> EffectDefinition {
    EffectDefinition::new(SUCCESSION)
        .handler(
            IntentHandler::new(IntentKind::Kill, SUCCESSION_PRIORITY, owner_dying, pass_demonhood)
                .with_resume(choose_successor),
        )
        .handler(IntentHandler::new(
            IntentKind::Execute,
            SUCCESSION_PRIORITY,
            owner_dying,
            pass_demonhood,
        ))
}

fn owner_dying(intent: &Intent, ctx: &HandlerContext<'_>) -> bool {
    targets_owner(intent, ctx) && ctx.owner.is_alive()
}

/// Living minions, other than the dying demon, that could take over.
fn minion_candidates(ctx: &HandlerContext<'_>) -> Vec<Uuid> {
    ctx.state
        .alive_players()
        .filter(|p| p.id != ctx.owner.id)
        .filter(|p| {
            ctx.catalog
                .roles()
                .get(&p.role_id)
                .is_some_and(|role| role.team == Team::Minion)
        })
        .map(|p| p.id)
        .collect()
}

fn pass_demonhood(intent: &Intent, ctx: &HandlerContext<'_>) -> Result<HandlerResult, ContentError> {
    let heir = ctx.state.alive_players().find(|p| {
        p.id != ctx.owner.id
            && p.role_id == *SCARLET_WOMAN
            && !ctx.catalog.effects().is_malfunctioning(p)
    });
    if let Some(heir) = heir {
        if ctx.state.alive_count() >= 5 {
            return Ok(HandlerResult::Allow(promote(ctx, heir)));
        }
    }

    let self_kill = matches!(
        intent,
        Intent::Kill { source_id: Some(source), cause: KillCause::Demon, .. } if *source == ctx.owner.id
    );
    if !self_kill {
        return Ok(HandlerResult::allow());
    }
    let candidates = minion_candidates(ctx);
    match candidates.as_slice() {
        [] => Ok(HandlerResult::allow()),
        [only] => {
            let heir = ctx
                .state
                .player(*only)
                .ok_or(ContentError::UnknownPlayer(*only))?;
            Ok(HandlerResult::Allow(promote(ctx, heir)))
        }
        _ => Ok(HandlerResult::RequestUi(
            UiRequest::new(
                "choose_successor",
                Message::key("prompt.choose_successor").player(ctx.owner.id),
            )
            .with_options(candidates),
        )),
    }
}

fn choose_successor(
    _intent: &Intent,
    ctx: &HandlerContext<'_>,
    answer: &UiAnswer,
) -> Result<HandlerResult, ContentError> {
    let candidates = minion_candidates(ctx);
    let UiAnswer::Players(chosen) = answer else {
        return Err(ContentError::InvalidSelection(
            "choose the minion who becomes the demon".to_owned(),
        ));
    };
    match chosen.as_slice() {
        [id] if candidates.contains(id) => {
            let heir = ctx.state.player(*id).ok_or(ContentError::UnknownPlayer(*id))?;
            Ok(HandlerResult::Allow(promote(ctx, heir)))
        }
        _ => Err(ContentError::InvalidSelection(
            "the successor must be one living minion".to_owned(),
        )),
    }
}

/// Hands the demon's role to `heir`. The effects the heir's old role started
/// with go with it.
fn promote(ctx: &HandlerContext<'_>, heir: &PlayerState) -> StateChanges {
    let demon = ctx.owner;
    let mut changes = StateChanges::new()
        .entry(EntryDraft::new(
            EntryPayload::RoleChanged {
                player_id: heir.id,
                from: heir.role_id.clone(),
                to: demon.role_id.clone(),
            },
            Message::key("log.role_changed")
                .player(heir.id)
                .role(demon.role_id.clone()),
        ))
        .change_role(heir.id, demon.role_id.clone());
    let mut stripped: Vec<&EffectId> = Vec::new();
    if let Some(old_role) = ctx.catalog.roles().get(&heir.role_id) {
        for instance in &old_role.initial_effects {
            if stripped.contains(&&instance.effect_type) {
                continue;
            }
            stripped.push(&instance.effect_type);
            changes = changes.remove_effect(EffectRemoval::AllOfType {
                player_id: heir.id,
                effect_type: instance.effect_type.clone(),
            });
        }
    }
    changes.add_effect(heir.id, EffectInstance::new(SUCCESSION))
}

fn bounce() -> EffectDefinition {
    EffectDefinition::new(BOUNCE).kind(EffectKind::Buff).handler(
        IntentHandler::new(
            IntentKind::Kill,
            REDIRECT_PRIORITY,
            |intent, ctx| {
                targets_owner(intent, ctx)
                    && matches!(
                        intent,
                        Intent::Kill {
                            cause: KillCause::Demon,
                            ..
                        }
                    )
                    && !ctx.catalog.effects().is_malfunctioning(ctx.owner)
            },
            |_intent, ctx| {
                let options = ctx.state.alive_players().map(|p| p.id).collect();
                Ok(HandlerResult::RequestUi(
                    UiRequest::new("bounce_kill", Message::key("prompt.bounce_kill").player(ctx.owner.id))
                        .with_options(options),
                ))
            },
        )
        .with_resume(bounce_to),
    )
}

fn bounce_to(
    intent: &Intent,
    ctx: &HandlerContext<'_>,
    answer: &UiAnswer,
) -> Result<HandlerResult, ContentError> {
    match answer {
        UiAnswer::Confirm(false) => Ok(HandlerResult::allow()),
        UiAnswer::Players(chosen) => match chosen.as_slice() {
            [id] if *id == ctx.owner.id => Ok(HandlerResult::allow()),
            [id] if ctx.state.player(*id).is_some_and(PlayerState::is_alive) => {
                Ok(HandlerResult::Redirect {
                    intent: intent.retarget(*id),
                    changes: StateChanges::new(),
                })
            }
            _ => Err(ContentError::InvalidSelection(
                "the kill must land on one living player".to_owned(),
            )),
        },
        _ => Err(ContentError::InvalidSelection(
            "choose a player or decline".to_owned(),
        )),
    }
}

fn virgin() -> EffectDefinition {
    EffectDefinition::new(VIRGIN).handler(IntentHandler::new(
        IntentKind::Nominate,
        NOMINATION_PRIORITY,
        |intent, ctx| targets_owner(intent, ctx) && !ctx.catalog.effects().is_malfunctioning(ctx.owner),
        virgin_nominated,
    ))
}

fn virgin_nominated(intent: &Intent, ctx: &HandlerContext<'_>) -> Result<HandlerResult, ContentError> {
    let Intent::Nominate { nominator_id, .. } = intent else {
        return Err(ContentError::Unsupported(format!("{:?}", intent.kind())));
    };
    let nominator = ctx
        .state
        .player(*nominator_id)
        .ok_or(ContentError::UnknownPlayer(*nominator_id))?;
    let townsfolk = match perceive(nominator, ctx.owner, Aspect::Team, ctx.state, ctx.catalog) {
        Ok(perception) => perception.team == Team::Townsfolk,
        Err(e) => {
            warn!(player = %nominator.id, error = %e, "virgin could not read nominator");
            false
        }
    };
    let spent = StateChanges::new().remove_effect(EffectRemoval::AllOfType {
        player_id: ctx.owner.id,
        effect_type: EffectId::new(VIRGIN),
    });
    if !townsfolk {
        return Ok(HandlerResult::Allow(spent));
    }
    let executed = spent
        .entry(EntryDraft::new(
            EntryPayload::Execution {
                player_id: nominator.id,
            },
            Message::key("log.execution").player(nominator.id),
        ))
        .add_effect(nominator.id, EffectInstance::new(EffectId::dead()));
    Ok(HandlerResult::prevent("the nominator was executed", executed))
}

fn saint() -> EffectDefinition {
    EffectDefinition::new(SAINT).win_condition(WinCondition::new(
        vec![WinTrigger::AfterExecution],
        saint_executed,
    ))
}

fn saint_executed(ctx: &WinContext<'_>) -> Option<Alignment> {
    let last_execution = ctx
        .game
        .history()
        .iter()
        .rev()
        .find_map(|entry| match entry.data {
            EntryPayload::Execution { player_id } => Some(player_id),
            _ => None,
        })?;
    (last_execution == ctx.owner.id && !ctx.catalog.effects().is_malfunctioning(ctx.owner))
        .then_some(Alignment::Evil)
}

#[cfg(test)]
mod tests {
    use grimoire_log::domain::state::GameState;
    use grimoire_rules::domain::pipeline::{PipelineOutcome, resolve_intent, resume};

    use super::*;
    use crate::domain::catalog::standard_catalog;
    use crate::domain::roles::{EMPATH, IMP, MAYOR, MONK, POISONER, SAINT_ROLE, SOLDIER, SPY, VIRGIN_ROLE};

    fn table(roles: &[&str]) -> GameState {
        let catalog = standard_catalog().unwrap();
        let mut state = GameState::initial();
        state.players = roles
            .iter()
            .map(|role| {
                let mut player = PlayerState::new(Uuid::new_v4(), *role, *role);
                player.effects = catalog
                    .role(&(*role).into())
                    .unwrap()
                    .initial_effects
                    .clone();
                player
            })
            .collect();
        state.round = 2;
        state
    }

    fn demon_kill(state: &GameState, demon: usize, target: usize) -> Intent {
        Intent::Kill {
            source_id: Some(state.players[demon].id),
            target_id: state.players[target].id,
            cause: KillCause::Demon,
        }
    }

    #[test]
    fn test_safe_prevents_demon_kill() {
        let catalog = standard_catalog().unwrap();
        let mut state = table(&[IMP, EMPATH, MONK, POISONER, SAINT_ROLE]);
        state.players[1].effects.push(EffectInstance::new(SAFE));

        let outcome = resolve_intent(demon_kill(&state, 0, 1), &state, &catalog);
        assert!(matches!(outcome, PipelineOutcome::Prevent { .. }));
    }

    #[test]
    fn test_safe_does_not_stop_execution() {
        let catalog = standard_catalog().unwrap();
        let mut state = table(&[IMP, EMPATH, MONK, POISONER, SAINT_ROLE]);
        state.players[1].effects.push(EffectInstance::new(SAFE));
        let intent = Intent::Execute {
            player_id: state.players[1].id,
        };

        assert!(matches!(
            resolve_intent(intent, &state, &catalog),
            PipelineOutcome::Allow { .. }
        ));
    }

    #[test]
    fn test_poisoned_soldier_dies() {
        let catalog = standard_catalog().unwrap();
        let mut state = table(&[IMP, SOLDIER, MONK, POISONER, SAINT_ROLE]);
        assert!(matches!(
            resolve_intent(demon_kill(&state, 0, 1), &state, &catalog),
            PipelineOutcome::Prevent { .. }
        ));

        state.players[1]
            .effects
            .push(EffectInstance::new(POISONED).expiring(grimoire_log::domain::effects::Expiry::EndOfDay));
        assert!(matches!(
            resolve_intent(demon_kill(&state, 0, 1), &state, &catalog),
            PipelineOutcome::Allow { .. }
        ));
    }

    #[test]
    fn test_mayor_bounce_moves_kill_to_chosen_player() {
        let catalog = standard_catalog().unwrap();
        let state = table(&[IMP, MAYOR, MONK, POISONER, SAINT_ROLE]);
        let monk = state.players[2].id;

        let PipelineOutcome::RequestUi(pending) =
            resolve_intent(demon_kill(&state, 0, 1), &state, &catalog)
        else {
            panic!("expected the mayor's prompt");
        };
        assert_eq!(pending.request.component, "bounce_kill");

        let outcome = resume(&pending, &UiAnswer::Players(vec![monk]), &state, &catalog).unwrap();
        let changes = outcome.into_changes(&state).unwrap();
        assert_eq!(changes.add_effects.len(), 1);
        assert_eq!(changes.add_effects[0].player_id, monk);
    }

    #[test]
    fn test_bounce_onto_dead_player_is_rejected() {
        let catalog = standard_catalog().unwrap();
        let mut state = table(&[IMP, MAYOR, MONK, POISONER, SAINT_ROLE]);
        state.players[2].effects.push(EffectInstance::new(EffectId::dead()));
        let monk = state.players[2].id;

        let PipelineOutcome::RequestUi(pending) =
            resolve_intent(demon_kill(&state, 0, 1), &state, &catalog)
        else {
            panic!("expected the mayor's prompt");
        };
        let result = resume(&pending, &UiAnswer::Players(vec![monk]), &state, &catalog);
        assert!(result.is_err());
    }

    #[test]
    fn test_scarlet_woman_inherits_with_five_alive() {
        let catalog = standard_catalog().unwrap();
        let state = table(&[IMP, SCARLET_WOMAN, MONK, EMPATH, SAINT_ROLE]);
        let intent = Intent::Execute {
            player_id: state.players[0].id,
        };

        let changes = resolve_intent(intent, &state, &catalog)
            .into_changes(&state)
            .unwrap();
        assert_eq!(changes.change_roles.len(), 1);
        assert_eq!(changes.change_roles[0].player_id, state.players[1].id);
        assert_eq!(changes.change_roles[0].role_id, *IMP);
    }

    #[test]
    fn test_star_pass_asks_when_several_minions() {
        let catalog = standard_catalog().unwrap();
        let state = table(&[IMP, POISONER, SPY, EMPATH, SAINT_ROLE]);
        let spy = state.players[2].id;

        let PipelineOutcome::RequestUi(pending) =
            resolve_intent(demon_kill(&state, 0, 0), &state, &catalog)
        else {
            panic!("expected a successor prompt");
        };
        assert_eq!(pending.request.options.len(), 2);

        let bad = resume(&pending, &UiAnswer::Players(vec![state.players[3].id]), &state, &catalog);
        assert!(bad.is_err());

        let changes = resume(&pending, &UiAnswer::Players(vec![spy]), &state, &catalog)
            .unwrap()
            .into_changes(&state)
            .unwrap();
        assert_eq!(changes.change_roles[0].player_id, spy);
    }

    #[test]
    fn test_promoted_spy_loses_its_misregistration() {
        // Arrange
        let catalog = standard_catalog().unwrap();
        let state = table(&[IMP, SPY, MONK, EMPATH, SAINT_ROLE]);
        let spy = state.players[1].id;
        assert!(state.players[1].has_effect(MISREGISTER_GOOD));

        // Act
        let changes = resolve_intent(demon_kill(&state, 0, 0), &state, &catalog)
            .into_changes(&state)
            .unwrap();
        let (_, delta) = changes.into_parts();
        let next = delta.apply(&state).unwrap();

        // Assert
        let heir = next.player(spy).unwrap();
        assert_eq!(heir.role_id, *IMP);
        assert!(!heir.has_effect(MISREGISTER_GOOD));
        assert!(heir.has_effect(SUCCESSION));
    }

    #[test]
    fn test_virgin_executes_townsfolk_nominator() {
        let catalog = standard_catalog().unwrap();
        let state = table(&[IMP, VIRGIN_ROLE, MONK, POISONER, SAINT_ROLE]);
        let intent = Intent::Nominate {
            nominator_id: state.players[2].id,
            nominee_id: state.players[1].id,
        };

        let PipelineOutcome::Prevent { changes, .. } = resolve_intent(intent, &state, &catalog) else {
            panic!("expected the virgin to stop the nomination");
        };
        assert_eq!(changes.add_effects[0].player_id, state.players[2].id);
        assert!(changes.add_effects[0].effect.is(EffectId::DEAD));
        assert_eq!(changes.remove_effects.len(), 1);
    }

    #[test]
    fn test_virgin_spent_by_minion_nominator() {
        let catalog = standard_catalog().unwrap();
        let state = table(&[IMP, VIRGIN_ROLE, MONK, POISONER, SAINT_ROLE]);
        let intent = Intent::Nominate {
            nominator_id: state.players[3].id,
            nominee_id: state.players[1].id,
        };

        let PipelineOutcome::Allow { changes, .. } = resolve_intent(intent, &state, &catalog) else {
            panic!("expected the nomination to stand");
        };
        assert!(changes.add_effects.is_empty());
        assert_eq!(changes.remove_effects.len(), 1);
    }

    #[test]
    fn test_dead_player_cannot_nominate_and_spends_ghost_vote() {
        let catalog = standard_catalog().unwrap();
        let def = catalog.effects().get(&EffectId::dead()).unwrap();
        let mut ghost = PlayerState::new(Uuid::new_v4(), "Ada", EMPATH);
        ghost.effects.push(EffectInstance::new(EffectId::dead()));
        let state = GameState::initial();

        let can_nominate = def.can_nominate.unwrap();
        let can_vote = def.can_vote.unwrap();
        assert!(!can_nominate(&ghost, &ghost, &state));
        assert!(can_vote(&ghost, &state));

        ghost.effects[0] = EffectInstance::new(EffectId::dead()).with_data(GHOST_VOTE_SPENT, true);
        assert!(!can_vote(&ghost, &state));
    }
}
