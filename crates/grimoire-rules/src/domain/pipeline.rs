//! Intent resolution.
//!
//! Every handler of every effect in play that matches an intent is collected
//! and sorted by `(priority, seat, effect index, handler index)`. Handlers run
//! in that order until one prevents the intent or asks the operator a
//! question. A redirect replaces the intent and re-collects handlers for the
//! new intent, keeping only those that sort after the redirecting handler.
//!
//! Resolution only computes changes. Nothing is committed here.

use std::collections::VecDeque;

use grimoire_core::error::DomainError;
use grimoire_core::ids::EffectId;
use grimoire_log::domain::changes::{StateChanges, StatePatch};
use grimoire_log::domain::effects::EffectInstance;
use grimoire_log::domain::history::{EntryDraft, EntryPayload};
use grimoire_log::domain::message::Message;
use grimoire_log::domain::state::{GameState, Phase};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::catalog::Catalog;
use super::definitions::{HandlerContext, HandlerResult, IntentHandler, UiAnswer, UiRequest};
use super::errors::ContentError;
use super::intents::Intent;

/// Position of a handler in the resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandlerKey {
    /// Handler priority; lower runs first.
    pub priority: i32,
    /// Seat of the effect's owner.
    pub seat: usize,
    /// Index of the instance in the owner's effects.
    pub effect_index: usize,
    /// Index of the handler in the effect definition.
    pub handler_index: usize,
}

/// A collected handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerRef {
    /// Sort key.
    pub key: HandlerKey,
    /// The effect's owner.
    pub player_id: Uuid,
    /// The effect type, checked again when the handler runs.
    pub effect_type: EffectId,
}

/// A resolution paused on an operator prompt.
///
/// It captures everything needed to continue: the intent at the point of the
/// pause, the prompting handler, the changes accumulated so far, and the
/// handlers still to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingResolution {
    /// The intent as it stood when the prompt was raised.
    pub intent: Intent,
    /// The handler waiting for the answer.
    pub handler: HandlerRef,
    /// Changes accumulated before the prompt.
    pub changes: StateChanges,
    /// Handlers that run after the prompting one.
    pub remaining: Vec<HandlerRef>,
    /// The question.
    pub request: UiRequest,
}

/// The result of resolving an intent.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Every handler allowed the (possibly redirected) intent.
    Allow {
        /// The final intent.
        intent: Intent,
        /// Changes from handlers, without the intent's own default changes.
        changes: StateChanges,
    },
    /// A handler stopped the intent.
    Prevent {
        /// Why.
        reason: String,
        /// Changes accumulated up to and including the preventing handler.
        changes: StateChanges,
    },
    /// A handler needs an answer from the operator.
    RequestUi(Box<PendingResolution>),
}

impl PipelineOutcome {
    /// The changes to commit for a finished resolution: for an allowed intent
    /// the handlers' changes followed by the intent's default changes, for a
    /// prevented one the handlers' changes alone. `None` while a prompt is
    /// pending.
    #[must_use]
    pub fn into_changes(self, state: &GameState) -> Option<StateChanges> {
        match self {
            Self::Allow { intent, changes } => Some(changes.merge(default_changes(&intent, state))),
            Self::Prevent { changes, .. } => Some(changes),
            Self::RequestUi(_) => None,
        }
    }
}

/// Resolves an intent against the state.
#[must_use]
pub fn resolve_intent(intent: Intent, state: &GameState, catalog: &Catalog) -> PipelineOutcome {
    let queue = collect_handlers(&intent, state, catalog, None);
    debug!(
        intent = ?intent.kind(),
        target = %intent.target(),
        handlers = queue.len(),
        "resolving intent"
    );
    Walk {
        state,
        catalog,
        intent,
        queue: queue.into(),
        changes: StateChanges::new(),
    }
    .run()
}

/// Continues a paused resolution with the operator's answer.
///
/// # Errors
///
/// Returns `DomainError::InvalidSelection` if the answer is rejected, or if
/// the prompting effect is no longer in play. The pending resolution remains
/// valid and may be resumed again.
pub fn resume(
    pending: &PendingResolution,
    answer: &UiAnswer,
    state: &GameState,
    catalog: &Catalog,
) -> Result<PipelineOutcome, DomainError> {
    let (ctx, handler) = locate(&pending.handler, state, catalog).ok_or_else(|| {
        DomainError::InvalidSelection(format!(
            "effect {} on player {} is no longer in play",
            pending.handler.effect_type, pending.handler.player_id
        ))
    })?;

    let result = match handler.resume {
        Some(resume_fn) => match resume_fn(&pending.intent, &ctx, answer) {
            Ok(result) => result,
            Err(ContentError::InvalidSelection(reason)) => {
                return Err(DomainError::InvalidSelection(reason));
            }
            Err(e) => {
                warn!(
                    effect = %pending.handler.effect_type,
                    player = %pending.handler.player_id,
                    error = %e,
                    "resume failed; allowing"
                );
                HandlerResult::allow()
            }
        },
        None => {
            warn!(
                effect = %pending.handler.effect_type,
                "handler raised a prompt but cannot resume; allowing"
            );
            HandlerResult::allow()
        }
    };

    let mut walk = Walk {
        state,
        catalog,
        intent: pending.intent.clone(),
        queue: pending.remaining.iter().cloned().collect(),
        changes: pending.changes.clone(),
    };
    if let Some(outcome) = walk.absorb(&pending.handler, result) {
        return Ok(outcome);
    }
    Ok(walk.run())
}

/// Collects the handlers matching an intent, in resolution order. With
/// `after`, only handlers sorting strictly after that key are kept.
#[must_use]
pub fn collect_handlers(
    intent: &Intent,
    state: &GameState,
    catalog: &Catalog,
    after: Option<HandlerKey>,
) -> Vec<HandlerRef> {
    let mut refs = Vec::new();
    for (seat, owner) in state.players.iter().enumerate() {
        for (effect_index, instance) in owner.effects.iter().enumerate() {
            let Some(def) = catalog.effects().definition_of(instance) else {
                continue;
            };
            let ctx = HandlerContext {
                owner,
                instance,
                state,
                catalog,
            };
            for (handler_index, handler) in def.handlers.iter().enumerate() {
                if handler.intent != intent.kind() || !(handler.applies_to)(intent, &ctx) {
                    continue;
                }
                let key = HandlerKey {
                    priority: handler.priority,
                    seat,
                    effect_index,
                    handler_index,
                };
                if after.is_some_and(|cursor| key <= cursor) {
                    continue;
                }
                refs.push(HandlerRef {
                    key,
                    player_id: owner.id,
                    effect_type: instance.effect_type.clone(),
                });
            }
        }
    }
    refs.sort_by_key(|r| r.key);
    refs
}

/// The changes an allowed intent makes on its own.
///
/// Kills and executions record their own `death` / `execution` entries.
/// Nominations and applied effects are documented by the caller, which knows
/// who proposed them.
#[must_use]
pub fn default_changes(intent: &Intent, state: &GameState) -> StateChanges {
    match intent {
        Intent::Kill {
            target_id, cause, ..
        } => {
            if !state.player(*target_id).is_some_and(|p| p.is_alive()) {
                return StateChanges::new();
            }
            StateChanges::new()
                .entry(EntryDraft::new(
                    EntryPayload::Death {
                        player_id: *target_id,
                        cause: *cause,
                    },
                    Message::key("log.death").player(*target_id),
                ))
                .add_effect(*target_id, EffectInstance::new(EffectId::dead()))
        }
        Intent::Execute { player_id } => {
            let changes = StateChanges::new().entry(EntryDraft::new(
                EntryPayload::Execution {
                    player_id: *player_id,
                },
                Message::key("log.execution").player(*player_id),
            ));
            if state.player(*player_id).is_some_and(|p| p.is_alive()) {
                changes.add_effect(*player_id, EffectInstance::new(EffectId::dead()))
            } else {
                changes
            }
        }
        Intent::Nominate { nominee_id, .. } => StateChanges::new()
            .patch(StatePatch::phase(Phase::Voting).with_nominee(Some(*nominee_id))),
        Intent::ApplyEffect {
            target_id, effect, ..
        } => StateChanges::new().add_effect(*target_id, effect.clone()),
    }
}

/// Re-finds a collected handler in the current state. Returns `None` if the
/// owner, the instance or the handler is gone.
fn locate<'a>(
    handler: &HandlerRef,
    state: &'a GameState,
    catalog: &'a Catalog,
) -> Option<(HandlerContext<'a>, &'a IntentHandler)> {
    let owner = state
        .players
        .get(handler.key.seat)
        .filter(|p| p.id == handler.player_id)?;
    let instance = owner
        .effects
        .get(handler.key.effect_index)
        .filter(|e| e.effect_type == handler.effect_type)?;
    let def = catalog.effects().definition_of(instance)?;
    let intent_handler = def.handlers.get(handler.key.handler_index)?;
    Some((
        HandlerContext {
            owner,
            instance,
            state,
            catalog,
        },
        intent_handler,
    ))
}

struct Walk<'a> {
    state: &'a GameState,
    catalog: &'a Catalog,
    intent: Intent,
    queue: VecDeque<HandlerRef>,
    changes: StateChanges,
}

impl Walk<'_> {
    fn run(mut self) -> PipelineOutcome {
        while let Some(handler_ref) = self.queue.pop_front() {
            let Some((ctx, handler)) = locate(&handler_ref, self.state, self.catalog) else {
                warn!(effect = %handler_ref.effect_type, player = %handler_ref.player_id, "stale handler skipped");
                continue;
            };
            // A redirect may have made a queued handler irrelevant.
            if handler.intent != self.intent.kind() || !(handler.applies_to)(&self.intent, &ctx) {
                continue;
            }
            debug!(
                effect = %handler_ref.effect_type,
                player = %handler_ref.player_id,
                priority = handler_ref.key.priority,
                "running handler"
            );
            let result = match (handler.handle)(&self.intent, &ctx) {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        effect = %handler_ref.effect_type,
                        player = %handler_ref.player_id,
                        error = %e,
                        "handler failed; allowing"
                    );
                    HandlerResult::allow()
                }
            };
            if let Some(outcome) = self.absorb(&handler_ref, result) {
                return outcome;
            }
        }
        PipelineOutcome::Allow {
            intent: self.intent,
            changes: self.changes,
        }
    }

    /// Folds one handler result into the walk. Returns the final outcome if
    /// the walk stops here.
    fn absorb(&mut self, handler: &HandlerRef, result: HandlerResult) -> Option<PipelineOutcome> {
        match result {
            HandlerResult::Allow(changes) => {
                self.merge(changes);
                None
            }
            HandlerResult::Prevent { reason, changes } => {
                self.merge(changes);
                debug!(effect = %handler.effect_type, %reason, "intent prevented");
                Some(PipelineOutcome::Prevent {
                    reason,
                    changes: std::mem::take(&mut self.changes),
                })
            }
            HandlerResult::Redirect { intent, changes } => {
                self.merge(changes);
                debug!(
                    effect = %handler.effect_type,
                    from = %self.intent.target(),
                    to = %intent.target(),
                    "intent redirected"
                );
                self.queue = collect_handlers(&intent, self.state, self.catalog, Some(handler.key))
                    .into();
                self.intent = intent;
                None
            }
            HandlerResult::RequestUi(request) => {
                debug!(effect = %handler.effect_type, component = %request.component, "awaiting operator");
                Some(PipelineOutcome::RequestUi(Box::new(PendingResolution {
                    intent: self.intent.clone(),
                    handler: handler.clone(),
                    changes: std::mem::take(&mut self.changes),
                    remaining: self.queue.drain(..).collect(),
                    request,
                })))
            }
        }
    }

    fn merge(&mut self, later: StateChanges) {
        self.changes = std::mem::take(&mut self.changes).merge(later);
    }
}

#[cfg(test)]
mod tests {
    use grimoire_log::domain::changes::FieldUpdate;
    use grimoire_log::domain::game::Game;
    use grimoire_log::domain::history::{ActionResult, KillCause};
    use grimoire_log::domain::state::{PlayerState, Team};
    use grimoire_test_support::FixedClock;
    use serde_json::Value;

    use super::*;
    use crate::domain::definitions::{EffectDefinition, RoleDefinition, targets_owner};
    use crate::domain::intents::IntentKind;

    fn clock() -> FixedClock {
        FixedClock(
            chrono::DateTime::parse_from_rfc3339("2026-01-15T22:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        )
    }

    fn always(_intent: &Intent, _ctx: &HandlerContext<'_>) -> bool {
        true
    }

    fn marker(key: &str, player: Uuid) -> StateChanges {
        StateChanges::new().entry(EntryDraft::new(
            EntryPayload::NightAction {
                actor_id: Some(player),
                target_id: None,
                result: ActionResult::Succeeded,
            },
            Message::key(key),
        ))
    }

    fn redirect_target(instance: &EffectInstance) -> Result<Uuid, ContentError> {
        instance
            .data_value("to")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| ContentError::MalformedData {
                effect: instance.effect_type.clone(),
                reason: "missing redirect target".to_owned(),
            })
    }

    fn redirect(intent: &Intent, ctx: &HandlerContext<'_>) -> Result<HandlerResult, ContentError> {
        let to = redirect_target(ctx.instance)?;
        Ok(HandlerResult::Redirect {
            intent: intent.retarget(to),
            changes: marker("test.redirected", ctx.owner.id),
        })
    }

    fn protect(_intent: &Intent, ctx: &HandlerContext<'_>) -> Result<HandlerResult, ContentError> {
        Ok(HandlerResult::prevent("protected", marker("test.protected", ctx.owner.id)))
    }

    fn watch(_intent: &Intent, ctx: &HandlerContext<'_>) -> Result<HandlerResult, ContentError> {
        Ok(HandlerResult::Allow(marker("test.watched", ctx.owner.id)))
    }

    fn broken(_intent: &Intent, ctx: &HandlerContext<'_>) -> Result<HandlerResult, ContentError> {
        Err(ContentError::UnknownPlayer(ctx.owner.id))
    }

    fn ask(_intent: &Intent, ctx: &HandlerContext<'_>) -> Result<HandlerResult, ContentError> {
        let others = ctx
            .state
            .alive_players()
            .filter(|p| p.id != ctx.owner.id)
            .map(|p| p.id)
            .collect();
        Ok(HandlerResult::RequestUi(
            UiRequest::new("choose_player", Message::key("test.choose")).with_options(others),
        ))
    }

    fn answer_redirect(
        intent: &Intent,
        ctx: &HandlerContext<'_>,
        answer: &UiAnswer,
    ) -> Result<HandlerResult, ContentError> {
        match answer {
            UiAnswer::Players(ids) if ids.len() == 1 && ctx.state.player(ids[0]).is_some() => {
                Ok(HandlerResult::Redirect {
                    intent: intent.retarget(ids[0]),
                    changes: StateChanges::new(),
                })
            }
            UiAnswer::Confirm(false) => Ok(HandlerResult::allow()),
            _ => Err(ContentError::InvalidSelection("pick one seated player".to_owned())),
        }
    }

    fn catalog() -> Catalog {
        Catalog::builder()
            .effect(EffectDefinition::new(EffectId::DEAD))
            .effect(EffectDefinition::new("redirect").handler(IntentHandler::new(
                IntentKind::Kill,
                5,
                targets_owner,
                redirect,
            )))
            .effect(EffectDefinition::new("safe").handler(IntentHandler::new(
                IntentKind::Kill,
                10,
                targets_owner,
                protect,
            )))
            .effect(EffectDefinition::new("guard").handler(IntentHandler::new(
                IntentKind::Kill,
                5,
                targets_owner,
                protect,
            )))
            .effect(EffectDefinition::new("watcher").handler(IntentHandler::new(
                IntentKind::Kill,
                20,
                always,
                watch,
            )))
            .effect(EffectDefinition::new("broken").handler(IntentHandler::new(
                IntentKind::Kill,
                1,
                always,
                broken,
            )))
            .effect(
                EffectDefinition::new("bounce").handler(
                    IntentHandler::new(IntentKind::Kill, 3, targets_owner, ask)
                        .with_resume(answer_redirect),
                ),
            )
            .role(RoleDefinition::new("villager", Team::Townsfolk))
            .build()
            .unwrap()
    }

    fn table(n: usize) -> GameState {
        let mut state = GameState::initial();
        state.players = (0..n)
            .map(|i| PlayerState::new(Uuid::new_v4(), format!("P{i}"), "villager"))
            .collect();
        state.phase = Phase::Night;
        state.round = 1;
        state
    }

    fn kill(target: Uuid) -> Intent {
        Intent::Kill {
            source_id: None,
            target_id: target,
            cause: KillCause::Demon,
        }
    }

    fn message_keys(changes: &StateChanges) -> Vec<&str> {
        changes
            .entries
            .iter()
            .filter_map(|e| e.message.translation_key())
            .collect()
    }

    #[test]
    fn test_no_handlers_allows_unchanged_intent() {
        let catalog = catalog();
        let state = table(3);
        let intent = kill(state.players[0].id);

        let outcome = resolve_intent(intent.clone(), &state, &catalog);
        assert_eq!(
            outcome,
            PipelineOutcome::Allow {
                intent,
                changes: StateChanges::new()
            }
        );
    }

    #[test]
    fn test_prevent_short_circuits_later_handlers() {
        let catalog = catalog();
        let mut state = table(3);
        state.players[0].effects.push(EffectInstance::new("safe"));
        state.players[1].effects.push(EffectInstance::new("watcher"));

        let outcome = resolve_intent(kill(state.players[0].id), &state, &catalog);
        let PipelineOutcome::Prevent { reason, changes } = outcome else {
            panic!("expected prevent, got {outcome:?}");
        };
        assert_eq!(reason, "protected");
        assert_eq!(message_keys(&changes), vec!["test.protected"]);
    }

    #[test]
    fn test_allowed_intent_accumulates_changes_in_order() {
        let catalog = catalog();
        let mut state = table(3);
        state.players[2].effects.push(EffectInstance::new("watcher"));
        state.players[1].effects.push(EffectInstance::new("watcher"));

        let outcome = resolve_intent(kill(state.players[0].id), &state, &catalog);
        let PipelineOutcome::Allow { changes, .. } = outcome else {
            panic!("expected allow");
        };
        let actors: Vec<_> = changes
            .entries
            .iter()
            .map(|e| match &e.data {
                EntryPayload::NightAction { actor_id, .. } => *actor_id,
                _ => None,
            })
            .collect();
        assert_eq!(actors, vec![Some(state.players[1].id), Some(state.players[2].id)]);
    }

    #[test]
    fn test_redirect_runs_later_handlers_for_new_target() {
        let catalog = catalog();
        let mut state = table(3);
        let (a, b) = (state.players[0].id, state.players[1].id);
        state.players[0]
            .effects
            .push(EffectInstance::new("redirect").with_data("to", b.to_string()));
        state.players[1].effects.push(EffectInstance::new("safe"));

        let outcome = resolve_intent(kill(a), &state, &catalog);
        let PipelineOutcome::Prevent { changes, .. } = outcome else {
            panic!("expected the new target's protection to prevent");
        };
        assert_eq!(message_keys(&changes), vec!["test.redirected", "test.protected"]);
    }

    #[test]
    fn test_redirect_drops_original_targets_later_handlers() {
        let catalog = catalog();
        let mut state = table(3);
        let (a, c) = (state.players[0].id, state.players[2].id);
        state.players[0]
            .effects
            .push(EffectInstance::new("redirect").with_data("to", c.to_string()));
        state.players[0].effects.push(EffectInstance::new("safe"));

        let outcome = resolve_intent(kill(a), &state, &catalog);
        let PipelineOutcome::Allow { intent, changes } = outcome else {
            panic!("expected allow after redirect");
        };
        assert_eq!(intent.target(), c);
        assert_eq!(message_keys(&changes), vec!["test.redirected"]);
    }

    #[test]
    fn test_redirect_skips_handlers_sorting_before_it() {
        let catalog = catalog();
        let mut state = table(3);
        let (a, b) = (state.players[0].id, state.players[1].id);
        // b's bounce (priority 3) sorts before a's redirect (priority 5).
        state.players[0]
            .effects
            .push(EffectInstance::new("redirect").with_data("to", b.to_string()));
        state.players[1].effects.push(EffectInstance::new("bounce"));

        let outcome = resolve_intent(kill(a), &state, &catalog);
        assert!(matches!(outcome, PipelineOutcome::Allow { intent, .. } if intent.target() == b));
    }

    #[test]
    fn test_redirect_reaches_equal_priority_handler_on_later_seat() {
        let catalog = catalog();
        let mut state = table(3);
        let (a, c) = (state.players[0].id, state.players[2].id);
        state.players[0]
            .effects
            .push(EffectInstance::new("redirect").with_data("to", c.to_string()));
        state.players[2].effects.push(EffectInstance::new("guard"));

        let outcome = resolve_intent(kill(a), &state, &catalog);

        let PipelineOutcome::Prevent { changes, .. } = outcome else {
            panic!("expected the later seat's guard to prevent, got {outcome:?}");
        };
        assert_eq!(message_keys(&changes), vec!["test.redirected", "test.protected"]);
    }

    #[test]
    fn test_redirect_passes_equal_priority_handler_on_earlier_seat() {
        let catalog = catalog();
        let mut state = table(3);
        let (a, c) = (state.players[0].id, state.players[2].id);
        state.players[2]
            .effects
            .push(EffectInstance::new("redirect").with_data("to", a.to_string()));
        state.players[0].effects.push(EffectInstance::new("guard"));

        let outcome = resolve_intent(kill(c), &state, &catalog);

        let PipelineOutcome::Allow { intent, changes } = outcome else {
            panic!("expected the earlier seat's guard to be passed, got {outcome:?}");
        };
        assert_eq!(intent.target(), a);
        assert_eq!(message_keys(&changes), vec!["test.redirected"]);
    }

    #[test]
    fn test_failing_handler_degrades_to_allow() {
        let catalog = catalog();
        let mut state = table(3);
        state.players[2].effects.push(EffectInstance::new("broken"));
        state.players[0].effects.push(EffectInstance::new("safe"));

        let outcome = resolve_intent(kill(state.players[0].id), &state, &catalog);
        assert!(matches!(outcome, PipelineOutcome::Prevent { .. }));
    }

    #[test]
    fn test_handlers_sorted_by_priority_then_seat() {
        let catalog = catalog();
        let mut state = table(3);
        let target = state.players[1].id;
        state.players[2].effects.push(EffectInstance::new("watcher"));
        state.players[1].effects.push(EffectInstance::new("safe"));
        state.players[0].effects.push(EffectInstance::new("watcher"));
        state.players[0].effects.push(EffectInstance::new("broken"));

        let keys: Vec<_> = collect_handlers(&kill(target), &state, &catalog, None)
            .into_iter()
            .map(|r| (r.key.priority, r.key.seat))
            .collect();
        assert_eq!(keys, vec![(1, 0), (10, 1), (20, 0), (20, 2)]);
    }

    #[test]
    fn test_request_ui_then_resume_continues_walk() {
        let catalog = catalog();
        let mut state = table(4);
        let (a, c) = (state.players[0].id, state.players[2].id);
        state.players[0].effects.push(EffectInstance::new("bounce"));
        state.players[2].effects.push(EffectInstance::new("safe"));
        state.players[3].effects.push(EffectInstance::new("watcher"));

        let outcome = resolve_intent(kill(a), &state, &catalog);
        let PipelineOutcome::RequestUi(pending) = outcome else {
            panic!("expected a prompt");
        };
        assert_eq!(pending.request.component, "choose_player");
        assert_eq!(pending.request.options.len(), 3);

        let resumed = resume(&pending, &UiAnswer::Players(vec![c]), &state, &catalog).unwrap();
        let PipelineOutcome::Prevent { changes, .. } = resumed else {
            panic!("expected the bounced kill to be prevented");
        };
        assert_eq!(message_keys(&changes), vec!["test.protected"]);
    }

    #[test]
    fn test_resume_declined_keeps_original_intent() {
        let catalog = catalog();
        let mut state = table(4);
        let a = state.players[0].id;
        state.players[0].effects.push(EffectInstance::new("bounce"));
        state.players[3].effects.push(EffectInstance::new("watcher"));

        let PipelineOutcome::RequestUi(pending) = resolve_intent(kill(a), &state, &catalog) else {
            panic!("expected a prompt");
        };
        let resumed = resume(&pending, &UiAnswer::Confirm(false), &state, &catalog).unwrap();
        let PipelineOutcome::Allow { intent, changes } = resumed else {
            panic!("expected allow");
        };
        assert_eq!(intent.target(), a);
        assert_eq!(message_keys(&changes), vec!["test.watched"]);
    }

    #[test]
    fn test_invalid_answer_is_recoverable() {
        let catalog = catalog();
        let mut state = table(4);
        let a = state.players[0].id;
        state.players[0].effects.push(EffectInstance::new("bounce"));

        let PipelineOutcome::RequestUi(pending) = resolve_intent(kill(a), &state, &catalog) else {
            panic!("expected a prompt");
        };
        let rejected = resume(&pending, &UiAnswer::Players(vec![]), &state, &catalog);
        assert!(matches!(rejected, Err(DomainError::InvalidSelection(_))));

        let accepted = resume(&pending, &UiAnswer::Players(vec![state.players[1].id]), &state, &catalog);
        assert!(accepted.is_ok());
    }

    #[test]
    fn test_pending_resolution_survives_serialization() {
        let catalog = catalog();
        let mut state = table(4);
        let a = state.players[0].id;
        state.players[0].effects.push(EffectInstance::new("bounce"));

        let PipelineOutcome::RequestUi(pending) = resolve_intent(kill(a), &state, &catalog) else {
            panic!("expected a prompt");
        };
        let json = serde_json::to_string(&pending).unwrap();
        let restored: PendingResolution = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, *pending);
    }

    #[test]
    fn test_resume_with_vanished_effect_is_rejected() {
        let catalog = catalog();
        let mut state = table(4);
        let a = state.players[0].id;
        state.players[0].effects.push(EffectInstance::new("bounce"));
        let PipelineOutcome::RequestUi(pending) = resolve_intent(kill(a), &state, &catalog) else {
            panic!("expected a prompt");
        };
        state.players[0].effects.clear();

        let result = resume(&pending, &UiAnswer::Players(vec![state.players[1].id]), &state, &catalog);
        assert!(matches!(result, Err(DomainError::InvalidSelection(_))));
    }

    #[test]
    fn test_allowed_kill_commits_death() {
        let catalog = catalog();
        let state = table(3);
        let target = state.players[1].id;
        let changes = resolve_intent(kill(target), &state, &catalog)
            .into_changes(&state)
            .unwrap();

        let seating = StateChanges::new().patch(StatePatch {
            players: FieldUpdate::Set(state.players.clone()),
            phase: FieldUpdate::Set(Phase::Night),
            ..StatePatch::default()
        });
        let game = Game::new(Uuid::new_v4()).commit(seating, &clock()).unwrap();
        let after = game.commit(changes, &clock()).unwrap();

        assert!(!after.state().players[1].is_alive());
        assert_eq!(after.history().last().unwrap().entry_type(), "death");
    }

    #[test]
    fn test_killing_the_dead_changes_nothing() {
        let mut state = table(3);
        let target = state.players[1].id;
        state.players[1].effects.push(EffectInstance::new(EffectId::dead()));
        assert!(default_changes(&kill(target), &state).is_empty());
    }

    #[test]
    fn test_nomination_opens_voting() {
        let state = table(3);
        let changes = default_changes(
            &Intent::Nominate {
                nominator_id: state.players[0].id,
                nominee_id: state.players[1].id,
            },
            &state,
        );
        assert_eq!(changes.state_updates.phase, FieldUpdate::Set(Phase::Voting));
        assert_eq!(
            changes.state_updates.active_nominee,
            FieldUpdate::Set(Some(state.players[1].id))
        );
    }
}
