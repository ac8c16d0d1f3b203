//! Content definitions: effects, roles and the functions they contribute.
//!
//! Definitions are plain data holding function pointers. They are built once
//! into a [`Catalog`](super::catalog::Catalog) and never mutated afterwards.

use grimoire_core::ids::{EffectId, RoleId};
use grimoire_log::domain::changes::StateChanges;
use grimoire_log::domain::effects::EffectInstance;
use grimoire_log::domain::game::Game;
use grimoire_log::domain::message::Message;
use grimoire_log::domain::state::{Alignment, GameState, PlayerState, Team};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::catalog::Catalog;
use super::errors::ContentError;
use super::intents::{Intent, IntentKind};
use super::perception::{Aspect, Perception};

/// What a handler sees when it is asked about an intent.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    /// The player holding the effect instance.
    pub owner: &'a PlayerState,
    /// The instance whose handler is running.
    pub instance: &'a EffectInstance,
    /// The state the intent is resolved against.
    pub state: &'a GameState,
    /// The content catalog.
    pub catalog: &'a Catalog,
}

/// A question for the operator raised by a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiRequest {
    /// Name of the prompt the front end should render.
    pub component: String,
    /// Text shown to the operator.
    pub prompt: Message,
    /// Players the operator may pick from, if the prompt is a player choice.
    #[serde(default)]
    pub options: Vec<Uuid>,
    /// Extra, prompt-specific data.
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl UiRequest {
    /// A prompt with no options.
    #[must_use]
    pub fn new(component: impl Into<String>, prompt: Message) -> Self {
        Self {
            component: component.into(),
            prompt,
            options: Vec::new(),
            payload: Map::new(),
        }
    }

    /// Sets the selectable players.
    #[must_use]
    pub fn with_options(mut self, options: Vec<Uuid>) -> Self {
        self.options = options;
        self
    }
}

/// The operator's answer to a [`UiRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "answer", content = "value", rename_all = "snake_case")]
pub enum UiAnswer {
    /// One or more players were picked.
    Players(Vec<Uuid>),
    /// A role was picked.
    Role(RoleId),
    /// A named option was picked.
    Choice(String),
    /// A yes/no prompt was answered.
    Confirm(bool),
}

/// The outcome of one handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    /// Let the intent proceed, contributing `changes`.
    Allow(StateChanges),
    /// Stop the intent; `changes` are still applied.
    Prevent {
        /// Why the intent was stopped.
        reason: String,
        /// Changes contributed by the handler.
        changes: StateChanges,
    },
    /// Replace the intent and re-run the remaining handlers against it.
    Redirect {
        /// The replacement intent.
        intent: Intent,
        /// Changes contributed by the handler.
        changes: StateChanges,
    },
    /// Pause resolution until the operator answers.
    RequestUi(UiRequest),
}

impl HandlerResult {
    /// Allow with no changes.
    #[must_use]
    pub fn allow() -> Self {
        Self::Allow(StateChanges::new())
    }

    /// Prevent with the given changes.
    #[must_use]
    pub fn prevent(reason: impl Into<String>, changes: StateChanges) -> Self {
        Self::Prevent {
            reason: reason.into(),
            changes,
        }
    }
}

/// Tests whether a handler wants to see an intent.
pub type AppliesToFn = fn(&Intent, &HandlerContext<'_>) -> bool;
/// Handles an intent.
pub type HandleFn = fn(&Intent, &HandlerContext<'_>) -> Result<HandlerResult, ContentError>;
/// Continues a handler after the operator answered its prompt.
pub type ResumeFn =
    fn(&Intent, &HandlerContext<'_>, &UiAnswer) -> Result<HandlerResult, ContentError>;

/// One intent handler contributed by an effect.
#[derive(Debug, Clone, Copy)]
pub struct IntentHandler {
    /// The intent kind this handler reacts to.
    pub intent: IntentKind,
    /// Lower runs earlier.
    pub priority: i32,
    /// Relevance test.
    pub applies_to: AppliesToFn,
    /// The handler itself.
    pub handle: HandleFn,
    /// Continuation for handlers that raise prompts.
    pub resume: Option<ResumeFn>,
}

impl IntentHandler {
    /// Creates a handler without a continuation.
    #[must_use]
    pub fn new(intent: IntentKind, priority: i32, applies_to: AppliesToFn, handle: HandleFn) -> Self {
        Self {
            intent,
            priority,
            applies_to,
            handle,
            resume: None,
        }
    }

    /// Adds the continuation called with the operator's answer.
    #[must_use]
    pub fn with_resume(mut self, resume: ResumeFn) -> Self {
        self.resume = Some(resume);
        self
    }
}

/// Handler predicate: the intent targets the effect's owner.
#[must_use]
pub fn targets_owner(intent: &Intent, ctx: &HandlerContext<'_>) -> bool {
    intent.target() == ctx.owner.id
}

/// What a perception modifier sees.
#[derive(Debug, Clone, Copy)]
pub struct ModifierContext<'a> {
    /// The player being perceived.
    pub target: &'a PlayerState,
    /// The player doing the perceiving.
    pub observer: &'a PlayerState,
    /// The instance contributing the modifier.
    pub instance: &'a EffectInstance,
    /// The aspect being read.
    pub aspect: Aspect,
    /// Current state.
    pub state: &'a GameState,
    /// The content catalog.
    pub catalog: &'a Catalog,
}

/// Rewrites a perception.
pub type ModifyFn = fn(Perception, &ModifierContext<'_>) -> Result<Perception, ContentError>;

/// A perception rewrite contributed by an effect.
#[derive(Debug, Clone)]
pub struct PerceptionModifier {
    /// Aspects the modifier applies to.
    pub aspects: Vec<Aspect>,
    /// If set, only observers holding one of these roles are affected.
    pub observer_roles: Option<Vec<RoleId>>,
    /// The rewrite.
    pub modify: ModifyFn,
}

impl PerceptionModifier {
    /// A modifier for every observer.
    #[must_use]
    pub fn new(aspects: Vec<Aspect>, modify: ModifyFn) -> Self {
        Self {
            aspects,
            observer_roles: None,
            modify,
        }
    }

    /// Restricts the modifier to observers holding one of `roles`.
    #[must_use]
    pub fn for_observers(mut self, roles: Vec<RoleId>) -> Self {
        self.observer_roles = Some(roles);
        self
    }

    /// Returns true if the modifier rewrites `aspect` for `observer`.
    #[must_use]
    pub fn affects(&self, aspect: Aspect, observer: &PlayerState) -> bool {
        self.aspects.contains(&aspect)
            && self
                .observer_roles
                .as_ref()
                .is_none_or(|roles| roles.contains(&observer.role_id))
    }
}

/// The teams and alignments a player may register as, at the operator's
/// choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationRange {
    /// Teams the player may register as.
    pub teams: Vec<Team>,
    /// Alignments the player may register as.
    pub alignments: Vec<Alignment>,
}

impl RegistrationRange {
    /// Returns true if the range leaves `aspect` open to the operator.
    /// Role and team choices both come from `teams`.
    #[must_use]
    pub fn covers(&self, aspect: Aspect) -> bool {
        match aspect {
            Aspect::Role | Aspect::Team => !self.teams.is_empty(),
            Aspect::Alignment => !self.alignments.is_empty(),
        }
    }
}

/// The points in a game at which win conditions are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinTrigger {
    /// After an execution was committed.
    AfterExecution,
    /// After any death was committed.
    AfterDeath,
    /// After a night ended.
    EndOfNight,
    /// After a day ended.
    EndOfDay,
}

/// What a win check sees.
#[derive(Debug, Clone, Copy)]
pub struct WinContext<'a> {
    /// The game as committed so far.
    pub game: &'a Game,
    /// The player holding the role or effect.
    pub owner: &'a PlayerState,
    /// Why the check runs.
    pub trigger: WinTrigger,
    /// The content catalog.
    pub catalog: &'a Catalog,
}

/// Returns the winning side, if the game is won.
pub type WinCheckFn = fn(&WinContext<'_>) -> Option<Alignment>;

/// A win condition contributed by a role or an effect.
#[derive(Debug, Clone)]
pub struct WinCondition {
    /// When the check runs.
    pub triggers: Vec<WinTrigger>,
    /// The check.
    pub check: WinCheckFn,
}

impl WinCondition {
    /// Creates a win condition.
    #[must_use]
    pub fn new(triggers: Vec<WinTrigger>, check: WinCheckFn) -> Self {
        Self { triggers, check }
    }
}

/// Whether the holder may vote.
pub type VoteRestrictionFn = fn(&PlayerState, &GameState) -> bool;
/// Whether a nomination between two players is allowed. Arguments are the
/// nominator, the nominee and the state.
pub type NominationRestrictionFn = fn(&PlayerState, &PlayerState, &GameState) -> bool;

/// Presentation class of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Neutral state marker (e.g. `dead`).
    Status,
    /// Helps the holder.
    Buff,
    /// Hinders the holder.
    Debuff,
    /// Reminder for the operator with no rules of its own.
    Marker,
}

/// An effect definition.
#[derive(Debug, Clone)]
pub struct EffectDefinition {
    /// Effect id.
    pub id: EffectId,
    /// Presentation class.
    pub kind: EffectKind,
    /// Intent handlers.
    pub handlers: Vec<IntentHandler>,
    /// Perception rewrites.
    pub perception_modifiers: Vec<PerceptionModifier>,
    /// Registration choices left to the operator.
    pub can_register_as: Option<RegistrationRange>,
    /// Win conditions.
    pub win_conditions: Vec<WinCondition>,
    /// Voting restriction.
    pub can_vote: Option<VoteRestrictionFn>,
    /// Restriction on the holder nominating.
    pub can_nominate: Option<NominationRestrictionFn>,
    /// Restriction on the holder being nominated.
    pub can_be_nominated: Option<NominationRestrictionFn>,
    /// The holder's ability malfunctions while the effect is present.
    pub poisons_ability: bool,
}

impl EffectDefinition {
    /// A status effect that does nothing.
    #[must_use]
    pub fn new(id: impl Into<EffectId>) -> Self {
        Self {
            id: id.into(),
            kind: EffectKind::Status,
            handlers: Vec::new(),
            perception_modifiers: Vec::new(),
            can_register_as: None,
            win_conditions: Vec::new(),
            can_vote: None,
            can_nominate: None,
            can_be_nominated: None,
            poisons_ability: false,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: EffectKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn handler(mut self, handler: IntentHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    #[must_use]
    pub fn modifier(mut self, modifier: PerceptionModifier) -> Self {
        self.perception_modifiers.push(modifier);
        self
    }

    #[must_use]
    pub fn registers_as(mut self, teams: Vec<Team>, alignments: Vec<Alignment>) -> Self {
        self.can_register_as = Some(RegistrationRange { teams, alignments });
        self
    }

    #[must_use]
    pub fn win_condition(mut self, condition: WinCondition) -> Self {
        self.win_conditions.push(condition);
        self
    }

    #[must_use]
    pub fn restricts_voting(mut self, can_vote: VoteRestrictionFn) -> Self {
        self.can_vote = Some(can_vote);
        self
    }

    #[must_use]
    pub fn restricts_nominating(mut self, can_nominate: NominationRestrictionFn) -> Self {
        self.can_nominate = Some(can_nominate);
        self
    }

    #[must_use]
    pub fn restricts_being_nominated(mut self, can_be_nominated: NominationRestrictionFn) -> Self {
        self.can_be_nominated = Some(can_be_nominated);
        self
    }

    /// Marks the effect as making its holder's ability malfunction.
    #[must_use]
    pub fn poisons(mut self) -> Self {
        self.poisons_ability = true;
        self
    }
}

/// Whether a role wakes tonight.
pub type ShouldWakeFn = fn(&Game, &PlayerState) -> bool;

/// Turns the operator's target choice into the intents a night ability
/// proposes.
pub type AbilityFn = fn(&PlayerState, &[Uuid], &GameState) -> Result<Vec<Intent>, ContentError>;

/// Default wake rule: living players wake.
#[must_use]
pub fn wakes_while_alive(_game: &Game, player: &PlayerState) -> bool {
    player.is_alive()
}

/// A role definition.
#[derive(Debug, Clone)]
pub struct RoleDefinition {
    /// Role id.
    pub id: RoleId,
    /// Character type.
    pub team: Team,
    /// Position in the night order; `None` for roles that never wake.
    pub night_order: Option<u32>,
    /// Whether the holder wakes on a given night.
    pub should_wake: ShouldWakeFn,
    /// Effects placed on the holder when the game starts.
    pub initial_effects: Vec<EffectInstance>,
    /// Win conditions.
    pub win_conditions: Vec<WinCondition>,
    /// Night ability.
    pub ability: Option<AbilityFn>,
}

impl RoleDefinition {
    /// A role that never wakes.
    #[must_use]
    pub fn new(id: impl Into<RoleId>, team: Team) -> Self {
        Self {
            id: id.into(),
            team,
            night_order: None,
            should_wake: wakes_while_alive,
            initial_effects: Vec::new(),
            win_conditions: Vec::new(),
            ability: None,
        }
    }

    /// Sets the night order.
    #[must_use]
    pub fn wakes_at(mut self, order: u32) -> Self {
        self.night_order = Some(order);
        self
    }

    #[must_use]
    pub fn should_wake(mut self, should_wake: ShouldWakeFn) -> Self {
        self.should_wake = should_wake;
        self
    }

    #[must_use]
    pub fn initial_effect(mut self, effect: EffectInstance) -> Self {
        self.initial_effects.push(effect);
        self
    }

    #[must_use]
    pub fn win_condition(mut self, condition: WinCondition) -> Self {
        self.win_conditions.push(condition);
        self
    }

    #[must_use]
    pub fn ability(mut self, ability: AbilityFn) -> Self {
        self.ability = Some(ability);
        self
    }

    /// The side the role plays for.
    #[must_use]
    pub fn alignment(&self) -> Alignment {
        self.team.alignment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_op(_intent: &Intent, _ctx: &HandlerContext<'_>) -> Result<HandlerResult, ContentError> {
        Ok(HandlerResult::allow())
    }

    #[test]
    fn test_registration_range_covers_role_through_teams() {
        let range = RegistrationRange {
            teams: vec![Team::Minion],
            alignments: Vec::new(),
        };
        assert!(range.covers(Aspect::Role));
        assert!(range.covers(Aspect::Team));
        assert!(!range.covers(Aspect::Alignment));
    }

    #[test]
    fn test_modifier_restricted_to_observer_roles() {
        fn identity(p: Perception, _ctx: &ModifierContext<'_>) -> Result<Perception, ContentError> {
            Ok(p)
        }
        let modifier = PerceptionModifier::new(vec![Aspect::Team], identity)
            .for_observers(vec![RoleId::from("empath")]);
        let empath = PlayerState::new(Uuid::new_v4(), "Ada", "empath");
        let chef = PlayerState::new(Uuid::new_v4(), "Ben", "chef");

        assert!(modifier.affects(Aspect::Team, &empath));
        assert!(!modifier.affects(Aspect::Team, &chef));
        assert!(!modifier.affects(Aspect::Role, &empath));
    }

    #[test]
    fn test_effect_definition_builder() {
        let def = EffectDefinition::new("safe")
            .kind(EffectKind::Buff)
            .handler(IntentHandler::new(IntentKind::Kill, 10, targets_owner, no_op));

        assert_eq!(def.id.as_str(), "safe");
        assert_eq!(def.handlers.len(), 1);
        assert_eq!(def.handlers[0].priority, 10);
        assert!(def.handlers[0].resume.is_none());
        assert!(!def.poisons_ability);
    }

    #[test]
    fn test_role_defaults_to_never_waking() {
        let role = RoleDefinition::new("saint", Team::Outsider);
        assert_eq!(role.night_order, None);
        assert_eq!(role.alignment(), Alignment::Good);
    }
}
