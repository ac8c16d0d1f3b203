//! State changes: what a resolved intent or phase step does to a game.
//!
//! [`StateChanges`] is the mergeable batch produced by resolution. When it is
//! committed it splits into the entries to append and a [`StateDelta`] that
//! is recorded on the first of them, so replay is a pure fold of deltas.
//!
//! A delta applies by kind, not by the order its parts were merged in:
//! removals, then role changes, then additions. Within one batch an effect
//! cannot be added and then removed again; that takes two commits.

use std::collections::HashSet;

use grimoire_core::error::DomainError;
use grimoire_core::ids::{EffectId, RoleId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::effects::{EffectInstance, Expiry};
use super::history::EntryDraft;
use super::state::{Alignment, GameState, Phase, PlayerState};

/// A single field update inside a [`StatePatch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum FieldUpdate<T> {
    /// Leave the field as it is.
    #[default]
    Keep,
    /// Replace the field.
    Set(T),
}

impl<T> FieldUpdate<T> {
    /// Returns true for [`FieldUpdate::Keep`].
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    /// Later updates win over earlier ones.
    #[must_use]
    pub fn then(self, later: Self) -> Self {
        match later {
            Self::Keep => self,
            set @ Self::Set(_) => set,
        }
    }

    fn apply_to(&self, field: &mut T)
    where
        T: Clone,
    {
        if let Self::Set(value) = self {
            field.clone_from(value);
        }
    }
}

/// Partial update of the top-level game fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePatch {
    /// Seats the players. Only legal once, during setup.
    #[serde(default, skip_serializing_if = "FieldUpdate::is_keep")]
    pub players: FieldUpdate<Vec<PlayerState>>,
    /// New phase.
    #[serde(default, skip_serializing_if = "FieldUpdate::is_keep")]
    pub phase: FieldUpdate<Phase>,
    /// New round.
    #[serde(default, skip_serializing_if = "FieldUpdate::is_keep")]
    pub round: FieldUpdate<u32>,
    /// New (or cleared) nominee.
    #[serde(default, skip_serializing_if = "FieldUpdate::is_keep")]
    pub active_nominee: FieldUpdate<Option<Uuid>>,
    /// New (or cleared) winner.
    #[serde(default, skip_serializing_if = "FieldUpdate::is_keep")]
    pub winner: FieldUpdate<Option<Alignment>>,
}

impl StatePatch {
    /// A patch that changes the phase.
    #[must_use]
    pub fn phase(phase: Phase) -> Self {
        Self {
            phase: FieldUpdate::Set(phase),
            ..Self::default()
        }
    }

    /// Also sets the round.
    #[must_use]
    pub fn with_round(mut self, round: u32) -> Self {
        self.round = FieldUpdate::Set(round);
        self
    }

    /// Also sets (or clears) the nominee.
    #[must_use]
    pub fn with_nominee(mut self, nominee: Option<Uuid>) -> Self {
        self.active_nominee = FieldUpdate::Set(nominee);
        self
    }

    /// Also sets the winner.
    #[must_use]
    pub fn with_winner(mut self, winner: Alignment) -> Self {
        self.winner = FieldUpdate::Set(Some(winner));
        self
    }

    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_keep()
            && self.phase.is_keep()
            && self.round.is_keep()
            && self.active_nominee.is_keep()
            && self.winner.is_keep()
    }

    /// Field-wise merge; fields set in `later` win.
    #[must_use]
    pub fn merge(self, later: Self) -> Self {
        Self {
            players: self.players.then(later.players),
            phase: self.phase.then(later.phase),
            round: self.round.then(later.round),
            active_nominee: self.active_nominee.then(later.active_nominee),
            winner: self.winner.then(later.winner),
        }
    }
}

/// Places an effect instance on a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectAddition {
    /// The receiving player.
    pub player_id: Uuid,
    /// The instance to append to the player's effects.
    pub effect: EffectInstance,
}

/// Takes effect instances off players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "remove", rename_all = "snake_case")]
pub enum EffectRemoval {
    /// The `occurrence`-th (zero-based) instance of a type on one player.
    Instance {
        /// The player holding the instance.
        player_id: Uuid,
        /// The effect type.
        effect_type: EffectId,
        /// Which of the player's instances of that type.
        occurrence: usize,
    },
    /// Every instance of a type on one player.
    AllOfType {
        /// The player holding the instances.
        player_id: Uuid,
        /// The effect type.
        effect_type: EffectId,
    },
    /// Every instance, on every player, with the given expiry.
    Expired {
        /// The expiry being swept.
        expiry: Expiry,
    },
}

/// Replaces a player's role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleChange {
    /// The affected player.
    pub player_id: Uuid,
    /// The new role.
    pub role_id: RoleId,
}

/// The state-affecting part of a batch, as recorded on a history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    /// Instances to add.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_effects: Vec<EffectAddition>,
    /// Instances to remove.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_effects: Vec<EffectRemoval>,
    /// Role replacements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub change_roles: Vec<RoleChange>,
    /// Top-level field updates.
    #[serde(default, skip_serializing_if = "StatePatch::is_empty")]
    pub state_updates: StatePatch,
}

impl StateDelta {
    /// Returns true if applying the delta changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add_effects.is_empty()
            && self.remove_effects.is_empty()
            && self.change_roles.is_empty()
            && self.state_updates.is_empty()
    }

    /// Applies the delta to a state, producing the next state.
    ///
    /// Order: seating, removals, role changes, additions, remaining fields.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvariantViolation` if the delta references a
    /// player or instance that does not exist, reseats a started game,
    /// repeats a player id, or leaves the `ended` phase.
    pub fn apply(&self, state: &GameState) -> Result<GameState, DomainError> {
        let mut next = state.clone();
        let patch = &self.state_updates;

        if let FieldUpdate::Set(players) = &patch.players {
            if state.phase != Phase::Setup || !state.players.is_empty() {
                return Err(DomainError::InvariantViolation(
                    "players can only be seated once, during setup".to_owned(),
                ));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = players.iter().find(|p| !seen.insert(p.id)) {
                return Err(DomainError::InvariantViolation(format!(
                    "player {} is seated twice",
                    dup.id
                )));
            }
            next.players.clone_from(players);
        }

        for removal in &self.remove_effects {
            apply_removal(&mut next, removal)?;
        }

        for change in &self.change_roles {
            player_mut(&mut next, change.player_id)?.role_id = change.role_id.clone();
        }

        for addition in &self.add_effects {
            player_mut(&mut next, addition.player_id)?
                .effects
                .push(addition.effect.clone());
        }

        if let FieldUpdate::Set(phase) = patch.phase {
            if state.phase == Phase::Ended && phase != Phase::Ended {
                return Err(DomainError::InvariantViolation(format!(
                    "an ended game cannot move to {phase}"
                )));
            }
        }
        if let FieldUpdate::Set(Some(nominee)) = patch.active_nominee {
            if next.player(nominee).is_none() {
                return Err(DomainError::InvariantViolation(format!(
                    "nominee {nominee} is not seated"
                )));
            }
        }

        patch.phase.apply_to(&mut next.phase);
        patch.round.apply_to(&mut next.round);
        patch.active_nominee.apply_to(&mut next.active_nominee);
        patch.winner.apply_to(&mut next.winner);

        Ok(next)
    }

    /// Concatenates two deltas. Each kind of change keeps `self`'s items
    /// before `later`'s, but [`StateDelta::apply`] still runs every removal
    /// before any addition, whichever delta they came from.
    #[must_use]
    pub fn merge(mut self, later: Self) -> Self {
        self.add_effects.extend(later.add_effects);
        self.remove_effects.extend(later.remove_effects);
        self.change_roles.extend(later.change_roles);
        self.state_updates = self.state_updates.merge(later.state_updates);
        self
    }
}

fn player_mut(state: &mut GameState, id: Uuid) -> Result<&mut PlayerState, DomainError> {
    state
        .players
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| DomainError::InvariantViolation(format!("player {id} is not seated")))
}

fn apply_removal(state: &mut GameState, removal: &EffectRemoval) -> Result<(), DomainError> {
    match removal {
        EffectRemoval::Instance {
            player_id,
            effect_type,
            occurrence,
        } => {
            let player = player_mut(state, *player_id)?;
            let index = player
                .effects_of(effect_type.as_str())
                .nth(*occurrence)
                .map(|(index, _)| index)
                .ok_or_else(|| {
                    DomainError::InvariantViolation(format!(
                        "player {player_id} has no instance #{occurrence} of {effect_type}"
                    ))
                })?;
            player.effects.remove(index);
        }
        EffectRemoval::AllOfType {
            player_id,
            effect_type,
        } => {
            player_mut(state, *player_id)?
                .effects
                .retain(|e| e.effect_type != *effect_type);
        }
        EffectRemoval::Expired { expiry } => {
            for player in &mut state.players {
                player.effects.retain(|e| e.expires_at != *expiry);
            }
        }
    }
    Ok(())
}

/// A mergeable batch of entries and state changes.
///
/// Batches produced while one intent resolves are merged in the order their
/// handlers ran; merging is associative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateChanges {
    /// Entries to append.
    #[serde(default)]
    pub entries: Vec<EntryDraft>,
    /// Instances to add.
    #[serde(default)]
    pub add_effects: Vec<EffectAddition>,
    /// Instances to remove.
    #[serde(default)]
    pub remove_effects: Vec<EffectRemoval>,
    /// Role replacements.
    #[serde(default)]
    pub change_roles: Vec<RoleChange>,
    /// Top-level field updates.
    #[serde(default)]
    pub state_updates: StatePatch,
}

impl StateChanges {
    /// An empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn entry(mut self, draft: EntryDraft) -> Self {
        self.entries.push(draft);
        self
    }

    /// Adds an effect instance to a player.
    #[must_use]
    pub fn add_effect(mut self, player_id: Uuid, effect: EffectInstance) -> Self {
        self.add_effects.push(EffectAddition { player_id, effect });
        self
    }

    /// Removes effect instances.
    #[must_use]
    pub fn remove_effect(mut self, removal: EffectRemoval) -> Self {
        self.remove_effects.push(removal);
        self
    }

    /// Replaces a player's role.
    #[must_use]
    pub fn change_role(mut self, player_id: Uuid, role_id: impl Into<RoleId>) -> Self {
        self.change_roles.push(RoleChange {
            player_id,
            role_id: role_id.into(),
        });
        self
    }

    /// Merges a patch into the batch's state updates.
    #[must_use]
    pub fn patch(mut self, patch: StatePatch) -> Self {
        self.state_updates = std::mem::take(&mut self.state_updates).merge(patch);
        self
    }

    /// Returns true if the batch has neither entries nor state changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
            && self.add_effects.is_empty()
            && self.remove_effects.is_empty()
            && self.change_roles.is_empty()
            && self.state_updates.is_empty()
    }

    /// Appends `later` after `self`. Entries stay in handler order; the state
    /// changes are grouped by kind and apply as [`StateDelta::apply`]
    /// describes, so a removal in `later` does not see an addition made by
    /// `self`.
    #[must_use]
    pub fn merge(mut self, later: Self) -> Self {
        self.entries.extend(later.entries);
        self.add_effects.extend(later.add_effects);
        self.remove_effects.extend(later.remove_effects);
        self.change_roles.extend(later.change_roles);
        self.state_updates = self.state_updates.merge(later.state_updates);
        self
    }

    /// Splits the batch into its entries and its delta.
    #[must_use]
    pub fn into_parts(self) -> (Vec<EntryDraft>, StateDelta) {
        let delta = StateDelta {
            add_effects: self.add_effects,
            remove_effects: self.remove_effects,
            change_roles: self.change_roles,
            state_updates: self.state_updates,
        };
        (self.entries, delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::EntryPayload;
    use crate::domain::message::Message;

    fn started(n: usize) -> GameState {
        let mut state = GameState::initial();
        state.players = (0..n)
            .map(|i| PlayerState::new(Uuid::new_v4(), format!("p{i}"), "chef"))
            .collect();
        state.phase = Phase::Night;
        state.round = 1;
        state
    }

    fn note(key: &str) -> EntryDraft {
        EntryDraft::new(EntryPayload::StateAdjusted, Message::key(key))
    }

    #[test]
    fn test_merge_is_associative() {
        let id = Uuid::new_v4();
        let a = StateChanges::new()
            .entry(note("a"))
            .add_effect(id, EffectInstance::new("safe"))
            .patch(StatePatch::phase(Phase::Day));
        let b = StateChanges::new()
            .entry(note("b"))
            .change_role(id, "imp")
            .patch(StatePatch::default().with_round(3));
        let c = StateChanges::new()
            .entry(note("c"))
            .remove_effect(EffectRemoval::Expired {
                expiry: Expiry::EndOfNight,
            })
            .patch(StatePatch::phase(Phase::Night));

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));
        assert_eq!(left, right);

        let keys: Vec<_> = left
            .entries
            .iter()
            .filter_map(|e| e.message.translation_key())
            .collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(left.state_updates.phase, FieldUpdate::Set(Phase::Night));
        assert_eq!(left.state_updates.round, FieldUpdate::Set(3));
    }

    #[test]
    fn test_merged_batch_applies_removals_before_additions() {
        // Arrange
        let state = started(3);
        let id = state.players[0].id;
        let add = StateChanges::new().add_effect(id, EffectInstance::new("safe"));
        let remove = StateChanges::new().remove_effect(EffectRemoval::AllOfType {
            player_id: id,
            effect_type: EffectId::from("safe"),
        });

        // Act
        let (_, merged) = add.clone().merge(remove.clone()).into_parts();
        let in_one = merged.apply(&state).unwrap();
        let (_, first) = add.into_parts();
        let (_, second) = remove.into_parts();
        let in_two = second.apply(&first.apply(&state).unwrap()).unwrap();

        // Assert
        assert!(in_one.players[0].has_effect("safe"));
        assert!(!in_two.players[0].has_effect("safe"));
    }

    #[test]
    fn test_apply_removes_by_occurrence() {
        let mut state = started(5);
        let id = state.players[0].id;
        state.players[0].effects = vec![
            EffectInstance::new("safe").with_data("n", 1),
            EffectInstance::new("poisoned"),
            EffectInstance::new("safe").with_data("n", 2),
        ];
        let delta = StateDelta {
            remove_effects: vec![EffectRemoval::Instance {
                player_id: id,
                effect_type: EffectId::from("safe"),
                occurrence: 1,
            }],
            ..StateDelta::default()
        };

        let next = delta.apply(&state).unwrap();
        let effects = &next.players[0].effects;
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0].data_value("n"), Some(&serde_json::json!(1)));
        assert!(effects[1].is("poisoned"));
    }

    #[test]
    fn test_apply_expiry_sweep_only_touches_matching_instances() {
        let mut state = started(5);
        state.players[0].effects = vec![
            EffectInstance::new("safe").expiring(Expiry::EndOfNight),
            EffectInstance::new("poisoned").expiring(Expiry::EndOfDay),
        ];
        state.players[3].effects = vec![
            EffectInstance::new("safe_from_demon"),
            EffectInstance::new("safe").expiring(Expiry::EndOfNight),
        ];
        let delta = StateDelta {
            remove_effects: vec![EffectRemoval::Expired {
                expiry: Expiry::EndOfNight,
            }],
            ..StateDelta::default()
        };

        let next = delta.apply(&state).unwrap();
        assert_eq!(next.players[0].effects.len(), 1);
        assert!(next.players[0].effects[0].is("poisoned"));
        assert_eq!(next.players[3].effects.len(), 1);
        assert!(next.players[3].effects[0].is("safe_from_demon"));
    }

    #[test]
    fn test_apply_unknown_player_is_invariant_violation() {
        let state = started(5);
        let delta = StateDelta {
            add_effects: vec![EffectAddition {
                player_id: Uuid::new_v4(),
                effect: EffectInstance::new("safe"),
            }],
            ..StateDelta::default()
        };

        match delta.apply(&state) {
            Err(DomainError::InvariantViolation(msg)) => assert!(msg.contains("not seated")),
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_rejects_reseating_started_game() {
        let state = started(5);
        let delta = StateDelta {
            state_updates: StatePatch {
                players: FieldUpdate::Set(Vec::new()),
                ..StatePatch::default()
            },
            ..StateDelta::default()
        };
        assert!(matches!(
            delta.apply(&state),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_apply_rejects_leaving_ended_phase() {
        let mut state = started(5);
        state.phase = Phase::Ended;
        let delta = StateDelta {
            state_updates: StatePatch::phase(Phase::Day),
            ..StateDelta::default()
        };
        assert!(matches!(
            delta.apply(&state),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_patch_clearing_nominee_survives_serde() {
        let patch = StatePatch::phase(Phase::Day).with_nominee(None);
        let json = serde_json::to_value(&patch).unwrap();
        let back: StatePatch = serde_json::from_value(json).unwrap();
        assert_eq!(back, patch);
        assert_eq!(back.active_nominee, FieldUpdate::Set(None));
    }
}
