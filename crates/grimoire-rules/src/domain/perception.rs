//! Perception: what a player appears to be to another player.
//!
//! The true role, team and alignment of a target are folded through the
//! perception modifiers of the target's effects, in effect order. Effects that
//! leave the answer to the operator store the operator's choice on the
//! instance under [`PERCEIVE_AS_KEY`].

use std::collections::BTreeMap;

use grimoire_core::error::DomainError;
use grimoire_core::ids::RoleId;
use grimoire_log::domain::effects::EffectInstance;
use grimoire_log::domain::state::{Alignment, GameState, PlayerState, Team};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::catalog::Catalog;
use super::definitions::{ModifierContext, RegistrationRange};
use super::errors::ContentError;

/// Instance data key holding the operator's registration choice.
pub const PERCEIVE_AS_KEY: &str = "perceive_as";

/// A facet of a player that abilities read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    /// The role.
    Role,
    /// The character type.
    Team,
    /// The side.
    Alignment,
}

/// What a player appears to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perception {
    /// Apparent role.
    pub role_id: RoleId,
    /// Apparent team.
    pub team: Team,
    /// Apparent alignment.
    pub alignment: Alignment,
}

/// An operator's registration choice. Unset fields keep the incoming value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialPerception {
    /// Role to register as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<RoleId>,
    /// Team to register as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    /// Alignment to register as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
}

impl PartialPerception {
    /// Registers as a team.
    #[must_use]
    pub fn team(team: Team) -> Self {
        Self {
            team: Some(team),
            ..Self::default()
        }
    }

    /// Registers as an alignment.
    #[must_use]
    pub fn alignment(alignment: Alignment) -> Self {
        Self {
            alignment: Some(alignment),
            ..Self::default()
        }
    }

    /// Returns true if the choice sets the field read by `aspect`.
    #[must_use]
    pub fn covers(&self, aspect: Aspect) -> bool {
        match aspect {
            Aspect::Role => self.role_id.is_some(),
            Aspect::Team => self.team.is_some(),
            Aspect::Alignment => self.alignment.is_some(),
        }
    }

    /// Returns a copy with the fields set in `later` replaced.
    #[must_use]
    pub fn overlay(mut self, later: &Self) -> Self {
        if later.role_id.is_some() {
            self.role_id.clone_from(&later.role_id);
        }
        if later.team.is_some() {
            self.team = later.team;
        }
        if later.alignment.is_some() {
            self.alignment = later.alignment;
        }
        self
    }

    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.role_id.is_none() && self.team.is_none() && self.alignment.is_none()
    }
}

/// The true perception of a player: their role, its team and alignment.
///
/// # Errors
///
/// Returns `DomainError::UnknownRole` if the player's role is not registered.
pub fn baseline(target: &PlayerState, catalog: &Catalog) -> Result<Perception, DomainError> {
    let role = catalog.role(&target.role_id)?;
    Ok(Perception {
        role_id: role.id.clone(),
        team: role.team,
        alignment: role.alignment(),
    })
}

/// Computes what `target` appears to be to `observer` for one aspect.
///
/// Modifiers run in the order of the target's effects, then in declaration
/// order within each effect. A modifier that fails is skipped.
///
/// # Errors
///
/// Returns `DomainError::UnknownRole` if the target's role is not registered.
pub fn perceive(
    target: &PlayerState,
    observer: &PlayerState,
    aspect: Aspect,
    state: &GameState,
    catalog: &Catalog,
) -> Result<Perception, DomainError> {
    let mut perception = baseline(target, catalog)?;
    for instance in &target.effects {
        let Some(def) = catalog.effects().definition_of(instance) else {
            continue;
        };
        for modifier in &def.perception_modifiers {
            if !modifier.affects(aspect, observer) {
                continue;
            }
            let ctx = ModifierContext {
                target,
                observer,
                instance,
                aspect,
                state,
                catalog,
            };
            match (modifier.modify)(perception.clone(), &ctx) {
                Ok(next) => perception = next,
                Err(e) => warn!(
                    effect = %instance.effect_type,
                    target = %target.id,
                    error = %e,
                    "perception modifier failed; ignoring"
                ),
            }
        }
    }
    Ok(perception)
}

/// Reads the operator's registration choice stored on an instance.
///
/// # Errors
///
/// Returns `ContentError::MalformedData` if the stored value is not a valid
/// choice.
pub fn configured_override(
    instance: &EffectInstance,
) -> Result<Option<PartialPerception>, ContentError> {
    let Some(value) = instance.data_value(PERCEIVE_AS_KEY) else {
        return Ok(None);
    };
    serde_json::from_value(value.clone())
        .map(Some)
        .map_err(|e| ContentError::MalformedData {
            effect: instance.effect_type.clone(),
            reason: e.to_string(),
        })
}

/// Modifier that applies the operator's stored registration choice.
///
/// A chosen role brings its team and alignment along unless those were
/// chosen too.
///
/// # Errors
///
/// Returns `ContentError::MalformedData` if the stored choice is malformed.
pub fn apply_configured_override(
    perception: Perception,
    ctx: &ModifierContext<'_>,
) -> Result<Perception, ContentError> {
    let Some(choice) = configured_override(ctx.instance)? else {
        return Ok(perception);
    };
    let mut next = perception;
    if let Some(role_id) = choice.role_id {
        if let Some(role) = ctx.catalog.roles().get(&role_id) {
            next.team = role.team;
            next.alignment = role.alignment();
        }
        next.role_id = role_id;
    }
    if let Some(team) = choice.team {
        next.team = team;
    }
    if let Some(alignment) = choice.alignment {
        next.alignment = alignment;
    }
    Ok(next)
}

fn registration_ranges<'a>(
    player: &'a PlayerState,
    catalog: &'a Catalog,
) -> impl Iterator<Item = &'a RegistrationRange> + 'a {
    player
        .effects
        .iter()
        .filter_map(|instance| catalog.effects().definition_of(instance))
        .filter_map(|def| def.can_register_as.as_ref())
}

/// Returns true if one of the player's effects lets them register as `team`.
/// The player's own team does not count.
#[must_use]
pub fn can_register_as_team(player: &PlayerState, team: Team, catalog: &Catalog) -> bool {
    registration_ranges(player, catalog).any(|range| range.teams.contains(&team))
}

/// Returns true if one of the player's effects lets them register as
/// `alignment`. The player's own alignment does not count.
#[must_use]
pub fn can_register_as_alignment(
    player: &PlayerState,
    alignment: Alignment,
    catalog: &Catalog,
) -> bool {
    registration_ranges(player, catalog).any(|range| range.alignments.contains(&alignment))
}

/// Returns true if `range` leaves `aspect` open and the instance holds no
/// choice for it. A malformed stored choice counts as no choice.
#[must_use]
pub fn awaits_choice(instance: &EffectInstance, range: &RegistrationRange, aspect: Aspect) -> bool {
    if !range.covers(aspect) {
        return false;
    }
    match configured_override(instance) {
        Ok(choice) => !choice.is_some_and(|c| c.covers(aspect)),
        Err(e) => {
            warn!(effect = instance.effect_type.as_str(), error = %e, "unreadable registration choice");
            true
        }
    }
}

/// Returns true once no aspect of `range` awaits a choice on the instance.
#[must_use]
pub fn is_configured(instance: &EffectInstance, range: &RegistrationRange) -> bool {
    [Aspect::Role, Aspect::Team, Aspect::Alignment]
        .into_iter()
        .all(|aspect| !awaits_choice(instance, range, aspect))
}

/// Players whose appearance for `aspect` is left to the operator and not yet
/// chosen.
pub fn ambiguous_players<'a>(
    players: &'a [PlayerState],
    aspect: Aspect,
    catalog: &Catalog,
) -> Vec<&'a PlayerState> {
    players
        .iter()
        .filter(|player| {
            player.effects.iter().any(|instance| {
                let Some(range) = catalog
                    .effects()
                    .definition_of(instance)
                    .and_then(|def| def.can_register_as.as_ref())
                else {
                    return false;
                };
                let open = awaits_choice(instance, range, aspect);
                if open {
                    debug!(player = %player.id, ?aspect, "registration left to the operator");
                }
                open
            })
        })
        .collect()
}

/// Stores the operator's registration choices on every instance able to
/// honour them, on top of any earlier choice. Choices for unknown players, and choices no instance covers,
/// are dropped. An empty map returns the state unchanged.
#[must_use]
pub fn apply_perception_overrides(
    state: &GameState,
    overrides: &BTreeMap<Uuid, PartialPerception>,
    catalog: &Catalog,
) -> GameState {
    let mut next = state.clone();
    for (player_id, choice) in overrides {
        if choice.is_empty() {
            continue;
        }
        let Some(player) = next.players.iter_mut().find(|p| p.id == *player_id) else {
            warn!(player = %player_id, "registration choice for unseated player dropped");
            continue;
        };
        let mut stored = false;
        for instance in &mut player.effects {
            let Some(range) = catalog
                .effects()
                .definition_of(instance)
                .and_then(|def| def.can_register_as.as_ref())
            else {
                continue;
            };
            let relevant = [Aspect::Role, Aspect::Team, Aspect::Alignment]
                .into_iter()
                .any(|aspect| choice.covers(aspect) && range.covers(aspect));
            if !relevant {
                continue;
            }
            let merged = configured_override(instance)
                .ok()
                .flatten()
                .unwrap_or_default()
                .overlay(choice);
            match serde_json::to_value(&merged) {
                Ok(value) => {
                    instance.data.insert(PERCEIVE_AS_KEY.to_owned(), value);
                    stored = true;
                }
                Err(e) => warn!(error = %e, "registration choice not serializable"),
            }
        }
        if !stored {
            debug!(player = %player_id, "no effect can honour registration choice");
        }
    }
    next
}
