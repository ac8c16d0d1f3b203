//! Projected game state.

use std::fmt;

use grimoire_core::ids::{EffectId, RoleId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::effects::EffectInstance;

/// Game phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Seats are being filled; no night has started.
    Setup,
    /// Roles wake in night order.
    Night,
    /// Discussion and nominations.
    Day,
    /// A nomination is open and ballots are being collected.
    Voting,
    /// A winner has been declared.
    Ended,
}

impl Phase {
    /// Returns the phase name used in logs and views.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Night => "night",
            Self::Day => "day",
            Self::Voting => "voting",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Character type of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Good, usually helpful.
    Townsfolk,
    /// Good, usually harmful to good.
    Outsider,
    /// Evil supporter.
    Minion,
    /// Evil killer.
    Demon,
}

impl Team {
    /// The side a team plays for.
    #[must_use]
    pub fn alignment(self) -> Alignment {
        match self {
            Self::Townsfolk | Self::Outsider => Alignment::Good,
            Self::Minion | Self::Demon => Alignment::Evil,
        }
    }
}

/// Side of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// The town.
    Good,
    /// The demon and minions.
    Evil,
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Good => "good",
            Self::Evil => "evil",
        })
    }
}

/// A seated player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Player identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Current role.
    pub role_id: RoleId,
    /// Effect instances, in the order they were added.
    pub effects: Vec<EffectInstance>,
}

impl PlayerState {
    /// Creates a player with no effects.
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>, role_id: impl Into<RoleId>) -> Self {
        Self {
            id,
            name: name.into(),
            role_id: role_id.into(),
            effects: Vec::new(),
        }
    }

    /// A player is alive until a `dead` effect is placed on them.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.has_effect(EffectId::DEAD)
    }

    /// Returns true if any instance of the effect is present.
    #[must_use]
    pub fn has_effect(&self, effect_type: &str) -> bool {
        self.effects.iter().any(|e| e.is(effect_type))
    }

    /// Returns `(index, instance)` for every instance of the effect.
    pub fn effects_of<'a>(
        &'a self,
        effect_type: &'a str,
    ) -> impl Iterator<Item = (usize, &'a EffectInstance)> + 'a {
        self.effects
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.is(effect_type))
    }
}

/// The state of a game at one point of its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Players in seating order. Fixed once the game starts.
    pub players: Vec<PlayerState>,
    /// Current phase.
    pub phase: Phase,
    /// Night/day counter; the first night is round 1.
    pub round: u32,
    /// The player currently up for execution, while voting.
    pub active_nominee: Option<Uuid>,
    /// The winning side, once the game has ended.
    pub winner: Option<Alignment>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial()
    }
}

impl GameState {
    /// The state of a game with an empty log.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            players: Vec::new(),
            phase: Phase::Setup,
            round: 0,
            active_nominee: None,
            winner: None,
        }
    }

    /// Looks up a player by id.
    #[must_use]
    pub fn player(&self, id: Uuid) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Returns the seat index of a player.
    #[must_use]
    pub fn seat_of(&self, id: Uuid) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// Living players, in seating order.
    pub fn alive_players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.iter().filter(|p| p.is_alive())
    }

    /// Number of living players.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }

    /// The closest living players on either side of a seat, skipping the dead.
    ///
    /// Returns `None` if the player is unknown or fewer than two other
    /// players are alive.
    #[must_use]
    pub fn alive_neighbors(&self, id: Uuid) -> Option<(&PlayerState, &PlayerState)> {
        let seat = self.seat_of(id)?;
        let n = self.players.len();
        let living_others = self
            .players
            .iter()
            .filter(|p| p.id != id && p.is_alive())
            .count();
        if living_others < 2 {
            return None;
        }
        let left = (1..n)
            .map(|step| &self.players[(seat + n - step) % n])
            .find(|p| p.is_alive())?;
        let right = (1..n)
            .map(|step| &self.players[(seat + step) % n])
            .find(|p| p.is_alive())?;
        Some((left, right))
    }
}
