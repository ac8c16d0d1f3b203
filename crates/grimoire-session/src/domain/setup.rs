//! Seating players and dealing roles.

use std::collections::HashSet;

use grimoire_core::clock::Clock;
use grimoire_core::error::DomainError;
use grimoire_core::ids::RoleId;
use grimoire_core::rng::DeterministicRng;
use grimoire_log::domain::changes::{FieldUpdate, StateChanges, StatePatch};
use grimoire_log::domain::game::Game;
use grimoire_log::domain::history::{EntryDraft, EntryPayload};
use grimoire_log::domain::message::Message;
use grimoire_log::domain::state::PlayerState;
use grimoire_rules::domain::catalog::Catalog;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Fewest players a game can seat.
pub const MIN_PLAYERS: usize = 5;

/// Most players a game can seat.
pub const MAX_PLAYERS: usize = 20;

/// One seat at the table: who sits there and what they are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAssignment {
    pub name: String,
    pub role_id: RoleId,
}

/// Deals `roles` onto `names`, seat by seat, after a Fisher–Yates shuffle
/// driven by `rng`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the two lists differ in length.
#[allow(clippy::cast_possible_truncation)]
pub fn deal_roles(
    names: Vec<String>,
    mut roles: Vec<RoleId>,
    rng: &mut dyn DeterministicRng,
) -> Result<Vec<SeatAssignment>, DomainError> {
    if names.len() != roles.len() {
        return Err(DomainError::Validation(format!(
            "{} players but {} roles",
            names.len(),
            roles.len()
        )));
    }
    let n = roles.len();
    for i in 0..n.saturating_sub(1) {
        let j = rng.next_u32_range(i as u32, (n - 1) as u32) as usize;
        roles.swap(i, j);
    }
    Ok(names
        .into_iter()
        .zip(roles)
        .map(|(name, role_id)| SeatAssignment { name, role_id })
        .collect())
}

/// Seats the players of a new game and stamps each role's initial effects.
///
/// The game stays in `setup` until the first night begins.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the game already has entries, the
/// player count is outside [`MIN_PLAYERS`]..=[`MAX_PLAYERS`], or a name is
/// empty or repeated, and `DomainError::UnknownRole` for a role missing from
/// the catalog.
pub fn start_game(
    game: &Game,
    seats: &[SeatAssignment],
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<Game, DomainError> {
    if game.version() != 0 {
        return Err(DomainError::Validation(format!(
            "game {} has already started",
            game.id()
        )));
    }
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&seats.len()) {
        return Err(DomainError::Validation(format!(
            "a game needs {MIN_PLAYERS} to {MAX_PLAYERS} players, got {}",
            seats.len()
        )));
    }

    let mut names = HashSet::new();
    let mut players = Vec::with_capacity(seats.len());
    for seat in seats {
        let name = seat.name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "player names cannot be empty".to_owned(),
            ));
        }
        if !names.insert(name.to_owned()) {
            return Err(DomainError::Validation(format!(
                "player name '{name}' is used twice"
            )));
        }
        let role = catalog.role(&seat.role_id)?;
        let mut player = PlayerState::new(Uuid::new_v4(), name, role.id.clone());
        player.effects.clone_from(&role.initial_effects);
        players.push(player);
    }

    let count = players.len();
    let changes = StateChanges::new()
        .entry(EntryDraft::new(
            EntryPayload::GameStarted {
                player_count: count,
            },
            Message::key("log.game_started").number(i64::try_from(count).unwrap_or(i64::MAX)),
        ))
        .patch(StatePatch {
            players: FieldUpdate::Set(players),
            ..StatePatch::default()
        });
    let started = game.commit(changes, clock)?;

    info!(game_id = %game.id(), players = count, "game started");
    Ok(started)
}
