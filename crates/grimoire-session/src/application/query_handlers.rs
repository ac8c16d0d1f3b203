//! Query handlers for the session context.
//!
//! This module contains query handlers that reconstitute games from stored
//! entries and return read-only view DTOs for the presentation layer.

use grimoire_core::error::DomainError;
use grimoire_core::ids::{EffectId, RoleId};
use grimoire_core::repository::GameRepository;
use grimoire_log::domain::effects::Expiry;
use grimoire_log::domain::state::{Alignment, Phase, Team};
use grimoire_rules::domain::catalog::{Catalog, EffectClass, EffectRegistry};
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers::load_game;
use crate::domain::night::{WakeEntry, outstanding_wakes, wake_list};
use crate::domain::voting::{can_vote, majority};

/// Read-only view of an effect instance on a seat.
#[derive(Debug, Serialize)]
pub struct EffectView {
    /// The effect type.
    pub effect_type: EffectId,
    /// How the presentation layer should show it; `None` for effects the
    /// catalog no longer knows.
    pub class: Option<EffectClass>,
    /// When the instance expires.
    pub expires_at: Expiry,
}

/// Read-only view of one seat.
#[derive(Debug, Serialize)]
pub struct SeatView {
    pub player_id: Uuid,
    pub name: String,
    pub role_id: RoleId,
    /// The role's team; `None` for a role the catalog does not know.
    pub team: Option<Team>,
    pub alive: bool,
    pub can_vote: bool,
    pub effects: Vec<EffectView>,
}

/// Read-only view of the whole grimoire, as the narrator sees it.
#[derive(Debug, Serialize)]
pub struct GrimoireView {
    /// The game identifier.
    pub game_id: Uuid,
    /// Current phase.
    pub phase: Phase,
    /// Current round.
    pub round: u32,
    /// The player up for execution while voting.
    pub active_nominee: Option<Uuid>,
    /// Votes needed to execute right now.
    pub votes_needed: usize,
    /// The winning side once the game has ended.
    pub winner: Option<Alignment>,
    /// Seats in table order.
    pub seats: Vec<SeatView>,
    /// Current version (entry count).
    pub version: i64,
}

/// Read-only view of tonight's wake order.
#[derive(Debug, Serialize)]
pub struct WakeListView {
    /// The game identifier.
    pub game_id: Uuid,
    /// The night's round.
    pub round: u32,
    /// Players to wake, in order.
    pub entries: Vec<WakeEntry>,
    /// The player whose turn it is; `None` once everyone has woken.
    pub next: Option<Uuid>,
}

/// Retrieves the grimoire of a game.
///
/// # Errors
///
/// Returns `DomainError::GameNotFound` if no entries exist for the ID.
/// Returns `DomainError::Infrastructure` if the stored log cannot be replayed.
pub async fn get_grimoire(
    game_id: Uuid,
    catalog: &Catalog,
    repo: &dyn GameRepository,
) -> Result<GrimoireView, DomainError> {
    let game = load_game(game_id, repo).await?;
    let state = game.state();
    let seats = state
        .players
        .iter()
        .map(|player| SeatView {
            player_id: player.id,
            name: player.name.clone(),
            role_id: player.role_id.clone(),
            team: catalog.roles().get(&player.role_id).map(|role| role.team),
            alive: player.is_alive(),
            can_vote: can_vote(player, state, catalog),
            effects: player
                .effects
                .iter()
                .map(|instance| EffectView {
                    effect_type: instance.effect_type.clone(),
                    class: catalog
                        .effects()
                        .definition_of(instance)
                        .map(|def| EffectRegistry::classify(instance, def)),
                    expires_at: instance.expires_at,
                })
                .collect(),
        })
        .collect();
    Ok(GrimoireView {
        game_id,
        phase: state.phase,
        round: state.round,
        active_nominee: state.active_nominee,
        votes_needed: majority(state.alive_count()),
        winner: state.winner,
        seats,
        version: game.version(),
    })
}

/// Retrieves tonight's wake list.
///
/// # Errors
///
/// Returns `DomainError::GameNotFound` if no entries exist for the ID,
/// `DomainError::Validation` outside the night, and
/// `DomainError::Infrastructure` if the stored log cannot be replayed.
pub async fn get_wake_list(
    game_id: Uuid,
    catalog: &Catalog,
    repo: &dyn GameRepository,
) -> Result<WakeListView, DomainError> {
    let game = load_game(game_id, repo).await?;
    let state = game.state();
    if state.phase != Phase::Night {
        return Err(DomainError::Validation(format!(
            "there is no wake list during {}",
            state.phase
        )));
    }
    Ok(WakeListView {
        game_id,
        round: state.round,
        entries: wake_list(&game, catalog),
        next: outstanding_wakes(&game, catalog)
            .first()
            .map(|w| w.player_id),
    })
}
