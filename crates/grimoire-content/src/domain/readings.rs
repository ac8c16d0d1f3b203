//! Information readings computed through the perception engine.

use std::collections::BTreeMap;

use grimoire_core::error::DomainError;
use grimoire_log::domain::state::{Alignment, GameState};
use grimoire_rules::domain::catalog::Catalog;
use grimoire_rules::domain::perception::{
    Aspect, PartialPerception, ambiguous_players, apply_perception_overrides, perceive,
};
use uuid::Uuid;

/// Living neighbours of the empath whose alignment the narrator still has to
/// choose before a reading can be given.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the empath is not seated.
pub fn empath_pending_choices(
    state: &GameState,
    empath_id: Uuid,
    catalog: &Catalog,
) -> Result<Vec<Uuid>, DomainError> {
    if state.player(empath_id).is_none() {
        return Err(DomainError::Validation(format!(
            "player {empath_id} is not seated"
        )));
    }
    let Some((left, right)) = state.alive_neighbors(empath_id) else {
        return Ok(Vec::new());
    };
    let neighbours = [left.clone(), right.clone()];
    Ok(ambiguous_players(&neighbours, Aspect::Alignment, catalog)
        .into_iter()
        .map(|p| p.id)
        .collect())
}

/// How many of the empath's two living neighbours appear evil to them, after
/// applying the narrator's registration choices for this reading.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the empath is not seated and
/// `DomainError::UnknownRole` if a neighbour's role is not registered.
pub fn empath_reading(
    state: &GameState,
    empath_id: Uuid,
    overrides: &BTreeMap<Uuid, PartialPerception>,
    catalog: &Catalog,
) -> Result<usize, DomainError> {
    let state = apply_perception_overrides(state, overrides, catalog);
    let empath = state
        .player(empath_id)
        .ok_or_else(|| DomainError::Validation(format!("player {empath_id} is not seated")))?;
    let Some((left, right)) = state.alive_neighbors(empath_id) else {
        return Ok(0);
    };
    let mut evil = 0;
    for neighbour in [left, right] {
        let seen = perceive(neighbour, empath, Aspect::Alignment, &state, catalog)?;
        if seen.alignment == Alignment::Evil {
            evil += 1;
        }
    }
    Ok(evil)
}
