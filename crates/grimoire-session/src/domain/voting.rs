//! Nominations and vote tallies.

use std::collections::HashSet;

use grimoire_core::clock::Clock;
use grimoire_core::error::DomainError;
use grimoire_core::ids::EffectId;
use grimoire_log::domain::changes::{EffectRemoval, StateChanges, StatePatch};
use grimoire_log::domain::effects::{EffectInstance, GHOST_VOTE_SPENT};
use grimoire_log::domain::game::Game;
use grimoire_log::domain::history::{EntryDraft, EntryPayload};
use grimoire_log::domain::message::Message;
use grimoire_log::domain::state::{GameState, Phase, PlayerState};
use grimoire_rules::domain::catalog::Catalog;
use grimoire_rules::domain::intents::Intent;
use tracing::info;
use uuid::Uuid;

use super::resolution::{ActionSource, StepOutcome, run_intents};

/// Votes needed to execute with `alive` players alive.
#[must_use]
pub fn majority(alive: usize) -> usize {
    alive.div_ceil(2)
}

/// Whether every effect on `player` lets them vote.
#[must_use]
pub fn can_vote(player: &PlayerState, state: &GameState, catalog: &Catalog) -> bool {
    player.effects.iter().all(|instance| {
        catalog
            .effects()
            .definition_of(instance)
            .and_then(|def| def.can_vote)
            .is_none_or(|allowed| allowed(player, state))
    })
}

fn seated<'a>(state: &'a GameState, id: Uuid) -> Result<&'a PlayerState, DomainError> {
    state
        .player(id)
        .ok_or_else(|| DomainError::Validation(format!("player {id} is not seated")))
}

/// Nominates `nominee_id` and runs the nomination through the pipeline.
///
/// An allowed nomination opens voting on the nominee; an effect may prevent
/// it with consequences of its own.
///
/// # Errors
///
/// Returns `DomainError::Validation` outside the day, for a dead nominator,
/// when either player has already taken part in a nomination today, or when
/// an effect forbids the nomination.
pub fn nominate(
    game: &Game,
    nominator_id: Uuid,
    nominee_id: Uuid,
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<StepOutcome, DomainError> {
    let state = game.state();
    if state.phase != Phase::Day {
        return Err(DomainError::Validation(format!(
            "nominations are only taken during the day, not during {}",
            state.phase
        )));
    }
    let nominator = seated(state, nominator_id)?;
    let nominee = seated(state, nominee_id)?;
    if !nominator.is_alive() {
        return Err(DomainError::Validation(format!(
            "{} is dead and cannot nominate",
            nominator.name
        )));
    }

    let today = game.entries_since("day_started");
    for entry in today {
        if let EntryPayload::Nomination {
            nominator_id: earlier_nominator,
            nominee_id: earlier_nominee,
        } = entry.data
        {
            if earlier_nominator == nominator_id {
                return Err(DomainError::Validation(format!(
                    "{} has already nominated today",
                    nominator.name
                )));
            }
            if earlier_nominee == nominee_id {
                return Err(DomainError::Validation(format!(
                    "{} has already been nominated today",
                    nominee.name
                )));
            }
        }
    }

    for instance in &nominator.effects {
        let Some(def) = catalog.effects().definition_of(instance) else {
            continue;
        };
        if def
            .can_nominate
            .is_some_and(|allowed| !allowed(nominator, nominee, state))
        {
            return Err(DomainError::Validation(format!(
                "{} prevents {} from nominating",
                def.id, nominator.name
            )));
        }
    }
    for instance in &nominee.effects {
        let Some(def) = catalog.effects().definition_of(instance) else {
            continue;
        };
        if def
            .can_be_nominated
            .is_some_and(|allowed| !allowed(nominator, nominee, state))
        {
            return Err(DomainError::Validation(format!(
                "{} prevents {} from being nominated",
                def.id, nominee.name
            )));
        }
    }

    let prelude = StateChanges::new().entry(EntryDraft::new(
        EntryPayload::Nomination {
            nominator_id,
            nominee_id,
        },
        Message::key("log.nomination")
            .player(nominator_id)
            .player(nominee_id),
    ));
    let intent = Intent::Nominate {
        nominator_id,
        nominee_id,
    };
    run_intents(game, ActionSource::Nomination, prelude, vec![intent], catalog, clock)
}

/// Tallies the votes for the active nominee and executes them on a majority.
///
/// Dead voters spend their ghost vote. Voting always returns to the day.
///
/// # Errors
///
/// Returns `DomainError::Validation` outside voting, for unseated or repeated
/// voters, and for voters whose effects forbid voting.
pub fn record_votes(
    game: &Game,
    voters: &[Uuid],
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Result<StepOutcome, DomainError> {
    let state = game.state();
    if state.phase != Phase::Voting {
        return Err(DomainError::Validation(format!(
            "votes can only be recorded while voting, not during {}",
            state.phase
        )));
    }
    let nominee_id = state.active_nominee.ok_or_else(|| {
        DomainError::InvariantViolation("voting is open without a nominee".to_owned())
    })?;

    let mut seen = HashSet::new();
    let mut ghost_votes = StateChanges::new();
    for voter_id in voters {
        let voter = seated(state, *voter_id)?;
        if !seen.insert(*voter_id) {
            return Err(DomainError::Validation(format!(
                "{} voted twice",
                voter.name
            )));
        }
        if !can_vote(voter, state, catalog) {
            return Err(DomainError::Validation(format!(
                "{} cannot vote",
                voter.name
            )));
        }
        if !voter.is_alive() {
            ghost_votes = ghost_votes
                .remove_effect(EffectRemoval::Instance {
                    player_id: *voter_id,
                    effect_type: EffectId::dead(),
                    occurrence: 0,
                })
                .add_effect(
                    *voter_id,
                    EffectInstance::new(EffectId::dead()).with_data(GHOST_VOTE_SPENT, true),
                );
        }
    }

    let threshold = majority(state.alive_count());
    let passed = voters.len() >= threshold;
    info!(
        game_id = %game.id(),
        nominee = %nominee_id,
        votes = voters.len(),
        threshold,
        passed,
        "votes tallied"
    );

    let prelude = StateChanges::new()
        .entry(EntryDraft::new(
            EntryPayload::VoteTallied {
                nominee_id,
                voters: voters.to_vec(),
                threshold,
                passed,
            },
            Message::key(if passed {
                "log.vote_passed"
            } else {
                "log.vote_failed"
            })
            .player(nominee_id)
            .number(i64::try_from(voters.len()).unwrap_or(i64::MAX)),
        ))
        .merge(ghost_votes)
        .patch(StatePatch::phase(Phase::Day).with_nominee(None));
    let intents = if passed {
        vec![Intent::Execute {
            player_id: nominee_id,
        }]
    } else {
        Vec::new()
    };
    run_intents(game, ActionSource::Vote, prelude, intents, catalog, clock)
}
