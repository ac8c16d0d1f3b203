//! Night and day transitions.

use grimoire_core::clock::Clock;
use grimoire_core::error::DomainError;
use grimoire_log::domain::changes::{EffectRemoval, StateChanges, StatePatch};
use grimoire_log::domain::effects::Expiry;
use grimoire_log::domain::game::Game;
use grimoire_log::domain::history::{EntryDraft, EntryPayload};
use grimoire_log::domain::message::Message;
use grimoire_log::domain::state::Phase;
use grimoire_rules::domain::catalog::Catalog;
use grimoire_rules::domain::definitions::WinTrigger;
use tracing::info;

use super::night::outstanding_wakes;
use super::victory::check_win;

/// Starts the next night, from setup or from the day.
///
/// Leaving the day first evaluates `end_of_day` win conditions; a verdict
/// ends the game instead. Otherwise effects lasting until the end of the day
/// expire.
///
/// # Errors
///
/// Returns `DomainError::Validation` outside setup and day, or if no players
/// are seated.
pub fn begin_night(game: &Game, catalog: &Catalog, clock: &dyn Clock) -> Result<Game, DomainError> {
    let state = game.state();
    let changes = match state.phase {
        Phase::Setup => {
            if state.players.is_empty() {
                return Err(DomainError::Validation(
                    "no players are seated yet".to_owned(),
                ));
            }
            StateChanges::new()
        }
        Phase::Day => {
            let checked = check_win(game, &[WinTrigger::EndOfDay], catalog, clock)?;
            if checked.state().phase == Phase::Ended {
                return Ok(checked);
            }
            StateChanges::new().remove_effect(EffectRemoval::Expired {
                expiry: Expiry::EndOfDay,
            })
        }
        phase => {
            return Err(DomainError::Validation(format!(
                "a night cannot begin during {phase}"
            )));
        }
    };

    let round = state.round + 1;
    let changes = StateChanges::new()
        .entry(EntryDraft::new(
            EntryPayload::NightStarted { round },
            Message::key("log.night_started").number(i64::from(round)),
        ))
        .merge(changes)
        .patch(
            StatePatch::phase(Phase::Night)
                .with_round(round)
                .with_nominee(None),
        );
    let next = game.commit(changes, clock)?;
    info!(game_id = %game.id(), round, "night began");
    Ok(next)
}

/// Ends the night and starts the day of the same round.
///
/// Every wake-list entry must have acted or been skipped. `end_of_night` win
/// conditions are then evaluated; a verdict ends the game instead. Otherwise
/// effects lasting until the end of the night expire.
///
/// # Errors
///
/// Returns `DomainError::Validation` outside the night, or while players are
/// still due to wake.
pub fn end_night(game: &Game, catalog: &Catalog, clock: &dyn Clock) -> Result<Game, DomainError> {
    let phase = game.state().phase;
    if phase != Phase::Night {
        return Err(DomainError::Validation(format!(
            "the night cannot end during {phase}"
        )));
    }
    let outstanding = outstanding_wakes(game, catalog);
    if let Some(next) = outstanding.first() {
        return Err(DomainError::Validation(format!(
            "{} players have not woken yet, starting with {}",
            outstanding.len(),
            next.role_id
        )));
    }
    let checked = check_win(game, &[WinTrigger::EndOfNight], catalog, clock)?;
    if checked.state().phase == Phase::Ended {
        return Ok(checked);
    }

    let round = game.state().round;
    let changes = StateChanges::new()
        .entry(EntryDraft::new(
            EntryPayload::DayStarted { round },
            Message::key("log.day_started").number(i64::from(round)),
        ))
        .remove_effect(EffectRemoval::Expired {
            expiry: Expiry::EndOfNight,
        })
        .patch(StatePatch::phase(Phase::Day));
    let next = game.commit(changes, clock)?;
    info!(game_id = %game.id(), round, "day began");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use grimoire_core::ids::EffectId;
    use grimoire_log::domain::changes::FieldUpdate;
    use grimoire_log::domain::effects::EffectInstance;
    use grimoire_log::domain::state::{Alignment, PlayerState, Team};
    use grimoire_rules::domain::definitions::{
        EffectDefinition, RoleDefinition, WinCondition, WinContext,
    };
    use grimoire_test_support::FixedClock;
    use uuid::Uuid;

    use super::*;
    use crate::domain::night::skip_wake;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn good_after_second_round(ctx: &WinContext<'_>) -> Option<Alignment> {
        (ctx.game.state().round >= 2).then_some(Alignment::Good)
    }

    fn evil_when_alone(ctx: &WinContext<'_>) -> Option<Alignment> {
        (ctx.game.state().alive_count() == 1).then_some(Alignment::Evil)
    }

    fn catalog() -> Catalog {
        Catalog::builder()
            .effect(EffectDefinition::new(EffectId::dead()))
            .effect(EffectDefinition::new("safe"))
            .effect(EffectDefinition::new("poisoned"))
            .role(RoleDefinition::new("chef", Team::Townsfolk))
            .role(RoleDefinition::new("lookout", Team::Townsfolk).wakes_at(5))
            .role(
                RoleDefinition::new("patient", Team::Townsfolk).win_condition(WinCondition::new(
                    vec![WinTrigger::EndOfDay],
                    good_after_second_round,
                )),
            )
            .role(
                RoleDefinition::new("lurker", Team::Demon).win_condition(WinCondition::new(
                    vec![WinTrigger::EndOfNight],
                    evil_when_alone,
                )),
            )
            .build()
            .unwrap()
    }

    fn seated(roles: &[&str]) -> Game {
        let players = roles
            .iter()
            .enumerate()
            .map(|(i, role)| PlayerState::new(Uuid::new_v4(), format!("p{i}"), *role))
            .collect();
        Game::new(Uuid::new_v4())
            .commit(
                StateChanges::new().patch(StatePatch {
                    players: FieldUpdate::Set(players),
                    ..StatePatch::default()
                }),
                &clock(),
            )
            .unwrap()
    }

    #[test]
    fn test_first_night_starts_round_one() {
        // Arrange
        let game = seated(&["chef", "chef", "chef", "chef", "chef"]);

        // Act
        let night = begin_night(&game, &catalog(), &clock()).unwrap();

        // Assert
        assert_eq!(night.state().phase, Phase::Night);
        assert_eq!(night.state().round, 1);
        assert_eq!(night.history().last().unwrap().entry_type(), "night_started");
    }

    #[test]
    fn test_night_needs_seated_players() {
        let game = Game::new(Uuid::new_v4());

        let result = begin_night(&game, &catalog(), &clock());

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_day_sweeps_night_effects_and_keeps_round() {
        // Arrange
        let game = seated(&["chef", "chef", "chef", "chef", "chef"]);
        let night = begin_night(&game, &catalog(), &clock()).unwrap();
        let target = night.state().players[1].id;
        let night = night
            .commit(
                StateChanges::new()
                    .add_effect(target, EffectInstance::new("safe").expiring(Expiry::EndOfNight))
                    .add_effect(
                        target,
                        EffectInstance::new("poisoned").expiring(Expiry::EndOfDay),
                    ),
                &clock(),
            )
            .unwrap();

        // Act
        let day = end_night(&night, &catalog(), &clock()).unwrap();

        // Assert
        let player = &day.state().players[1];
        assert_eq!(day.state().phase, Phase::Day);
        assert_eq!(day.state().round, 1);
        assert!(!player.has_effect("safe"));
        assert!(player.has_effect("poisoned"));
    }

    #[test]
    fn test_next_night_sweeps_day_effects_and_advances_round() {
        let game = seated(&["chef", "chef", "chef", "chef", "chef"]);
        let night = begin_night(&game, &catalog(), &clock()).unwrap();
        let target = night.state().players[1].id;
        let night = night
            .commit(
                StateChanges::new().add_effect(
                    target,
                    EffectInstance::new("poisoned").expiring(Expiry::EndOfDay),
                ),
                &clock(),
            )
            .unwrap();
        let day = end_night(&night, &catalog(), &clock()).unwrap();

        let second = begin_night(&day, &catalog(), &clock()).unwrap();

        assert_eq!(second.state().round, 2);
        assert!(!second.state().players[1].has_effect("poisoned"));
    }

    #[test]
    fn test_end_of_day_verdict_ends_game_instead_of_night() {
        // Arrange
        let game = seated(&["patient", "chef", "chef", "chef", "chef"]);
        let mut current = begin_night(&game, &catalog(), &clock()).unwrap();
        current = end_night(&current, &catalog(), &clock()).unwrap();
        current = begin_night(&current, &catalog(), &clock()).unwrap();
        current = end_night(&current, &catalog(), &clock()).unwrap();

        // Act
        let ended = begin_night(&current, &catalog(), &clock()).unwrap();

        // Assert
        assert_eq!(ended.state().phase, Phase::Ended);
        assert_eq!(ended.state().winner, Some(Alignment::Good));
        assert_eq!(ended.state().round, 2);
    }

    #[test]
    fn test_end_of_night_verdict_ends_game_instead_of_day() {
        let game = seated(&["lurker", "chef", "chef", "chef", "chef"]);
        let mut night = begin_night(&game, &catalog(), &clock()).unwrap();
        let mut changes = StateChanges::new();
        for player in &night.state().players[1..] {
            changes = changes.add_effect(player.id, EffectInstance::new(EffectId::dead()));
        }
        night = night.commit(changes, &clock()).unwrap();

        let ended = end_night(&night, &catalog(), &clock()).unwrap();

        assert_eq!(ended.state().phase, Phase::Ended);
        assert_eq!(ended.state().winner, Some(Alignment::Evil));
    }

    #[test]
    fn test_night_cannot_begin_twice() {
        let game = seated(&["chef", "chef", "chef", "chef", "chef"]);
        let night = begin_night(&game, &catalog(), &clock()).unwrap();

        let result = begin_night(&night, &catalog(), &clock());

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_day_cannot_end_a_night_that_has_not_begun() {
        let game = seated(&["chef", "chef", "chef", "chef", "chef"]);

        let result = end_night(&game, &catalog(), &clock());

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_night_cannot_end_before_everyone_has_woken() {
        // Arrange
        let game = seated(&["chef", "lookout", "chef", "chef", "chef"]);
        let night = begin_night(&game, &catalog(), &clock()).unwrap();

        // Act
        let result = end_night(&night, &catalog(), &clock());

        // Assert
        assert!(matches!(
            result,
            Err(DomainError::Validation(msg)) if msg.contains("lookout")
        ));
    }

    #[test]
    fn test_night_ends_once_the_wake_list_is_exhausted() {
        let game = seated(&["chef", "lookout", "chef", "chef", "chef"]);
        let night = begin_night(&game, &catalog(), &clock()).unwrap();
        let lookout = night.state().players[1].id;
        let night = skip_wake(&night, lookout, &catalog(), &clock()).unwrap();

        let day = end_night(&night, &catalog(), &clock()).unwrap();

        assert_eq!(day.state().phase, Phase::Day);
    }
}
