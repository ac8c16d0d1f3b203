//! Replaying logs exported from a played game.

use chrono::{TimeZone, Utc};
use grimoire_cli::error::AppError;
use grimoire_cli::replay::{load_game, replay_log};
use grimoire_core::error::DomainError;
use grimoire_core::repository::StoredEntry;
use grimoire_log::application::storage::to_stored_entries;
use grimoire_log::domain::changes::{FieldUpdate, StateChanges, StatePatch};
use grimoire_log::domain::game::Game;
use grimoire_log::domain::history::{EntryDraft, EntryPayload};
use grimoire_log::domain::message::Message;
use grimoire_log::domain::state::{Phase, PlayerState};
use grimoire_test_support::FixedClock;
use uuid::Uuid;

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
}

fn first_night() -> Game {
    let players: Vec<PlayerState> = (0..5)
        .map(|i| PlayerState::new(Uuid::new_v4(), format!("player{i}"), "chef"))
        .collect();
    let started = Game::new(Uuid::new_v4())
        .commit(
            StateChanges::new()
                .entry(EntryDraft::new(
                    EntryPayload::GameStarted { player_count: 5 },
                    Message::key("log.game_started").number(5),
                ))
                .patch(StatePatch {
                    players: FieldUpdate::Set(players),
                    ..StatePatch::default()
                }),
            &clock(),
        )
        .unwrap();
    started
        .commit(
            StateChanges::new()
                .entry(EntryDraft::new(
                    EntryPayload::NightStarted { round: 1 },
                    Message::key("log.night_started").number(1),
                ))
                .patch(StatePatch::phase(Phase::Night).with_round(1)),
            &clock(),
        )
        .unwrap()
}

fn stored(game: &Game) -> Vec<StoredEntry> {
    to_stored_entries(game.id(), 0, game.history(), Uuid::new_v4()).unwrap()
}

#[test]
fn test_stored_log_replays_to_the_same_game() {
    // Arrange
    let game = first_night();
    let input = serde_json::to_string_pretty(&stored(&game)).unwrap();

    // Act
    let replayed = load_game(&input).unwrap();

    // Assert
    assert_eq!(replayed, game);
}

#[test]
fn test_report_reflects_the_last_entry() {
    let game = first_night();
    let input = serde_json::to_string(&stored(&game)).unwrap();

    let report = replay_log(&input).unwrap();

    assert_eq!(report.entries, 2);
    assert_eq!(report.state.phase, Phase::Night);
    assert_eq!(report.state.round, 1);
    assert_eq!(report.timeline[1].entry_type, "night_started");
}

#[test]
fn test_out_of_sequence_log_is_rejected() {
    // Arrange
    let game = first_night();
    let mut entries = stored(&game);
    entries.swap(0, 1);
    let input = serde_json::to_string(&entries).unwrap();

    // Act
    let result = replay_log(&input);

    // Assert
    assert!(matches!(
        result,
        Err(AppError::Domain(DomainError::Infrastructure(_)))
    ));
}
