//! Loading and replaying a game log file.
//!
//! A log file is a JSON array holding either the stored form written by a
//! repository or bare history entries as exported by a client.

use std::fmt::Write as _;

use grimoire_core::error::DomainError;
use grimoire_core::repository::StoredEntry;
use grimoire_log::application::storage::reconstitute;
use grimoire_log::domain::game::{Game, fold_history};
use grimoire_log::domain::history::HistoryEntry;
use grimoire_log::domain::state::GameState;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::OutputFormat;
use crate::error::AppError;

#[derive(Deserialize)]
#[serde(untagged)]
enum LogFile {
    Stored(Vec<StoredEntry>),
    History(Vec<HistoryEntry>),
}

/// One line of the replayed timeline.
#[derive(Debug, Serialize)]
pub struct TimelineLine {
    /// Position in the log, starting at 1.
    pub sequence: usize,
    pub entry_type: &'static str,
    /// Translation key of the entry's message, if it has one.
    pub message_key: Option<String>,
}

/// Result of replaying a log.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    /// Game identifier; nil for bare history exports.
    pub game_id: Uuid,
    /// Number of entries replayed.
    pub entries: usize,
    /// SHA-256 of the history.
    pub fingerprint: String,
    /// The projected state after the last entry.
    pub state: GameState,
    pub timeline: Vec<TimelineLine>,
}

/// Parses a log file into a game, replaying and checking every entry.
///
/// # Errors
///
/// Returns `AppError::Json` if the input is neither form of log,
/// `AppError::Domain` if it is empty, out of sequence, spans several games,
/// or does not fold to its own snapshots.
pub fn load_game(input: &str) -> Result<Game, AppError> {
    let game = match serde_json::from_str::<LogFile>(input)? {
        LogFile::Stored(stored) => {
            let Some(first) = stored.first() else {
                return Err(DomainError::Validation("the log is empty".to_owned()).into());
            };
            let game_id = first.game_id;
            if let Some(stray) = stored.iter().find(|e| e.game_id != game_id) {
                return Err(DomainError::Validation(format!(
                    "entry {} belongs to game {}, not {game_id}",
                    stray.entry_id, stray.game_id
                ))
                .into());
            }
            debug!(%game_id, entries = stored.len(), "replaying stored log");
            reconstitute(game_id, &stored)?
        }
        LogFile::History(history) => {
            debug!(entries = history.len(), "replaying exported history");
            Game::replay(Uuid::nil(), history)?
        }
    };
    Ok(game)
}

/// Replays a log file and summarises the result.
///
/// # Errors
///
/// See [`load_game`]. Also returns `AppError::Domain` if the projection
/// cannot be fingerprinted.
pub fn replay_log(input: &str) -> Result<ReplayReport, AppError> {
    let game = load_game(input)?;
    let state = fold_history(game.history())?;
    let fingerprint = game.fingerprint()?;
    let timeline = game
        .history()
        .iter()
        .enumerate()
        .map(|(index, entry)| TimelineLine {
            sequence: index + 1,
            entry_type: entry.entry_type(),
            message_key: entry.message.translation_key().map(str::to_owned),
        })
        .collect();
    info!(
        game_id = %game.id(),
        entries = game.history().len(),
        phase = %state.phase,
        round = state.round,
        "log replayed"
    );
    Ok(ReplayReport {
        game_id: game.id(),
        entries: game.history().len(),
        fingerprint,
        state,
        timeline,
    })
}

/// Renders a report for the terminal.
///
/// # Errors
///
/// Returns `AppError::Json` if the report cannot be serialized.
pub fn render(report: &ReplayReport, format: OutputFormat) -> Result<String, AppError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Pretty => Ok(render_text(report)),
    }
}

fn render_text(report: &ReplayReport) -> String {
    let state = &report.state;
    let mut out = String::new();
    let _ = writeln!(out, "game {}", report.game_id);
    let _ = writeln!(out, "  entries:     {}", report.entries);
    let _ = writeln!(out, "  fingerprint: {}", report.fingerprint);
    let _ = writeln!(out, "  phase:       {} (round {})", state.phase, state.round);
    if let Some(winner) = state.winner {
        let _ = writeln!(out, "  winner:      {winner}");
    }
    out.push_str("seats\n");
    for (seat, player) in state.players.iter().enumerate() {
        let effects: Vec<&str> = player
            .effects
            .iter()
            .map(|e| e.effect_type.as_str())
            .collect();
        let _ = writeln!(
            out,
            "  {seat:>2} {:<16} {:<14} {}",
            player.name,
            player.role_id.as_str(),
            effects.join(", ")
        );
    }
    out.push_str("timeline\n");
    for line in &report.timeline {
        let _ = writeln!(
            out,
            "  {:>4} {:<16} {}",
            line.sequence,
            line.entry_type,
            line.message_key.as_deref().unwrap_or("-")
        );
    }
    out
}
