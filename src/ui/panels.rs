use chess_core::logic::clock::TurnClock;
use chess_core::logic::game::{GameSession, MoveEffect, MoveOutcome, MoveSource};
use chess_core::logic::position::side_name;
use chess_core::persistence::GameSave;
use shakmaty::Color;
use std::fmt::Write;
use std::time::Duration;

pub const HELP: &str = "\
Commands:
  e2e4 | e2 e4        play a move (promotions always make a queen)
  moves <square>      show where the piece on <square> can go
  board | history     show the board or the move list
  new                 start a new game
  pause | resume      stop or restart the clock and the computer
  save [name]         save the current game
  saves               list saved games
  load <n> | delete <n>
  mode single|two     play the computer or another person
  level easy|medium|hard
  clock off|30|60|120|300
  quit";

pub fn status_line(session: &GameSession, clock: &TurnClock, paused: bool, thinking: bool) -> String {
    let mut line = if let Some(winner) = clock.winner() {
        format!("Time expired. Winner: {}", side_name(winner))
    } else if session.is_over() {
        session.status_text()
    } else {
        format!("{} to move", side_name(session.turn()))
    };

    if clock.is_enabled() {
        let _ = write!(
            line,
            " | White {} Black {}",
            clock_face(clock.remaining(Color::White)),
            clock_face(clock.remaining(Color::Black))
        );
    }
    let _ = write!(line, " | {}", session.game_mode());
    if paused {
        line.push_str(" | paused");
    }
    if thinking {
        line.push_str(" | computer is thinking...");
    }
    line
}

fn clock_face(remaining: Duration) -> String {
    let seconds = remaining.as_secs();
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn outcome_line(outcome: &MoveOutcome) -> String {
    let who = match outcome.source {
        MoveSource::Human => "You",
        MoveSource::Computer => "Computer",
    };
    let notes: Vec<&str> = outcome
        .effects()
        .iter()
        .filter_map(|effect| match effect {
            MoveEffect::Move => None,
            MoveEffect::Capture => Some("capture"),
            MoveEffect::Check => Some("check"),
            MoveEffect::GameEnd => Some("game over"),
        })
        .collect();

    if notes.is_empty() {
        format!("{who}: {}", outcome.notation)
    } else {
        format!("{who}: {} ({})", outcome.notation, notes.join(", "))
    }
}

/// Moves paired by turn number, White first.
pub fn history(entries: &[String]) -> String {
    if entries.is_empty() {
        return "No moves yet.".to_string();
    }
    entries
        .chunks(2)
        .enumerate()
        .map(|(turn, pair)| format!("{:>3}. {}", turn + 1, pair.join("   ")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn captures(session: &GameSession) -> String {
    let taken = |side: Color| -> String {
        let pieces: String = session
            .captured_by(side)
            .iter()
            .map(|piece| piece.char())
            .collect();
        if pieces.is_empty() {
            "-".to_string()
        } else {
            pieces
        }
    };
    format!(
        "Taken by White: {}  Taken by Black: {}  Material: {:+}",
        taken(Color::White),
        taken(Color::Black),
        session.material_balance()
    )
}

pub fn saves(list: &[GameSave]) -> String {
    if list.is_empty() {
        return "No saved games.".to_string();
    }
    list.iter()
        .enumerate()
        .map(|(index, save)| {
            format!(
                "{:>3}. {}  {}  {} moves, {}",
                index + 1,
                save.name,
                save.saved_at.format("%Y-%m-%d %H:%M"),
                save.history.len(),
                save.difficulty
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
