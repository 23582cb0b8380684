use chess_core::engine::EngineMove;
use chess_core::logic::position::parse_square;
use chess_core::logic::rules::MoveError;
use chess_core::settings::{Difficulty, GameMode, TimeControl};
use shakmaty::Square;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move { from: Square, to: Square },
    Targets(Square),
    Board,
    History,
    New,
    Pause,
    Resume,
    Save(Option<String>),
    Saves,
    Load(usize),
    Delete(usize),
    Mode(GameMode),
    Level(Difficulty),
    Clock(TimeControl),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}. Type `help` for the list.")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Unknown square: {0}")]
    Square(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Usage("help"));
        };
        let rest: Vec<&str> = words.collect();
        let arg = rest.first().copied();

        let command = match (head.to_ascii_lowercase().as_str(), arg) {
            ("moves" | "m", Some(square)) => Self::Targets(square_arg(square)?),
            ("moves" | "m", None) => return Err(CommandError::Usage("moves <square>")),
            ("board" | "b", _) => Self::Board,
            ("history" | "h", _) => Self::History,
            ("new", _) => Self::New,
            ("pause", _) => Self::Pause,
            ("resume", _) => Self::Resume,
            ("save", _) => Self::Save((!rest.is_empty()).then(|| rest.join(" "))),
            ("saves", _) => Self::Saves,
            ("load", Some(n)) => Self::Load(index_arg(n, "load <number>")?),
            ("load", None) => return Err(CommandError::Usage("load <number>")),
            ("delete", Some(n)) => Self::Delete(index_arg(n, "delete <number>")?),
            ("delete", None) => return Err(CommandError::Usage("delete <number>")),
            ("mode", Some(mode)) => Self::Mode(mode_arg(mode)?),
            ("mode", None) => return Err(CommandError::Usage(MODE_USAGE)),
            ("level", Some(level)) => Self::Level(level_arg(level)?),
            ("level", None) => return Err(CommandError::Usage(LEVEL_USAGE)),
            ("clock", Some(seconds)) => Self::Clock(clock_arg(seconds)?),
            ("clock", None) => return Err(CommandError::Usage(CLOCK_USAGE)),
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit" | "q", _) => Self::Quit,
            _ => move_arg(head, arg)?,
        };
        Ok(command)
    }
}

const MODE_USAGE: &str = "mode single|two";
const LEVEL_USAGE: &str = "level easy|medium|hard";
const CLOCK_USAGE: &str = "clock off|30|60|120|300";

fn square_arg(name: &str) -> Result<Square, CommandError> {
    parse_square(name).ok_or_else(|| CommandError::Square(name.to_string()))
}

fn index_arg(text: &str, usage: &'static str) -> Result<usize, CommandError> {
    match text.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn mode_arg(text: &str) -> Result<GameMode, CommandError> {
    match text.to_ascii_lowercase().as_str() {
        "single" | "1" => Ok(GameMode::SinglePlayer),
        "two" | "2" => Ok(GameMode::TwoPlayer),
        _ => Err(CommandError::Usage(MODE_USAGE)),
    }
}

fn level_arg(text: &str) -> Result<Difficulty, CommandError> {
    match text.to_ascii_lowercase().as_str() {
        "easy" => Ok(Difficulty::Easy),
        "medium" => Ok(Difficulty::Medium),
        "hard" => Ok(Difficulty::Hard),
        _ => Err(CommandError::Usage(LEVEL_USAGE)),
    }
}

fn clock_arg(text: &str) -> Result<TimeControl, CommandError> {
    match text.to_ascii_lowercase().as_str() {
        "off" | "none" | "0" => Ok(TimeControl::None),
        "30" => Ok(TimeControl::Sec30),
        "60" => Ok(TimeControl::Sec60),
        "120" => Ok(TimeControl::Sec120),
        "300" => Ok(TimeControl::Sec300),
        _ => Err(CommandError::Usage(CLOCK_USAGE)),
    }
}

/// `e2e4`, `e2 e4` or `e7e8q`; a promotion letter is accepted but the queen
/// is always chosen.
fn move_arg(head: &str, arg: Option<&str>) -> Result<Command, CommandError> {
    let text = match arg {
        Some(to) if head.len() == 2 => format!("{head}{to}"),
        _ => head.to_string(),
    };
    let mv: EngineMove = text.parse().map_err(|err| match err {
        MoveError::InvalidSquare(name) => CommandError::Square(name),
        _ => CommandError::Unknown(head.to_string()),
    })?;
    Ok(Command::Move {
        from: mv.from,
        to: mv.to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_parse_in_both_forms() {
        let expected = Command::Move {
            from: Square::E2,
            to: Square::E4,
        };
        assert_eq!("e2e4".parse::<Command>(), Ok(expected.clone()));
        assert_eq!("  E2 e4 ".parse::<Command>(), Ok(expected));
        assert_eq!(
            "d7d8q".parse::<Command>(),
            Ok(Command::Move {
                from: Square::D7,
                to: Square::D8
            })
        );
    }

    #[test]
    fn keywords_and_arguments() {
        assert_eq!("moves g1".parse::<Command>(), Ok(Command::Targets(Square::G1)));
        assert_eq!("load 2".parse::<Command>(), Ok(Command::Load(2)));
        assert_eq!(
            "save Club night".parse::<Command>(),
            Ok(Command::Save(Some("Club night".to_string())))
        );
        assert_eq!("save".parse::<Command>(), Ok(Command::Save(None)));
        assert_eq!("level hard".parse::<Command>(), Ok(Command::Level(Difficulty::Hard)));
        assert_eq!("clock 60".parse::<Command>(), Ok(Command::Clock(TimeControl::Sec60)));
        assert_eq!("mode two".parse::<Command>(), Ok(Command::Mode(GameMode::TwoPlayer)));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn bad_input_explains_itself() {
        assert_eq!(
            "load 0".parse::<Command>(),
            Err(CommandError::Usage("load <number>"))
        );
        assert_eq!(
            "moves z9".parse::<Command>(),
            Err(CommandError::Square("z9".to_string()))
        );
        assert!(matches!(
            "castle".parse::<Command>(),
            Err(CommandError::Unknown(_))
        ));
        assert!(matches!(
            "x9y9".parse::<Command>(),
            Err(CommandError::Square(_))
        ));
    }
}
