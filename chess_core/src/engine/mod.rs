use crate::logic::position::{parse_square, LegalMove, Position};
use crate::logic::rules::MoveError;
use shakmaty::{Color, Role, Square};
use std::fmt;
use std::str::FromStr;

pub mod config;
pub mod eval;
pub mod search;

#[cfg(test)]
mod search_test;

/// A move in coordinate form, e.g. `e2e4` or `e7e8q`. Two moves are equal
/// when origin, destination and promotion piece agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl EngineMove {
    /// The display form recorded in the move history.
    #[must_use]
    pub fn notation(&self) -> String {
        format!("{} -> {}", self.from, self.to)
    }
}

impl From<&LegalMove> for EngineMove {
    fn from(mv: &LegalMove) -> Self {
        Self {
            from: mv.from,
            to: mv.to,
            promotion: mv.promotion,
        }
    }
}

impl fmt::Display for EngineMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

impl FromStr for EngineMove {
    type Err = MoveError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(MoveError::MalformedMove(text.to_string()));
        }
        let square = |range: std::ops::Range<usize>| {
            let name = text.get(range).unwrap_or_default();
            parse_square(name).ok_or_else(|| MoveError::InvalidSquare(name.to_string()))
        };
        let from = square(0..2)?;
        let to = square(2..4)?;
        let promotion = match text.get(4..) {
            None | Some("") => None,
            Some(letter) => Some(
                promotion_role(letter)
                    .ok_or_else(|| MoveError::MalformedMove(text.to_string()))?,
            ),
        };
        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

fn promotion_role(letter: &str) -> Option<Role> {
    match letter.to_ascii_lowercase().as_str() {
        "q" => Some(Role::Queen),
        "r" => Some(Role::Rook),
        "b" => Some(Role::Bishop),
        "n" => Some(Role::Knight),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub depth: u8,
    pub nodes: u32,
    pub time_ms: u64,
}

/// Static score of a position from `perspective`'s point of view.
pub trait Evaluator {
    fn evaluate(&self, position: &Position, perspective: Color) -> i32;
}

/// Chooses a move for the side to move. Implementations may make and undo
/// moves on `position` but must hand it back unchanged.
pub trait Searcher {
    fn search(&mut self, position: &mut Position, depth: u8) -> Option<(EngineMove, SearchStats)>;
}
