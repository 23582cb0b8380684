//! Rules-engine adapter. Legality, check, mate and draw detection come from
//! `shakmaty`; this wrapper adds make/undo and repetition tracking on top of
//! its copy-on-play `Chess` position.

use shakmaty::fen::Fen;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, MoveList, Piece, Role, Square};
use thiserror::Error;

// `Position` is also the name of our wrapper, so the trait is only imported for its methods.
use shakmaty::Position as _;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Halfmove clock value at which the fifty-move rule ends the game.
const FIFTY_MOVE_PLIES: u32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("malformed FEN: {0}")]
    Malformed(String),
    #[error("illegal position: {0}")]
    Illegal(String),
}

/// A legal move reduced to coordinates, with the generator's move kept for replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
    pub raw: Move,
}

#[derive(Debug, Clone)]
pub struct Position {
    chess: Chess,
    undo_stack: Vec<Chess>,
    // Zobrist key of every position reached, current one last.
    keys: Vec<u64>,
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    #[must_use]
    pub fn new() -> Self {
        Self::from_chess(Chess::default())
    }

    fn from_chess(chess: Chess) -> Self {
        let key = zobrist_key(&chess);
        Self {
            chess,
            undo_stack: Vec::new(),
            keys: vec![key],
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let parsed = fen
            .trim()
            .parse::<Fen>()
            .map_err(|err| PositionError::Malformed(err.to_string()))?;
        let chess: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|err| PositionError::Illegal(err.to_string()))?;
        Ok(Self::from_chess(chess))
    }

    #[must_use]
    pub fn fen(&self) -> String {
        Fen::from_position(self.chess.clone(), EnPassantMode::Legal).to_string()
    }

    /// A copy sharing no state with `self`. The undo stack is dropped, the
    /// repetition record is kept so draws are still detected in the copy.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            chess: self.chess.clone(),
            undo_stack: Vec::new(),
            keys: self.keys.clone(),
        }
    }

    #[must_use]
    pub fn turn(&self) -> Color {
        self.chess.turn()
    }

    #[must_use]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.chess.board().piece_at(square)
    }

    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        let board = self.chess.board();
        board
            .occupied()
            .into_iter()
            .filter_map(move |square| board.piece_at(square).map(|piece| (square, piece)))
    }

    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        self.chess.legal_moves()
    }

    /// Plays a move for good: the repetition record grows, the undo stack does not.
    pub fn play(&mut self, mv: &Move) {
        self.chess.play_unchecked(mv);
        self.keys.push(zobrist_key(&self.chess));
    }

    pub fn make(&mut self, mv: &Move) {
        self.undo_stack.push(self.chess.clone());
        self.chess.play_unchecked(mv);
        self.keys.push(zobrist_key(&self.chess));
    }

    /// Reverts the last `make`. Returns `false` if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(previous) => {
                self.chess = previous;
                self.keys.pop();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_check(&self) -> bool {
        self.chess.is_check()
    }

    #[must_use]
    pub fn is_checkmate(&self) -> bool {
        self.chess.is_checkmate()
    }

    /// Stalemate, insufficient material, the fifty-move rule or threefold repetition.
    #[must_use]
    pub fn is_draw(&self) -> bool {
        self.chess.is_stalemate()
            || self.chess.is_insufficient_material()
            || self.chess.halfmoves() >= FIFTY_MOVE_PLIES
            || self.is_threefold_repetition()
    }

    fn is_threefold_repetition(&self) -> bool {
        let Some(current) = self.keys.last() else {
            return false;
        };
        // Nothing before the last pawn move or capture can repeat.
        let window = self.chess.halfmoves() as usize + 1;
        self.keys
            .iter()
            .rev()
            .take(window)
            .filter(|key| *key == current)
            .count()
            >= 3
    }
}

fn zobrist_key(chess: &Chess) -> u64 {
    chess.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0
}

/// Origin and destination of a move as a player sees it. Castling is
/// reported as the king's two-square step rather than king-takes-rook.
#[must_use]
pub fn move_squares(mv: &Move) -> Option<(Square, Square)> {
    match *mv {
        Move::Castle { king, rook } => {
            let file = if rook > king {
                shakmaty::File::G
            } else {
                shakmaty::File::C
            };
            Some((king, Square::from_coords(file, king.rank())))
        }
        _ => mv.from().map(|from| (from, mv.to())),
    }
}

#[must_use]
pub fn to_legal_move(mv: &Move) -> Option<LegalMove> {
    move_squares(mv).map(|(from, to)| LegalMove {
        from,
        to,
        promotion: mv.promotion(),
        raw: mv.clone(),
    })
}

/// Parses a lowercase or uppercase algebraic square name such as `e4`.
#[must_use]
pub fn parse_square(name: &str) -> Option<Square> {
    name.trim().to_ascii_lowercase().parse::<Square>().ok()
}

#[must_use]
pub const fn side_name(color: Color) -> &'static str {
    match color {
        Color::White => "WHITE",
        Color::Black => "BLACK",
    }
}
