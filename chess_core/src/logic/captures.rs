use crate::logic::eval_constants::get_piece_value;
use shakmaty::{Color, Piece, Role};
use std::collections::HashMap;

/// Piece counts of one side in the standard starting position.
const STARTING_COUNTS: [(Role, usize); 6] = [
    (Role::Pawn, 8),
    (Role::Knight, 2),
    (Role::Bishop, 2),
    (Role::Rook, 2),
    (Role::Queen, 1),
    (Role::King, 1),
];

/// Pieces taken by each side, in the order they were taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureLedger {
    by_white: Vec<Piece>,
    by_black: Vec<Piece>,
}

impl CaptureLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from the pieces still on the board by comparing
    /// against the starting counts. Every missing piece is credited to the
    /// opposite color. Counts are exact, capture order is not recoverable.
    pub fn reconstruct(pieces: impl IntoIterator<Item = Piece>) -> Self {
        let mut live: HashMap<Piece, usize> = HashMap::new();
        for piece in pieces {
            *live.entry(piece).or_insert(0) += 1;
        }

        let mut ledger = Self::new();
        for color in [Color::White, Color::Black] {
            for (role, count) in STARTING_COUNTS {
                let piece = Piece { color, role };
                let on_board = live.get(&piece).copied().unwrap_or(0);
                for _ in 0..count.saturating_sub(on_board) {
                    ledger.record(color.other(), piece);
                }
            }
        }
        ledger
    }

    pub fn record(&mut self, capturer: Color, piece: Piece) {
        match capturer {
            Color::White => self.by_white.push(piece),
            Color::Black => self.by_black.push(piece),
        }
    }

    #[must_use]
    pub fn captured_by(&self, side: Color) -> &[Piece] {
        match side {
            Color::White => &self.by_white,
            Color::Black => &self.by_black,
        }
    }

    pub fn clear(&mut self) {
        self.by_white.clear();
        self.by_black.clear();
    }

    /// Value of White's captures minus Black's, kings excluded.
    #[must_use]
    pub fn material_balance(&self) -> i32 {
        let total = |pieces: &[Piece]| -> i32 {
            pieces
                .iter()
                .filter(|piece| piece.role != Role::King)
                .map(|piece| get_piece_value(piece.role))
                .sum()
        };
        total(&self.by_white) - total(&self.by_black)
    }
}
