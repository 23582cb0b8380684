use crate::engine::EngineMove;
use crate::logic::captures::CaptureLedger;
use crate::logic::position::{side_name, to_legal_move, LegalMove, Position, PositionError};
use crate::logic::rules::MoveError;
use crate::settings::GameMode;
use shakmaty::{Color, Piece, Role, Square};
use std::collections::HashMap;

/// The computer always plays the second player.
pub const COMPUTER_SIDE: Color = Color::Black;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Playing,
    Checkmate(Color), // Winner
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    Human,
    Computer,
}

/// Side effects a front end plays after a move, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEffect {
    Move,
    Capture,
    Check,
    GameEnd,
}

/// What happened when a move was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub notation: String,
    pub source: MoveSource,
    pub from: Square,
    pub to: Square,
    pub moved_piece: Piece,
    pub captured: Option<Piece>,
    pub promotion: Option<Role>,
    pub is_check: bool,
    pub is_terminal: bool,
}

impl MoveOutcome {
    #[must_use]
    pub const fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    #[must_use]
    pub fn effects(&self) -> Vec<MoveEffect> {
        let mut effects = vec![if self.is_capture() {
            MoveEffect::Capture
        } else {
            MoveEffect::Move
        }];
        if self.is_check {
            effects.push(MoveEffect::Check);
        }
        if self.is_terminal {
            effects.push(MoveEffect::GameEnd);
        }
        effects
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum CacheState {
    #[default]
    Stale,
    Fresh,
}

/// Legal moves of the current position grouped by origin square. Only
/// reachable through `moves`, which rebuilds the index when stale.
#[derive(Debug, Clone, Default)]
struct LegalMoveCache {
    state: CacheState,
    by_origin: HashMap<Square, Vec<LegalMove>>,
}

impl LegalMoveCache {
    fn invalidate(&mut self) {
        self.state = CacheState::Stale;
        self.by_origin.clear();
    }

    fn moves(&mut self, position: &Position) -> &HashMap<Square, Vec<LegalMove>> {
        if self.state == CacheState::Stale {
            self.by_origin.clear();
            for mv in position.legal_moves().iter().filter_map(to_legal_move) {
                self.by_origin.entry(mv.from).or_default().push(mv);
            }
            self.state = CacheState::Fresh;
        }
        &self.by_origin
    }
}

/// The game being played: one position, its move history and the pieces
/// each side has taken. All mutation goes through this type from a single
/// thread; searches only ever see `copy_of_position`.
#[derive(Debug, Clone)]
pub struct GameSession {
    position: Position,
    history: Vec<String>,
    captures: CaptureLedger,
    cache: LegalMoveCache,
    mode: GameMode,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(GameMode::default())
    }
}

impl GameSession {
    #[must_use]
    pub fn new(mode: GameMode) -> Self {
        Self {
            position: Position::new(),
            history: Vec::new(),
            captures: CaptureLedger::new(),
            cache: LegalMoveCache::default(),
            mode,
        }
    }

    pub fn reset(&mut self) {
        self.position = Position::new();
        self.history.clear();
        self.captures.clear();
        self.cache.invalidate();
    }

    /// Loads a saved game. The capture ledger is rebuilt from the piece
    /// counts, so capture order is not preserved. On error nothing changes.
    pub fn restore_from(&mut self, fen: &str, history: Vec<String>) -> Result<(), PositionError> {
        let position = Position::from_fen(fen)?;
        self.restore_position(position, history);
        Ok(())
    }

    pub fn restore_position(&mut self, position: Position, history: Vec<String>) {
        self.captures = CaptureLedger::reconstruct(position.pieces().map(|(_, piece)| piece));
        self.position = position;
        self.history = history;
        self.cache.invalidate();
    }

    /// Destinations reachable from `from`; empty for an empty square or a
    /// piece of the side not to move.
    pub fn legal_targets(&mut self, from: Square) -> Vec<Square> {
        self.cache
            .moves(&self.position)
            .get(&from)
            .map(|moves| moves.iter().map(|mv| mv.to).collect())
            .unwrap_or_default()
    }

    /// Every legal move, ordered by origin then destination square.
    pub fn legal_moves(&mut self) -> Vec<EngineMove> {
        let mut moves: Vec<EngineMove> = self
            .cache
            .moves(&self.position)
            .values()
            .flatten()
            .map(EngineMove::from)
            .collect();
        moves.sort_by_key(|mv| (mv.from, mv.to));
        moves
    }

    /// Plays the human's move from `from` to `to`.
    pub fn apply_move(&mut self, from: Square, to: Square) -> Result<MoveOutcome, MoveError> {
        self.apply(from, to, MoveSource::Human)
    }

    /// Plays a computer move. Only origin and destination are used; a
    /// promotion resolves the same way as for the human player.
    pub fn apply_computer_move(&mut self, mv: &EngineMove) -> Result<MoveOutcome, MoveError> {
        self.apply(mv.from, mv.to, MoveSource::Computer)
    }

    fn apply(
        &mut self,
        from: Square,
        to: Square,
        source: MoveSource,
    ) -> Result<MoveOutcome, MoveError> {
        let by_origin = self.cache.moves(&self.position);
        if by_origin.is_empty() {
            return Err(MoveError::NoLegalMoves);
        }

        let candidates: Vec<&LegalMove> = by_origin
            .get(&from)
            .into_iter()
            .flatten()
            .filter(|mv| mv.to == to)
            .collect();
        // Several candidates only happen on promotion: always take the queen.
        let selected = candidates
            .iter()
            .find(|mv| mv.promotion == Some(Role::Queen))
            .or_else(|| candidates.first())
            .map(|mv| (*mv).clone())
            .ok_or(MoveError::IllegalMove)?;

        let moved_piece = self
            .position
            .piece_at(selected.from)
            .ok_or(MoveError::IllegalMove)?;
        let captured = self.position.piece_at(selected.to);

        self.position.play(&selected.raw);
        self.cache.invalidate();

        let notation = EngineMove::from(&selected).notation();
        self.history.push(notation.clone());
        if let Some(piece) = captured {
            self.captures.record(moved_piece.color, piece);
        }

        Ok(MoveOutcome {
            notation,
            source,
            from: selected.from,
            to: selected.to,
            moved_piece,
            captured,
            promotion: selected.promotion,
            is_check: self.position.is_check(),
            is_terminal: self.is_over(),
        })
    }

    #[must_use]
    pub fn is_computers_turn(&self) -> bool {
        self.mode == GameMode::SinglePlayer && self.position.turn() == COMPUTER_SIDE
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.position.is_checkmate() || self.position.is_draw()
    }

    #[must_use]
    pub fn status(&self) -> GameStatus {
        if self.position.is_checkmate() {
            GameStatus::Checkmate(self.position.turn().other())
        } else if self.position.is_draw() {
            GameStatus::Draw
        } else {
            GameStatus::Playing
        }
    }

    #[must_use]
    pub fn status_text(&self) -> String {
        match self.status() {
            GameStatus::Checkmate(winner) => format!("Checkmate. Winner: {}", side_name(winner)),
            GameStatus::Draw => "Game ended in draw.".to_string(),
            GameStatus::Playing => "In progress".to_string(),
        }
    }

    #[must_use]
    pub fn current_fen(&self) -> String {
        self.position.fen()
    }

    #[must_use]
    pub fn move_history(&self) -> &[String] {
        &self.history
    }

    #[must_use]
    pub fn captured_by(&self, side: Color) -> &[Piece] {
        self.captures.captured_by(side)
    }

    #[must_use]
    pub fn material_balance(&self) -> i32 {
        self.captures.material_balance()
    }

    /// A detached copy, safe to hand to a search on another thread.
    #[must_use]
    pub fn copy_of_position(&self) -> Position {
        self.position.detached()
    }

    #[must_use]
    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    #[must_use]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position.piece_at(square)
    }

    /// Occupants indexed `[rank][file]`, rank 1 first.
    #[must_use]
    pub fn board(&self) -> [[Option<Piece>; 8]; 8] {
        let mut grid = [[None; 8]; 8];
        for (square, piece) in self.position.pieces() {
            if let Some(cell) = grid
                .get_mut(usize::from(square.rank()))
                .and_then(|row| row.get_mut(usize::from(square.file())))
            {
                *cell = Some(piece);
            }
        }
        grid
    }

    #[must_use]
    pub const fn game_mode(&self) -> GameMode {
        self.mode
    }

    pub fn set_game_mode(&mut self, mode: GameMode) {
        self.mode = mode;
    }
}
