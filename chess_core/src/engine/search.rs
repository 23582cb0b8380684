use crate::engine::config::EngineConfig;
use crate::engine::eval::SimpleEvaluator;
use crate::engine::{EngineMove, Evaluator, SearchStats, Searcher};
use crate::logic::position::{to_legal_move, Position};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shakmaty::{Color, Move};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

/// Window bound; one short of the integer limits so negation cannot overflow.
const INFINITY: i32 = i32::MAX - 1;

/// Random mover at depth 1, plain negamax with alpha-beta pruning above that.
pub struct AlphaBetaEngine {
    evaluator: SimpleEvaluator,
    rng: StdRng,
    nodes_searched: u32,
}

impl AlphaBetaEngine {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic random-mover choices, for tests and replays.
    pub fn with_seed(config: Arc<EngineConfig>, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    const fn with_rng(config: Arc<EngineConfig>, rng: StdRng) -> Self {
        Self {
            evaluator: SimpleEvaluator::new(config),
            rng,
            nodes_searched: 0,
        }
    }

    /// `perspective` is the side to move at this node; it flips with every ply.
    fn negamax(
        &mut self,
        position: &mut Position,
        depth: u8,
        mut alpha: i32,
        beta: i32,
        perspective: Color,
    ) -> i32 {
        self.nodes_searched = self.nodes_searched.saturating_add(1);

        if depth == 0 || position.is_checkmate() || position.is_draw() {
            return self.evaluator.evaluate(position, perspective);
        }

        let moves = position.legal_moves();
        if moves.is_empty() {
            return self.evaluator.evaluate(position, perspective);
        }

        let mut best_score = -INFINITY;
        for mv in &moves {
            let score = {
                let mut child = MadeMove::new(&mut *position, mv);
                -self.negamax(&mut child, depth - 1, -beta, -alpha, perspective.other())
            };

            best_score = best_score.max(score);
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }
        best_score
    }

    fn stats(&self, depth: u8, started: Instant) -> SearchStats {
        SearchStats {
            depth,
            nodes: self.nodes_searched,
            time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl Searcher for AlphaBetaEngine {
    fn search(&mut self, position: &mut Position, depth: u8) -> Option<(EngineMove, SearchStats)> {
        let started = Instant::now();
        self.nodes_searched = 0;

        let moves = position.legal_moves();
        if moves.is_empty() {
            log::debug!("search: no legal move in {}", position.fen());
            return None;
        }

        if depth <= 1 {
            let chosen = moves.choose(&mut self.rng).and_then(to_legal_move)?;
            return Some((EngineMove::from(&chosen), self.stats(depth, started)));
        }

        let root_side = position.turn();
        let mut best: Option<(&Move, i32)> = None;
        for mv in &moves {
            let score = {
                let mut child = MadeMove::new(&mut *position, mv);
                -self.negamax(&mut child, depth - 1, -INFINITY, INFINITY, root_side.other())
            };

            // Strictly greater: on equal scores the earlier move stays.
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((mv, score));
            }
        }

        let (mv, score) = best?;
        let chosen = EngineMove::from(&to_legal_move(mv)?);
        let stats = self.stats(depth, started);
        log::debug!(
            "search: {chosen} score {score} depth {} nodes {} in {}ms",
            stats.depth,
            stats.nodes,
            stats.time_ms
        );
        Some((chosen, stats))
    }
}

/// A move played on a borrowed position for as long as the guard lives.
/// Dropping the guard, including during unwinding, takes the move back.
struct MadeMove<'a> {
    position: &'a mut Position,
}

impl<'a> MadeMove<'a> {
    fn new(position: &'a mut Position, mv: &Move) -> Self {
        position.make(mv);
        Self { position }
    }
}

impl Deref for MadeMove<'_> {
    type Target = Position;

    fn deref(&self) -> &Position {
        self.position
    }
}

impl DerefMut for MadeMove<'_> {
    fn deref_mut(&mut self) -> &mut Position {
        self.position
    }
}

impl Drop for MadeMove<'_> {
    fn drop(&mut self) {
        self.position.undo();
    }
}
