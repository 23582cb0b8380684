use crate::engine::config::EngineConfig;
use crate::engine::Evaluator;
use crate::logic::position::Position;
use shakmaty::Color;
use std::sync::Arc;

/// Material plus mobility. Draws are not special-cased: a stalemated or
/// repeated position is scored like any other.
pub struct SimpleEvaluator {
    config: Arc<EngineConfig>,
}

impl SimpleEvaluator {
    pub const fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }
}

impl Evaluator for SimpleEvaluator {
    fn evaluate(&self, position: &Position, perspective: Color) -> i32 {
        let turn = position.turn();
        let legal_moves = position.legal_moves();

        // Checkmated: the side to move has just lost.
        if legal_moves.is_empty() && position.is_check() {
            return if turn == perspective {
                -self.config.mate_score
            } else {
                self.config.mate_score
            };
        }

        let material: i32 = position
            .pieces()
            .map(|(_, piece)| {
                let value = self.config.piece_value(piece.role);
                match piece.color {
                    Color::White => value,
                    Color::Black => -value,
                }
            })
            .sum();

        let mobility = i32::try_from(legal_moves.len()).unwrap_or(i32::MAX);
        let signed_mobility = match turn {
            Color::White => mobility,
            Color::Black => -mobility,
        };

        let score = material + signed_mobility * self.config.mobility_weight;
        match perspective {
            Color::White => score,
            Color::Black => -score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> SimpleEvaluator {
        SimpleEvaluator::new(Arc::new(EngineConfig::default()))
    }

    #[test]
    fn start_position_is_mobility_only() {
        let position = Position::new();
        // Material cancels out; White to move with 20 legal moves.
        assert_eq!(evaluator().evaluate(&position, Color::White), 60);
        assert_eq!(evaluator().evaluate(&position, Color::Black), -60);
    }

    #[test]
    fn material_edge_is_counted() {
        // White has an extra queen; Black to move with only king moves.
        let position = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 b - - 0 1").unwrap();
        let black_moves = i32::try_from(position.legal_moves().len()).unwrap();
        assert_eq!(
            evaluator().evaluate(&position, Color::White),
            900 - 3 * black_moves
        );
    }

    #[test]
    fn mate_scores_depend_on_who_was_mated() {
        // Fool's mate: White to move and checkmated.
        let position = Position::from_fen(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        )
        .unwrap();
        assert!(position.is_checkmate());
        assert_eq!(evaluator().evaluate(&position, Color::White), -100_000);
        assert_eq!(evaluator().evaluate(&position, Color::Black), 100_000);
    }

    #[test]
    fn stalemate_falls_through_to_material() {
        // Black king stalemated by the white queen; no neutral draw score.
        let position = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(position.is_draw());
        assert_eq!(evaluator().evaluate(&position, Color::White), 900);
    }
}
