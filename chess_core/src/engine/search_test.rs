use crate::engine::config::EngineConfig;
use crate::engine::eval::SimpleEvaluator;
use crate::engine::search::AlphaBetaEngine;
use crate::engine::{EngineMove, Evaluator, Searcher};
use crate::logic::position::{to_legal_move, Position};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shakmaty::{Color, Role, Square};
use std::sync::Arc;

fn engine() -> AlphaBetaEngine {
    AlphaBetaEngine::with_seed(Arc::new(EngineConfig::default()), 7)
}

fn legal_set(position: &Position) -> Vec<EngineMove> {
    position
        .legal_moves()
        .iter()
        .filter_map(to_legal_move)
        .map(|mv| EngineMove::from(&mv))
        .collect()
}

#[test]
fn test_random_depth_returns_legal_moves() {
    let mut engine = engine();
    let mut position = Position::new();
    let legal = legal_set(&position);
    for _ in 0..50 {
        let (mv, stats) = engine.search(&mut position, 1).unwrap();
        assert!(legal.contains(&mv), "{mv} is not legal");
        assert_eq!(stats.depth, 1);
    }
}

#[test]
fn test_no_move_when_game_is_decided() {
    let mut engine = engine();
    let mut mated = Position::from_fen(
        "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
    )
    .unwrap();
    let mut stalemated = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    for depth in [1, 2, 3] {
        assert!(engine.search(&mut mated, depth).is_none());
        assert!(engine.search(&mut stalemated, depth).is_none());
    }
}

#[test]
fn test_single_legal_move_is_always_chosen() {
    // Black king in check from the h1 rook; the f7 rook leaves only g8.
    let fen = "7k/5R2/8/8/8/8/8/K6R b - - 0 1";
    let only = legal_set(&Position::from_fen(fen).unwrap());
    assert_eq!(only.len(), 1);

    let mut engine = engine();
    for depth in [1, 2, 3, 4] {
        let mut position = Position::from_fen(fen).unwrap();
        let (mv, _) = engine.search(&mut position, depth).unwrap();
        assert_eq!(Some(&mv), only.first());
    }
}

#[test]
fn test_finds_back_rank_mate() {
    let mut engine = engine();
    let mut position = Position::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
    let (mv, stats) = engine.search(&mut position, 2).unwrap();
    assert_eq!(mv.from, Square::A1);
    assert_eq!(mv.to, Square::A8);
    assert!(stats.nodes > 0);
}

#[test]
fn test_takes_hanging_queen() {
    let mut engine = engine();
    let mut position = Position::from_fen("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1").unwrap();
    let (mv, _) = engine.search(&mut position, 2).unwrap();
    assert_eq!(mv.to_string(), "d1d5");
}

#[test]
fn test_search_leaves_position_untouched() {
    let mut engine = engine();
    let mut position = Position::new();
    let before = position.fen();
    let _ = engine.search(&mut position, 3);
    assert_eq!(position.fen(), before);
    assert!(!position.undo(), "search left moves on the undo stack");
}

#[test]
fn test_search_is_deterministic_above_random_depth() {
    let mut position = Position::from_fen(
        "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
    )
    .unwrap();
    let first = engine().search(&mut position, 2).map(|(mv, _)| mv);
    let second = AlphaBetaEngine::new(Arc::new(EngineConfig::default()))
        .search(&mut position, 2)
        .map(|(mv, _)| mv);
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn test_promotion_is_reported_in_coordinate_form() {
    let mut engine = engine();
    // Promoting with check and winning the rook is the clear best move.
    let mut position = Position::from_fen("r3k3/1P6/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    let (mv, _) = engine.search(&mut position, 2).unwrap();
    assert_eq!(mv.from, Square::B7);
    assert!(mv.promotion.is_some());
    if mv.to == Square::A8 {
        assert_eq!(mv.promotion, Some(Role::Queen));
    }
}

/// Full-width negamax with no pruning, same scoring convention as the engine.
fn full_width(
    evaluator: &SimpleEvaluator,
    position: &mut Position,
    depth: u8,
    perspective: Color,
) -> i32 {
    if depth == 0 || position.is_checkmate() || position.is_draw() {
        return evaluator.evaluate(position, perspective);
    }
    let moves = position.legal_moves();
    if moves.is_empty() {
        return evaluator.evaluate(position, perspective);
    }
    let mut best = i32::MIN + 1;
    for mv in &moves {
        position.make(mv);
        let score = -full_width(evaluator, position, depth - 1, perspective.other());
        position.undo();
        best = best.max(score);
    }
    best
}

/// First move in generation order with the highest full-width score.
fn full_width_choice(position: &mut Position, depth: u8) -> Option<EngineMove> {
    let evaluator = SimpleEvaluator::new(Arc::new(EngineConfig::default()));
    let root_side = position.turn();
    let mut best: Option<(EngineMove, i32)> = None;
    for mv in &position.legal_moves() {
        position.make(mv);
        let score = -full_width(&evaluator, position, depth - 1, root_side.other());
        position.undo();
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((EngineMove::from(&to_legal_move(mv)?), score));
        }
    }
    best.map(|(mv, _)| mv)
}

#[test]
fn test_pruning_never_changes_the_chosen_move() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut checked = 0;
    while checked < 8 {
        let mut position = Position::new();
        for _ in 0..rng.gen_range(4..14) {
            let moves = position.legal_moves();
            let Some(mv) = moves.choose(&mut rng).cloned() else {
                break;
            };
            position.play(&mv);
        }
        if position.legal_moves().is_empty() || position.is_draw() {
            continue;
        }

        for depth in [2, 3] {
            let expected = full_width_choice(&mut position, depth);
            let (found, _) = engine().search(&mut position, depth).unwrap();
            assert_eq!(Some(found), expected, "depth {depth} in {}", position.fen());
        }
        checked += 1;
    }
}

#[test]
fn test_equal_scores_keep_the_first_move() {
    // Only kings: every king move leaves material level, so scores tie on
    // mobility alone and the earliest generated best move must win.
    let fen = "8/8/8/3k4/8/8/8/4K3 w - - 0 1";
    let mut position = Position::from_fen(fen).unwrap();
    let expected = full_width_choice(&mut position, 2);
    let (found, _) = engine().search(&mut position, 2).unwrap();
    assert_eq!(Some(found), expected);
}

#[test]
fn test_tuned_piece_values_change_the_choice() {
    // The d4 rook can take the d6 rook or the a4 knight.
    let fen = "7k/8/3r4/8/n2R4/8/8/6K1 w - - 0 1";

    let mut position = Position::from_fen(fen).unwrap();
    let (mv, _) = engine().search(&mut position, 2).unwrap();
    assert_eq!(mv.to_string(), "d4d6");

    let tuned = EngineConfig::load_from_json(r#"{ "val_knight": 3.0 }"#).unwrap();
    let mut position = Position::from_fen(fen).unwrap();
    let (mv, _) = AlphaBetaEngine::with_seed(Arc::new(tuned), 7)
        .search(&mut position, 2)
        .unwrap();
    assert_eq!(mv.to_string(), "d4a4");
}
