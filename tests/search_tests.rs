//! End-to-end search scenarios through the root driver.

use lodestar::board::Board;
use lodestar::defs;
use lodestar::engine::{Engine, SearchLimits};
use lodestar::evaluate::{ClassicalEval, Evaluator};
use lodestar::model;
use lodestar::movegen;
use lodestar::search::MATE_THRESHOLD;
use std::time::{Duration, Instant};

fn sq(name: &str) -> defs::Square {
    defs::from_algebraic(name).unwrap()
}

#[test]
fn depth_one_score_matches_child_static_eval() {
    let mut engine = Engine::new(1 << 14);
    let board = Board::new();
    let outcome = engine
        .pick_move(&board, SearchLimits::depth(1), &ClassicalEval)
        .unwrap();

    let mut child = board.clone();
    child.apply_move(outcome.best_move);
    assert_eq!(
        outcome.score_cp,
        ClassicalEval.evaluate(&child),
        "a depth-1 search reports the chosen child's static evaluation"
    );
}

#[test]
fn finds_back_rank_mate() {
    let mut engine = Engine::new(1 << 16);
    let board = Board::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
    let outcome = engine
        .pick_move(&board, SearchLimits::depth(3), &ClassicalEval)
        .unwrap();
    assert!(
        outcome.score_cp > MATE_THRESHOLD,
        "score {} is not a mate score",
        outcome.score_cp
    );
    assert_eq!(outcome.best_move.from, sq("a1"));
    assert_eq!(outcome.best_move.to, sq("a8"));
}

#[test]
fn defends_against_forced_loss() {
    // Black to move would mate with Qg2; white-POV scores stay heavily
    // negative whatever white tried one ply earlier.
    let board = Board::from_fen("6k1/8/8/8/8/5q2/8/6K1 b - - 0 1").unwrap();
    let mut engine = Engine::new(1 << 16);
    let outcome = engine
        .pick_move(&board, SearchLimits::depth(4), &ClassicalEval)
        .unwrap();
    assert!(
        outcome.score_cp < -300,
        "score {} should favor black heavily",
        outcome.score_cp
    );
}

#[test]
fn deadline_is_honored() {
    let mut engine = Engine::new(1 << 16);
    let board = Board::new();
    let limits = SearchLimits {
        max_depth: 30,
        time_ms: Some(300),
    };
    let start = Instant::now();
    let outcome = engine
        .pick_move(&board, limits, &ClassicalEval)
        .expect("a move must come back");
    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_millis(1200),
        "search overran its 300ms budget: {elapsed:?}"
    );
    assert!(outcome.score_cp.abs() < MATE_THRESHOLD, "score must be finite");
    assert!(outcome.depth >= 1);
    assert!(movegen::legal_moves(&board)
        .find(outcome.best_move.from, outcome.best_move.to)
        .is_some());
}

#[test]
fn drawn_material_scores_as_contempt() {
    for fen in [
        "8/8/4k3/8/8/3KN3/8/8 w - - 0 1",
        "8/8/4k3/8/8/3KB3/8/8 b - - 0 1",
    ] {
        let board = Board::from_fen(fen).unwrap();
        let mut engine = Engine::new(1 << 14);
        let outcome = engine
            .pick_move(&board, SearchLimits::depth(4), &ClassicalEval)
            .unwrap();
        assert_eq!(
            outcome.score_cp.abs(),
            12,
            "expected a contempt-valued draw for {fen}, got {}",
            outcome.score_cp
        );
    }
}

#[test]
fn deeper_search_still_reports_legal_moves() {
    // Depth 5 engages the aspiration window; the rook endgame keeps the
    // tree small.
    let mut engine = Engine::new(1 << 16);
    let board = Board::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
    let outcome = engine
        .pick_move(&board, SearchLimits::depth(5), &ClassicalEval)
        .unwrap();
    assert_eq!(outcome.depth, 5);
    assert!(movegen::legal_moves(&board)
        .find(outcome.best_move.from, outcome.best_move.to)
        .is_some());
}

#[test]
fn neural_evaluator_drives_a_search() {
    // A miniature network: one hidden unit reading the tempo feature.
    let mut row = vec![0.0f32; model::INPUT_DIM];
    row[model::INPUT_DIM - 1] = 1.0;
    let blob = serde_json::json!({
        "basis": "square1h",
        "activation": "relu",
        "model_pov": "sidemove",
        "layers": [
            {"W": [row], "b": [0.0]},
            {"W": [[1.0]], "b": [0.0]}
        ],
        "scale_cp": 100
    });
    let path = std::env::temp_dir().join("lodestar_tiny_net.json");
    std::fs::write(&path, blob.to_string()).unwrap();

    let eval = model::load_evaluator(Some(&path));
    let mut engine = Engine::new(1 << 14);
    let board = Board::new();
    let outcome = engine
        .pick_move(&board, SearchLimits::depth(2), eval.as_ref())
        .expect("network-driven search returns a move");
    assert!(movegen::legal_moves(&board)
        .find(outcome.best_move.from, outcome.best_move.to)
        .is_some());

    let _ = std::fs::remove_file(&path);
}
