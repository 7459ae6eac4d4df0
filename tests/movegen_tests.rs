//! Cross-module move generation scenarios: contract positions, soundness of
//! every generated move, and completeness against known node counts.

use lodestar::board::Board;
use lodestar::defs::{self, Color};
use lodestar::movegen::{self, GameStatus};
use lodestar::mv::Move;

fn sq(name: &str) -> defs::Square {
    defs::from_algebraic(name).unwrap()
}

fn count_nodes(board: &Board, depth: u32) -> u64 {
    let moves = movegen::legal_moves(board);
    if depth <= 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0;
    for &m in moves.as_slice() {
        let mut child = board.clone();
        child.apply_move(m);
        nodes += count_nodes(&child, depth - 1);
    }
    nodes
}

// ---------------------------------------------------------------------------
// Contract scenarios
// ---------------------------------------------------------------------------

#[test]
fn black_replies_after_e4() {
    let board =
        Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
    let moves = movegen::legal_moves(&board);
    assert!(moves.contains(Move::new(sq("e7"), sq("e5"))));
    assert!(moves.contains(Move::new(sq("d7"), sq("d5"))));
    assert!(!board.is_square_attacked(sq("e3"), Color::White));
}

#[test]
fn both_castles_available() {
    let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let moves = movegen::legal_moves(&board);
    assert!(moves.contains(Move::new(sq("e1"), sq("g1"))), "kingside castle missing");
    assert!(moves.contains(Move::new(sq("e1"), sq("c1"))), "queenside castle missing");
}

#[test]
fn castling_blocked_through_attacked_square() {
    // Black rook on f8 covers f1, forbidding kingside castling only.
    let board = Board::from_fen("5rk1/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
    let moves = movegen::legal_moves(&board);
    assert!(!moves.contains(Move::new(sq("e1"), sq("g1"))));
    assert!(moves.contains(Move::new(sq("e1"), sq("c1"))));
}

#[test]
fn en_passant_after_double_push_sequence() {
    let mut board = Board::new();
    for (f, t) in [("e2", "e4"), ("a7", "a6"), ("e4", "e5"), ("d7", "d5")] {
        movegen::try_move(&mut board, sq(f), sq(t)).unwrap();
    }
    let moves = movegen::legal_moves(&board);
    assert!(moves.contains(Move::new(sq("e5"), sq("d6"))), "en passant missing");
}

#[test]
fn stalemate_and_checkmate_are_distinguishable() {
    let stalemate = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    assert!(movegen::legal_moves(&stalemate).is_empty());
    assert!(!stalemate.in_check());
    assert_eq!(movegen::game_status(&stalemate), GameStatus::Stalemate);

    let checkmate = Board::from_fen("7k/5Q1K/8/8/8/8/8/8 b - - 0 1").unwrap();
    assert!(movegen::legal_moves(&checkmate).is_empty());
    assert!(checkmate.in_check());
    assert_eq!(movegen::game_status(&checkmate), GameStatus::Checkmate);
}

#[test]
fn promotions_are_queen_only() {
    let board = Board::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
    let moves = movegen::legal_moves(&board);
    let promos: Vec<&Move> = moves
        .as_slice()
        .iter()
        .filter(|m| m.from == sq("a7"))
        .collect();
    assert_eq!(promos.len(), 1, "one promoting push, one choice");
    assert_eq!(promos[0].promotion, Some(defs::PieceType::Queen));
}

// ---------------------------------------------------------------------------
// Soundness: no generated move may leave the mover's king attacked
// ---------------------------------------------------------------------------

#[test]
fn generated_moves_never_leave_king_in_check() {
    let fens = [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R b KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 b - - 0 1",
        "4k3/8/8/8/3Pp3/8/8/4K3 b - d3 0 1",
        "4r2k/8/8/8/7b/8/3N4/4K3 w - - 0 1",
    ];
    for fen in fens {
        let board = Board::from_fen(fen).unwrap();
        let side = board.side_to_move;
        for &m in movegen::legal_moves(&board).as_slice() {
            let mut child = board.clone();
            assert!(child.apply_move(m), "apply failed for {m} in {fen}");
            let king = child.king_sq(side);
            assert!(
                !child.is_square_attacked(king, side.opposite()),
                "move {m} leaves the king attacked in {fen}"
            );
        }
    }
}

#[test]
fn generated_moves_are_unique() {
    let board =
        Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
            .unwrap();
    let moves = movegen::legal_moves(&board);
    for (i, a) in moves.as_slice().iter().enumerate() {
        for b in moves.as_slice()[i + 1..].iter() {
            assert!(a != b, "duplicate move {a}");
        }
    }
}

// ---------------------------------------------------------------------------
// Random-walk properties
// ---------------------------------------------------------------------------

/// Play deterministic pseudo-random games from the start position; every
/// reached position must round-trip through FEN with a stable Zobrist key.
#[test]
fn random_walks_round_trip_fen_and_hash() {
    let mut rng: u64 = 0x00c0_ffee_d00d_f00d;
    let mut next = move || {
        rng ^= rng << 13;
        rng ^= rng >> 7;
        rng ^= rng << 17;
        rng
    };

    for _game in 0..20 {
        let mut board = Board::new();
        for _ply in 0..60 {
            let moves = movegen::legal_moves(&board);
            if moves.is_empty() {
                break;
            }
            let m = moves.as_slice()[(next() % moves.len() as u64) as usize];
            board.apply_move(m);

            let fen = board.to_fen();
            let round = Board::from_fen(&fen).expect("emitted FEN must parse");
            assert!(round == board, "FEN round trip changed the position: {fen}");
            assert_eq!(
                round.zobrist_key(),
                board.zobrist_key(),
                "hash unstable across round trip: {fen}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Completeness: exhaustive node counts from reference positions
// ---------------------------------------------------------------------------

#[test]
fn node_counts_from_the_start_position() {
    let board = Board::new();
    assert_eq!(count_nodes(&board, 1), 20);
    assert_eq!(count_nodes(&board, 2), 400);
    assert_eq!(count_nodes(&board, 3), 8_902);
    assert_eq!(count_nodes(&board, 4), 197_281);
}

#[test]
fn node_counts_with_castling_and_pins() {
    // No promotions occur within this horizon, so the classical counts
    // apply to a queen-only engine as well.
    let board =
        Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
            .unwrap();
    assert_eq!(count_nodes(&board, 1), 48);
    assert_eq!(count_nodes(&board, 2), 2_039);
    assert_eq!(count_nodes(&board, 3), 97_862);
}

#[test]
fn node_counts_with_en_passant_endgame() {
    let board = Board::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
    assert_eq!(count_nodes(&board, 1), 14);
    assert_eq!(count_nodes(&board, 2), 191);
    assert_eq!(count_nodes(&board, 3), 2_812);
    assert_eq!(count_nodes(&board, 4), 43_238);
}
