//! Position evaluation.
//!
//! Both evaluators implement [`Evaluator`]: position in, centipawns from
//! White's point of view out. The classical function lives here; the neural
//! one is in `model`.

use crate::board::Board;
use crate::defs::{Color, PieceType};
use crate::movegen;

/// Contract shared by all evaluators: a pure function of the position
/// returning a white-POV centipawn score.
pub trait Evaluator {
    fn evaluate(&self, board: &Board) -> i32;
}

// --- Piece-Square Tables ---
// White perspective with rank 8 as the first row, so the board index maps
// straight in for white; black mirrors vertically (sq ^ 56).

#[rustfmt::skip]
const PAWN_PST: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    20, 20, 20, 20, 20, 20, 20, 20,
     4,  4,  8, 12, 12,  8,  4,  4,
     2,  2,  4, 10, 10,  4,  2,  2,
     0,  0,  0,  8,  8,  0,  0,  0,
     2, -2, -4,  0,  0, -4, -2,  2,
     2,  4,  4, -8, -8,  4,  4,  2,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_PST: [i32; 64] = [
    -20,-16,-12,-12,-12,-12,-16,-20,
    -16, -8,  0,  0,  0,  0, -8,-16,
    -12,  0,  4,  6,  6,  4,  0,-12,
    -12,  2,  6,  8,  8,  6,  2,-12,
    -12,  0,  6,  8,  8,  6,  0,-12,
    -12,  2,  4,  6,  6,  4,  2,-12,
    -16, -8,  0,  2,  2,  0, -8,-16,
    -20,-16,-12,-12,-12,-12,-16,-20,
];

#[rustfmt::skip]
const BISHOP_PST: [i32; 64] = [
    -8, -4, -4, -4, -4, -4, -4, -8,
    -4,  0,  0,  0,  0,  0,  0, -4,
    -4,  0,  2,  4,  4,  2,  0, -4,
    -4,  2,  2,  4,  4,  2,  2, -4,
    -4,  0,  4,  4,  4,  4,  0, -4,
    -4,  4,  4,  4,  4,  4,  4, -4,
    -4,  2,  0,  0,  0,  0,  2, -4,
    -8, -4, -4, -4, -4, -4, -4, -8,
];

#[rustfmt::skip]
const ROOK_PST: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     2,  4,  4,  4,  4,  4,  4,  2,
    -2,  0,  0,  0,  0,  0,  0, -2,
    -2,  0,  0,  0,  0,  0,  0, -2,
    -2,  0,  0,  0,  0,  0,  0, -2,
    -2,  0,  0,  0,  0,  0,  0, -2,
    -2,  0,  0,  0,  0,  0,  0, -2,
     0,  0,  0,  2,  2,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_PST: [i32; 64] = [
    -8, -4, -4, -2, -2, -4, -4, -8,
    -4,  0,  0,  0,  0,  0,  0, -4,
    -4,  0,  2,  2,  2,  2,  0, -4,
    -2,  0,  2,  2,  2,  2,  0, -2,
     0,  0,  2,  2,  2,  2,  0, -2,
    -4,  2,  2,  2,  2,  2,  0, -4,
    -4,  0,  2,  0,  0,  0,  0, -4,
    -8, -4, -4, -2, -2, -4, -4, -8,
];

#[rustfmt::skip]
const KING_PST: [i32; 64] = [
    -12,-16,-16,-20,-20,-16,-16,-12,
    -12,-16,-16,-20,-20,-16,-16,-12,
    -12,-16,-16,-20,-20,-16,-16,-12,
    -12,-16,-16,-20,-20,-16,-16,-12,
     -8,-12,-12,-16,-16,-12,-12, -8,
     -4, -8, -8, -8, -8, -8, -8, -4,
      8,  8,  0,  0,  0,  0,  8,  8,
      8, 12,  4,  0,  0,  4, 12,  8,
];

const PSTS: [&[i32; 64]; 6] = [
    &PAWN_PST, &KNIGHT_PST, &BISHOP_PST, &ROOK_PST, &QUEEN_PST, &KING_PST,
];

const BISHOP_PAIR_BONUS: i32 = 30;
const TEMPO_BONUS: i32 = 8;
const MOBILITY_WEIGHT: i32 = 2;

/// Material + piece-square + bishop pair + mobility + tempo.
pub struct ClassicalEval;

impl Evaluator for ClassicalEval {
    fn evaluate(&self, board: &Board) -> i32 {
        let mut score = 0;
        let mut bishops = [0i32; 2];

        for sq in 0..64usize {
            let p = match board.squares[sq] {
                Some(p) => p,
                None => continue,
            };
            let pst_sq = match p.color {
                Color::White => sq,
                Color::Black => sq ^ 56,
            };
            let value = p.kind.value() + PSTS[p.kind.index()][pst_sq];
            match p.color {
                Color::White => score += value,
                Color::Black => score -= value,
            }
            if p.kind == PieceType::Bishop {
                bishops[p.color.index()] += 1;
            }
        }

        if bishops[0] >= 2 {
            score += BISHOP_PAIR_BONUS;
        }
        if bishops[1] >= 2 {
            score -= BISHOP_PAIR_BONUS;
        }

        score += MOBILITY_WEIGHT * mobility_balance(board);

        score += match board.side_to_move {
            Color::White => TEMPO_BONUS,
            Color::Black => -TEMPO_BONUS,
        };

        score
    }
}

/// White legal-move count minus black legal-move count. The off-move side is
/// evaluated on a copy with the turn handed over; a stale en-passant square
/// must not leak to the other side.
fn mobility_balance(board: &Board) -> i32 {
    let count_for = |color: Color| -> i32 {
        if board.side_to_move == color {
            movegen::legal_moves(board).len() as i32
        } else {
            let mut flipped = board.clone();
            flipped.side_to_move = color;
            flipped.en_passant = None;
            movegen::legal_moves(&flipped).len() as i32
        }
    };
    count_for(Color::White) - count_for(Color::Black)
}
