//! Legal move generation.
//!
//! Pseudo moves are produced per piece, then filtered by check-evasion and
//! pin constraints, and finally every candidate passes through an
//! allocation-free do/undo legality gate: a move is legal iff the mover's
//! king is not attacked afterwards.

use crate::board::{pawn_start_rank, promotion_rank, Board, ATTACKS};
use crate::defs::{
    self, Color, Piece, PieceType, Square, A1, A8, B1, B8, BISHOP_DIRS, C1, C8, D1, D8, E1, E8,
    F1, F8, G1, G8, H1, H8, ROOK_DIRS,
};
use crate::errors::EngineError;
use crate::mv::{Move, MoveList};

/// Outcome classification for a position with respect to game termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate,
    Stalemate,
    FiftyMoveDraw,
    InsufficientMaterial,
}

// ---------------------------------------------------------------------------
// Check and pin analysis
// ---------------------------------------------------------------------------

/// Result of scanning outward from the king: who gives check, which squares
/// resolve a single check (capture or interposition), and which friendly
/// pieces are pinned to which ray.
struct CheckAnalysis {
    checkers: u8,
    /// Square of the (single) checker; only meaningful when `checkers == 1`.
    checker_sq: Square,
    /// Bitmask over squares that capture the checker or block its line.
    evasion_mask: u64,
    /// Pin direction (file, rank deltas from the king) per square.
    pins: [Option<(i8, i8)>; 64],
}

fn analyze_checks(board: &Board, side: Color, king: Square) -> CheckAnalysis {
    let enemy = side.opposite();
    let mut a = CheckAnalysis {
        checkers: 0,
        checker_sq: 64,
        evasion_mask: 0,
        pins: [None; 64],
    };

    // Pawn checkers stand one rank back along their own push direction.
    let pawn_rank = defs::rank_of(king) as i8 - enemy.pawn_dir();
    if (0..8).contains(&pawn_rank) {
        for df in [-1i8, 1] {
            let f = defs::file_of(king) as i8 + df;
            if (0..8).contains(&f) {
                let sq = defs::square_at(f as u8, pawn_rank as u8);
                if board.squares[sq as usize] == Some(Piece::new(enemy, PieceType::Pawn)) {
                    a.checkers += 1;
                    a.checker_sq = sq;
                    a.evasion_mask |= 1u64 << sq;
                }
            }
        }
    }

    for sq in ATTACKS.knight[king as usize].iter() {
        if board.squares[sq as usize] == Some(Piece::new(enemy, PieceType::Knight)) {
            a.checkers += 1;
            a.checker_sq = sq;
            a.evasion_mask |= 1u64 << sq;
        }
    }

    for &(df, dr) in BISHOP_DIRS.iter() {
        scan_ray(board, side, king, df, dr, true, &mut a);
    }
    for &(df, dr) in ROOK_DIRS.iter() {
        scan_ray(board, side, king, df, dr, false, &mut a);
    }

    a
}

/// Walk one ray away from the king. An enemy slider of matching kind with no
/// piece between gives check; with exactly one friendly piece between, that
/// piece is pinned along this ray.
fn scan_ray(
    board: &Board,
    side: Color,
    king: Square,
    df: i8,
    dr: i8,
    diagonal: bool,
    a: &mut CheckAnalysis,
) {
    let mut between: u64 = 0;
    let mut blocker: Option<Square> = None;
    let mut cur = king;
    while let Some(next) = defs::offset(cur, df, dr) {
        cur = next;
        match board.squares[cur as usize] {
            None => {
                if blocker.is_none() {
                    between |= 1u64 << cur;
                }
            }
            Some(p) if p.color == side => {
                if blocker.is_some() {
                    return;
                }
                blocker = Some(cur);
            }
            Some(p) => {
                let slides = if diagonal {
                    matches!(p.kind, PieceType::Bishop | PieceType::Queen)
                } else {
                    matches!(p.kind, PieceType::Rook | PieceType::Queen)
                };
                if slides {
                    match blocker {
                        Some(b) => a.pins[b as usize] = Some((df, dr)),
                        None => {
                            a.checkers += 1;
                            a.checker_sq = cur;
                            a.evasion_mask |= between | (1u64 << cur);
                        }
                    }
                }
                return;
            }
        }
    }
}

/// Is `to` on the line through the king with direction `dir`? A pinned piece
/// may only move along its pin ray, toward or away from the king.
#[inline]
fn on_pin_ray(king: Square, to: Square, dir: (i8, i8)) -> bool {
    let df = defs::file_of(to) as i8 - defs::file_of(king) as i8;
    let dr = defs::rank_of(to) as i8 - defs::rank_of(king) as i8;
    (df != 0 || dr != 0) && df * dir.1 == dr * dir.0
}

// ---------------------------------------------------------------------------
// Pseudo-legal generation
// ---------------------------------------------------------------------------

fn pseudo_moves(board: &Board, side: Color, list: &mut MoveList) {
    for from in 0..64u8 {
        let piece = match board.squares[from as usize] {
            Some(p) if p.color == side => p,
            _ => continue,
        };
        match piece.kind {
            PieceType::Pawn => pawn_pseudo(board, side, from, list),
            PieceType::Knight => {
                for to in ATTACKS.knight[from as usize].iter() {
                    if target_ok(board, side, to) {
                        list.add(Move::new(from, to));
                    }
                }
            }
            PieceType::Bishop => slider_pseudo(board, side, from, &BISHOP_DIRS, list),
            PieceType::Rook => slider_pseudo(board, side, from, &ROOK_DIRS, list),
            PieceType::Queen => {
                slider_pseudo(board, side, from, &BISHOP_DIRS, list);
                slider_pseudo(board, side, from, &ROOK_DIRS, list);
            }
            PieceType::King => king_pseudo(board, side, from, list, true),
        }
    }
}

#[inline]
fn target_ok(board: &Board, side: Color, to: Square) -> bool {
    match board.squares[to as usize] {
        Some(p) => p.color != side,
        None => true,
    }
}

fn pawn_pseudo(board: &Board, side: Color, from: Square, list: &mut MoveList) {
    let dir = side.pawn_dir();

    if let Some(to) = defs::offset(from, 0, dir) {
        if board.squares[to as usize].is_none() {
            add_pawn_move(side, from, to, list);
            if defs::rank_of(from) == pawn_start_rank(side) {
                if let Some(to2) = defs::offset(from, 0, 2 * dir) {
                    if board.squares[to2 as usize].is_none() {
                        list.add(Move::new(from, to2));
                    }
                }
            }
        }
    }

    for df in [-1i8, 1] {
        if let Some(to) = defs::offset(from, df, dir) {
            match board.squares[to as usize] {
                Some(p) if p.color != side => add_pawn_move(side, from, to, list),
                None if Some(to) == board.en_passant => list.add(Move::new(from, to)),
                _ => {}
            }
        }
    }
}

#[inline]
fn add_pawn_move(side: Color, from: Square, to: Square, list: &mut MoveList) {
    if defs::rank_of(to) == promotion_rank(side) {
        list.add(Move::promoting(from, to));
    } else {
        list.add(Move::new(from, to));
    }
}

fn slider_pseudo(
    board: &Board,
    side: Color,
    from: Square,
    dirs: &[(i8, i8); 4],
    list: &mut MoveList,
) {
    for &(df, dr) in dirs.iter() {
        let mut cur = from;
        while let Some(to) = defs::offset(cur, df, dr) {
            match board.squares[to as usize] {
                None => list.add(Move::new(from, to)),
                Some(p) => {
                    if p.color != side {
                        list.add(Move::new(from, to));
                    }
                    break;
                }
            }
            cur = to;
        }
    }
}

fn king_pseudo(board: &Board, side: Color, from: Square, list: &mut MoveList, castling: bool) {
    for to in ATTACKS.king[from as usize].iter() {
        if target_ok(board, side, to) {
            list.add(Move::new(from, to));
        }
    }
    if castling {
        castle_pseudo(board, side, from, list);
    }
}

/// Castling is generated only when the right is present, the king and rook
/// stand on their home squares, the path is clear, and none of the king's
/// origin, pass-through, or destination squares is attacked.
fn castle_pseudo(board: &Board, side: Color, from: Square, list: &mut MoveList) {
    let enemy = side.opposite();
    let (home, k_path, q_path, rook_k, rook_q) = match side {
        Color::White => (E1, [F1, G1], [D1, C1, B1], H1, A1),
        Color::Black => (E8, [F8, G8], [D8, C8, B8], H8, A8),
    };
    if from != home {
        return;
    }
    let rook = Piece::new(side, PieceType::Rook);

    if board.castling.kingside(side)
        && board.squares[k_path[0] as usize].is_none()
        && board.squares[k_path[1] as usize].is_none()
        && board.squares[rook_k as usize] == Some(rook)
        && !board.is_square_attacked(home, enemy)
        && !board.is_square_attacked(k_path[0], enemy)
        && !board.is_square_attacked(k_path[1], enemy)
    {
        list.add(Move::new(home, k_path[1]));
    }

    if board.castling.queenside(side)
        && board.squares[q_path[0] as usize].is_none()
        && board.squares[q_path[1] as usize].is_none()
        && board.squares[q_path[2] as usize].is_none()
        && board.squares[rook_q as usize] == Some(rook)
        && !board.is_square_attacked(home, enemy)
        && !board.is_square_attacked(q_path[0], enemy)
        && !board.is_square_attacked(q_path[1], enemy)
    {
        list.add(Move::new(home, q_path[1]));
    }
}

// ---------------------------------------------------------------------------
// do/undo legality gate
// ---------------------------------------------------------------------------

/// Play the move on the raw square array, ask whether the mover's king is
/// attacked, and restore. No allocation happens on this path.
fn leaves_king_attacked(board: &mut Board, m: Move, side: Color, king: Square) -> bool {
    let from_piece = board.squares[m.from as usize];
    let to_piece = board.squares[m.to as usize];
    let mover_kind = match from_piece {
        Some(p) => p.kind,
        None => return true,
    };

    let mut ep_restore: Option<(usize, Option<Piece>)> = None;
    if mover_kind == PieceType::Pawn
        && Some(m.to) == board.en_passant
        && defs::file_of(m.from) != defs::file_of(m.to)
        && to_piece.is_none()
    {
        let cap = (m.to as i8 - 8 * side.pawn_dir()) as usize;
        ep_restore = Some((cap, board.squares[cap]));
        board.squares[cap] = None;
    }

    board.squares[m.to as usize] = from_piece;
    board.squares[m.from as usize] = None;

    let king_sq = if mover_kind == PieceType::King { m.to } else { king };
    let attacked = board.is_square_attacked(king_sq, side.opposite());

    board.squares[m.from as usize] = from_piece;
    board.squares[m.to as usize] = to_piece;
    if let Some((cap, p)) = ep_restore {
        board.squares[cap] = p;
    }

    attacked
}

// ---------------------------------------------------------------------------
// Legal enumeration
// ---------------------------------------------------------------------------

/// Every legal move for the side to move.
pub fn legal_moves(board: &Board) -> MoveList {
    let side = board.side_to_move;
    let king = board.king_sq(side);
    let analysis = analyze_checks(board, side, king);
    let mut scratch = board.clone();
    let mut legal = MoveList::new();

    // Double check: only the king can move.
    if analysis.checkers >= 2 {
        let mut pseudo = MoveList::new();
        king_pseudo(board, side, king, &mut pseudo, false);
        for &m in pseudo.as_slice() {
            if !leaves_king_attacked(&mut scratch, m, side, king) {
                legal.add(m);
            }
        }
        return legal;
    }

    let mut pseudo = MoveList::new();
    pseudo_moves(board, side, &mut pseudo);

    for &m in pseudo.as_slice() {
        let mover = match board.squares[m.from as usize] {
            Some(p) => p,
            None => continue,
        };
        if mover.kind != PieceType::King {
            if analysis.checkers == 1 {
                let resolves = analysis.evasion_mask & (1u64 << m.to) != 0
                    || ep_captures_checker(board, m, mover, side, analysis.checker_sq);
                if !resolves {
                    continue;
                }
            }
            if let Some(dir) = analysis.pins[m.from as usize] {
                if !on_pin_ray(king, m.to, dir) {
                    continue;
                }
            }
        }
        if !leaves_king_attacked(&mut scratch, m, side, king) {
            legal.add(m);
        }
    }

    legal
}

/// An en-passant capture lands beside the checking pawn, not on it, so the
/// evasion mask misses it.
fn ep_captures_checker(
    board: &Board,
    m: Move,
    mover: Piece,
    side: Color,
    checker_sq: Square,
) -> bool {
    mover.kind == PieceType::Pawn
        && Some(m.to) == board.en_passant
        && defs::file_of(m.from) != defs::file_of(m.to)
        && (m.to as i8 - 8 * side.pawn_dir()) == checker_sq as i8
}

// ---------------------------------------------------------------------------
// Queries used by ordering and the caller boundary
// ---------------------------------------------------------------------------

/// Is the move an en-passant capture in this position?
pub fn is_en_passant(board: &Board, m: Move) -> bool {
    matches!(board.squares[m.from as usize], Some(p) if p.kind == PieceType::Pawn)
        && Some(m.to) == board.en_passant
        && defs::file_of(m.from) != defs::file_of(m.to)
        && board.squares[m.to as usize].is_none()
}

/// Does the move capture, counting en passant?
pub fn is_capture(board: &Board, m: Move) -> bool {
    board.squares[m.to as usize].is_some() || is_en_passant(board, m)
}

/// Kind of the captured piece, if any (en-passant victims are pawns).
pub fn victim_kind(board: &Board, m: Move) -> Option<PieceType> {
    if let Some(p) = board.squares[m.to as usize] {
        Some(p.kind)
    } else if is_en_passant(board, m) {
        Some(PieceType::Pawn)
    } else {
        None
    }
}

/// Would this move give check to the opponent? Uses the do/undo primitive;
/// intended for quiet non-promotion moves during ordering.
pub fn move_gives_check(board: &mut Board, m: Move) -> bool {
    let from_piece = match board.squares[m.from as usize] {
        Some(p) => p,
        None => return false,
    };
    let enemy = from_piece.color.opposite();
    let enemy_king = board.king_sq(enemy);
    let to_piece = board.squares[m.to as usize];

    board.squares[m.to as usize] = Some(from_piece);
    board.squares[m.from as usize] = None;
    let check = board.is_square_attacked(enemy_king, from_piece.color);
    board.squares[m.from as usize] = Some(from_piece);
    board.squares[m.to as usize] = to_piece;

    check
}

/// Apply a caller-supplied move after checking it against the legal set.
pub fn try_move(board: &mut Board, from: Square, to: Square) -> Result<Move, EngineError> {
    let m = legal_moves(board).find(from, to).ok_or_else(|| {
        EngineError::IllegalMove(format!(
            "{}{}",
            defs::to_algebraic(from),
            defs::to_algebraic(to)
        ))
    })?;
    board.apply_move(m);
    Ok(m)
}

/// Classify the position for game termination.
pub fn game_status(board: &Board) -> GameStatus {
    if legal_moves(board).is_empty() {
        if board.in_check() {
            GameStatus::Checkmate
        } else {
            GameStatus::Stalemate
        }
    } else if board.halfmove_clock >= 100 {
        GameStatus::FiftyMoveDraw
    } else if board.insufficient_material() {
        GameStatus::InsufficientMaterial
    } else {
        GameStatus::Ongoing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        defs::from_algebraic(name).unwrap()
    }

    #[test]
    fn start_position_has_twenty_moves() {
        let board = Board::new();
        assert_eq!(legal_moves(&board).len(), 20);
    }

    #[test]
    fn pinned_knight_cannot_move() {
        // Knight on e4 is pinned by the rook on e8 against the king on e1.
        let board = Board::from_fen("4r1k1/8/8/8/4N3/8/8/4K3 w - - 0 1").unwrap();
        let moves = legal_moves(&board);
        assert!(moves.as_slice().iter().all(|m| m.from != sq("e4")));
    }

    #[test]
    fn pinned_rook_slides_along_pin_ray() {
        // Rook on e4 pinned on the e-file may still move along the file.
        let board = Board::from_fen("4r1k1/8/8/8/4R3/8/8/4K3 w - - 0 1").unwrap();
        let moves = legal_moves(&board);
        assert!(moves.contains(Move::new(sq("e4"), sq("e8"))), "capture along ray");
        assert!(moves.contains(Move::new(sq("e4"), sq("e2"))), "retreat along ray");
        assert!(!moves.contains(Move::new(sq("e4"), sq("a4"))), "leaving the ray");
    }

    #[test]
    fn double_check_forces_king_move() {
        // Rook on e8 and bishop on h4 both check the king on e1.
        let board = Board::from_fen("4r2k/8/8/8/7b/8/3N4/4K3 w - - 0 1").unwrap();
        let moves = legal_moves(&board);
        assert!(!moves.is_empty());
        assert!(moves.as_slice().iter().all(|m| m.from == sq("e1")));
    }

    #[test]
    fn single_check_allows_block_or_flight() {
        // Rook on e8 checks the king on e1; the rook on a3 may only interpose.
        let board = Board::from_fen("4r2k/8/8/8/8/R7/8/4K3 w - - 0 1").unwrap();
        let moves = legal_moves(&board);
        assert!(moves.contains(Move::new(sq("a3"), sq("e3"))), "interpose");
        assert!(moves.contains(Move::new(sq("e1"), sq("d1"))), "flight");
        for m in moves.as_slice() {
            if m.from == sq("a3") {
                assert_eq!(m.to, sq("e3"), "non-king moves must resolve the check");
            }
        }
    }

    #[test]
    fn en_passant_pin_through_rank_is_illegal() {
        // Capturing en passant would clear rank 4 and expose the black king
        // on a4 to the rook on h4.
        let board = Board::from_fen("4K3/8/8/8/k2Pp2R/8/8/8 b - d3 0 1").unwrap();
        let moves = legal_moves(&board);
        assert!(!moves.contains(Move::new(sq("e4"), sq("d3"))));
    }

    #[test]
    fn en_passant_capture_of_checking_pawn() {
        // The double-pushed pawn on d4 checks the king on e5; exd3 removes it.
        let board = Board::from_fen("8/8/8/4k3/3Pp3/8/8/4K3 b - d3 0 1").unwrap();
        let moves = legal_moves(&board);
        assert!(moves.contains(Move::new(sq("e4"), sq("d3"))));
    }

    #[test]
    fn try_move_rejects_illegal() {
        let mut board = Board::new();
        let err = try_move(&mut board, sq("e2"), sq("e5"));
        assert!(matches!(err, Err(EngineError::IllegalMove(_))));
        assert!(try_move(&mut board, sq("e2"), sq("e4")).is_ok());
        assert_eq!(board.side_to_move, Color::Black);
    }

    #[test]
    fn status_classification() {
        let stalemate = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(game_status(&stalemate), GameStatus::Stalemate);

        let checkmate = Board::from_fen("7k/5Q1K/8/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(game_status(&checkmate), GameStatus::Checkmate);

        let ongoing = Board::new();
        assert_eq!(game_status(&ongoing), GameStatus::Ongoing);

        let fifty =
            Board::from_fen("4k3/8/8/8/8/8/4R3/4K3 w - - 100 80").unwrap();
        assert_eq!(game_status(&fifty), GameStatus::FiftyMoveDraw);

        let bare = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(game_status(&bare), GameStatus::InsufficientMaterial);
    }
}
