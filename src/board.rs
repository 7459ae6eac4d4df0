//! Mailbox board representation and move application.

use crate::defs::{
    self, AttackTables, CastlingRights, Color, Piece, PieceType, Square, Zobrist, A1, A8, BISHOP_DIRS,
    C1, C8, D1, D8, E1, E8, F1, F8, G1, G8, H1, H8, ROOK_DIRS,
};
use crate::mv::Move;
use std::fmt;

lazy_static::lazy_static! {
    pub static ref ZOBRIST: Zobrist = defs::get_zobrist_keys();
    pub static ref ATTACKS: AttackTables = defs::get_attack_tables();
}

/// Revocation mask indexed by square: whenever a move touches a square, the
/// castling rights are ANDed with this entry. Rook home squares clear one
/// right, king home squares clear both of that color's rights.
#[rustfmt::skip]
const CASTLE_MASK: [u8; 64] = {
    let mut mask = [0b1111u8; 64];
    mask[A8 as usize] = 0b1111 & !CastlingRights::BLACK_QUEENSIDE;
    mask[E8 as usize] = 0b1111 & !(CastlingRights::BLACK_KINGSIDE | CastlingRights::BLACK_QUEENSIDE);
    mask[H8 as usize] = 0b1111 & !CastlingRights::BLACK_KINGSIDE;
    mask[A1 as usize] = 0b1111 & !CastlingRights::WHITE_QUEENSIDE;
    mask[E1 as usize] = 0b1111 & !(CastlingRights::WHITE_KINGSIDE | CastlingRights::WHITE_QUEENSIDE);
    mask[H1 as usize] = 0b1111 & !CastlingRights::WHITE_KINGSIDE;
    mask
};

/// Rank a pawn of the given color promotes on.
#[inline]
pub const fn promotion_rank(color: Color) -> u8 {
    match color {
        Color::White => 0,
        Color::Black => 7,
    }
}

/// Rank a pawn of the given color starts on (two-square pushes allowed).
#[inline]
pub const fn pawn_start_rank(color: Color) -> u8 {
    match color {
        Color::White => 6,
        Color::Black => 1,
    }
}

/// For a castling king destination, the rook's (from, to) squares.
fn castling_rook_squares(king_to: Square) -> Option<(Square, Square)> {
    match king_to {
        G1 => Some((H1, F1)),
        C1 => Some((A1, D1)),
        G8 => Some((H8, F8)),
        C8 => Some((A8, D8)),
        _ => None,
    }
}

/// Represents the state of the chess board.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    pub squares: [Option<Piece>; 64],
    pub side_to_move: Color,
    pub castling: CastlingRights,
    /// The square a pawn can be captured ON, not the pusher's square.
    pub en_passant: Option<Square>,
    pub halfmove_clock: u16,
    pub fullmove_number: u16,
}

impl Board {
    /// An empty board: no pieces, white to move, no rights.
    pub fn empty() -> Self {
        Board {
            squares: [None; 64],
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// The standard starting position.
    pub fn new() -> Self {
        let mut board = Board::empty();
        board.castling = CastlingRights::ALL;

        let back = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];
        for (file, &kind) in back.iter().enumerate() {
            board.squares[defs::square_at(file as u8, 0) as usize] =
                Some(Piece::new(Color::Black, kind));
            board.squares[defs::square_at(file as u8, 7) as usize] =
                Some(Piece::new(Color::White, kind));
            board.squares[defs::square_at(file as u8, 1) as usize] =
                Some(Piece::new(Color::Black, PieceType::Pawn));
            board.squares[defs::square_at(file as u8, 6) as usize] =
                Some(Piece::new(Color::White, PieceType::Pawn));
        }
        board
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq as usize]
    }

    /// Locate the king of a color. Positions always carry exactly one king
    /// per side; an empty result means the board was built inconsistently.
    pub fn king_sq(&self, color: Color) -> Square {
        for sq in 0..64u8 {
            if let Some(p) = self.squares[sq as usize] {
                if p.color == color && p.kind == PieceType::King {
                    return sq;
                }
            }
        }
        debug_assert!(false, "no {color:?} king on the board");
        0
    }

    // -----------------------------------------------------------------------
    // Attack detection
    // -----------------------------------------------------------------------

    /// Is `sq` attacked by any piece of `by`? Works by shooting the inverse
    /// attack from the target square and checking the endpoint.
    pub fn is_square_attacked(&self, sq: Square, by: Color) -> bool {
        let tables = &*ATTACKS;

        // Pawns: a `by` pawn one rank behind its push direction, adjacent file.
        let pawn_rank = defs::rank_of(sq) as i8 - by.pawn_dir();
        if (0..8).contains(&pawn_rank) {
            for df in [-1i8, 1] {
                let f = defs::file_of(sq) as i8 + df;
                if (0..8).contains(&f) {
                    let from = defs::square_at(f as u8, pawn_rank as u8);
                    if self.squares[from as usize]
                        == Some(Piece::new(by, PieceType::Pawn))
                    {
                        return true;
                    }
                }
            }
        }

        for from in tables.knight[sq as usize].iter() {
            if self.squares[from as usize] == Some(Piece::new(by, PieceType::Knight)) {
                return true;
            }
        }

        for from in tables.king[sq as usize].iter() {
            if self.squares[from as usize] == Some(Piece::new(by, PieceType::King)) {
                return true;
            }
        }

        // Sliders: walk each ray until the first occupied square.
        for &(df, dr) in BISHOP_DIRS.iter() {
            if let Some(p) = self.first_piece_on_ray(sq, df, dr) {
                if p.color == by
                    && (p.kind == PieceType::Bishop || p.kind == PieceType::Queen)
                {
                    return true;
                }
            }
        }
        for &(df, dr) in ROOK_DIRS.iter() {
            if let Some(p) = self.first_piece_on_ray(sq, df, dr) {
                if p.color == by && (p.kind == PieceType::Rook || p.kind == PieceType::Queen) {
                    return true;
                }
            }
        }

        false
    }

    fn first_piece_on_ray(&self, sq: Square, df: i8, dr: i8) -> Option<Piece> {
        let mut cur = sq;
        while let Some(next) = defs::offset(cur, df, dr) {
            if let Some(p) = self.squares[next as usize] {
                return Some(p);
            }
            cur = next;
        }
        None
    }

    /// Is the side to move in check?
    #[inline]
    pub fn in_check(&self) -> bool {
        let king = self.king_sq(self.side_to_move);
        self.is_square_attacked(king, self.side_to_move.opposite())
    }

    // -----------------------------------------------------------------------
    // Move application
    // -----------------------------------------------------------------------

    /// Apply a legal move, mutating the position: captures, promotion to
    /// queen, en-passant capture, castling rook move, right revocation,
    /// en-passant publication, clocks, and the side flip.
    ///
    /// Returns false (leaving the position untouched) when the from-square
    /// is empty; legality beyond that is the move generator's business.
    pub fn apply_move(&mut self, m: Move) -> bool {
        let piece = match self.squares[m.from as usize] {
            Some(p) => p,
            None => return false,
        };
        let side = piece.color;
        let is_pawn = piece.kind == PieceType::Pawn;
        let is_en_passant = is_pawn
            && Some(m.to) == self.en_passant
            && defs::file_of(m.from) != defs::file_of(m.to)
            && self.squares[m.to as usize].is_none();
        let is_castle = piece.kind == PieceType::King
            && (defs::file_of(m.from) as i8 - defs::file_of(m.to) as i8).abs() == 2;
        let captures = self.squares[m.to as usize].is_some() || is_en_passant;

        if is_pawn || captures {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        self.squares[m.to as usize] = Some(piece);
        self.squares[m.from as usize] = None;

        if is_en_passant {
            // The captured pawn sits one rank behind the target square.
            let cap_sq = (m.to as i8 - 8 * side.pawn_dir()) as usize;
            self.squares[cap_sq] = None;
        }

        if is_pawn && defs::rank_of(m.to) == promotion_rank(side) {
            self.squares[m.to as usize] = Some(Piece::new(side, PieceType::Queen));
        }

        if is_castle {
            if let Some((rook_from, rook_to)) = castling_rook_squares(m.to) {
                self.squares[rook_to as usize] = self.squares[rook_from as usize].take();
            }
        }

        self.castling.0 &= CASTLE_MASK[m.from as usize];
        self.castling.0 &= CASTLE_MASK[m.to as usize];

        self.en_passant = if is_pawn && (m.to as i8 - m.from as i8).abs() == 16 {
            Some((m.from + m.to) / 2)
        } else {
            None
        };

        self.side_to_move = side.opposite();
        if self.side_to_move == Color::White {
            self.fullmove_number += 1;
        }
        true
    }

    /// Pass the move to the opponent without playing one. Used by null-move
    /// pruning; the en-passant square cannot survive a null move.
    pub fn make_null(&self) -> Board {
        let mut child = self.clone();
        child.side_to_move = self.side_to_move.opposite();
        child.en_passant = None;
        child
    }

    // -----------------------------------------------------------------------
    // Zobrist hashing
    // -----------------------------------------------------------------------

    /// The 64-bit position key: XOR of the applicable piece, castling,
    /// en-passant-file, and side-to-move constants.
    ///
    /// The en-passant file participates only when a side-to-move pawn can
    /// actually play the capture, so positions that differ in a stale
    /// en-passant square hash identically.
    pub fn zobrist_key(&self) -> u64 {
        let z = &*ZOBRIST;
        let mut h = 0u64;
        for sq in 0..64usize {
            if let Some(p) = self.squares[sq] {
                h ^= z.pieces[p.color.index()][p.kind.index()][sq];
            }
        }
        if self.side_to_move == Color::Black {
            h ^= z.side;
        }
        for (i, flag) in [
            CastlingRights::WHITE_KINGSIDE,
            CastlingRights::WHITE_QUEENSIDE,
            CastlingRights::BLACK_KINGSIDE,
            CastlingRights::BLACK_QUEENSIDE,
        ]
        .into_iter()
        .enumerate()
        {
            if self.castling.has(flag) {
                h ^= z.castling[i];
            }
        }
        if let Some(ep) = self.en_passant {
            if self.ep_capture_possible() {
                h ^= z.en_passant[defs::file_of(ep) as usize];
            }
        }
        h
    }

    /// Does a pawn of the side to move stand ready to capture on the
    /// en-passant square?
    pub fn ep_capture_possible(&self) -> bool {
        let ep = match self.en_passant {
            Some(sq) => sq,
            None => return false,
        };
        let side = self.side_to_move;
        // The capturer stands one rank behind the target along its own
        // push direction, on an adjacent file.
        let src_rank = defs::rank_of(ep) as i8 - side.pawn_dir();
        if !(0..8).contains(&src_rank) {
            return false;
        }
        for df in [-1i8, 1] {
            let f = defs::file_of(ep) as i8 + df;
            if (0..8).contains(&f) {
                let from = defs::square_at(f as u8, src_rank as u8);
                if self.squares[from as usize] == Some(Piece::new(side, PieceType::Pawn)) {
                    return true;
                }
            }
        }
        false
    }

    // -----------------------------------------------------------------------
    // Draw material
    // -----------------------------------------------------------------------

    /// Neither side can force mate: no pawns, rooks, or queens, and the
    /// minor-piece balance is K vs K, a single minor vs a bare king, two
    /// knights vs a bare king, or same-colored lone bishops.
    pub fn insufficient_material(&self) -> bool {
        let mut knights = [0u8; 2];
        let mut bishops = [0u8; 2];
        let mut bishop_shade = [0u8; 2];
        for sq in 0..64u8 {
            let p = match self.squares[sq as usize] {
                Some(p) => p,
                None => continue,
            };
            match p.kind {
                PieceType::Pawn | PieceType::Rook | PieceType::Queen => return false,
                PieceType::Knight => knights[p.color.index()] += 1,
                PieceType::Bishop => {
                    bishops[p.color.index()] += 1;
                    bishop_shade[p.color.index()] =
                        (defs::file_of(sq) + defs::rank_of(sq)) % 2;
                }
                PieceType::King => {}
            }
        }
        let w = knights[0] + bishops[0];
        let b = knights[1] + bishops[1];
        match (w, b) {
            (0, 0) | (1, 0) | (0, 1) => true,
            (2, 0) => knights[0] == 2,
            (0, 2) => knights[1] == 2,
            (1, 1) => {
                bishops[0] == 1 && bishops[1] == 1 && bishop_shade[0] == bishop_shade[1]
            }
            _ => false,
        }
    }

    /// Render the board as a text grid (rank 8 at the top).
    pub fn board_string(&self) -> String {
        let mut s = String::with_capacity(300);
        s.push_str("  +---+---+---+---+---+---+---+---+\n");
        for rank in 0..8u8 {
            s.push_str(&format!("{} |", 8 - rank));
            for file in 0..8u8 {
                let sq = defs::square_at(file, rank);
                match self.squares[sq as usize] {
                    Some(p) => s.push_str(&format!(" {} |", p.kind.to_char(p.color))),
                    None => s.push_str("   |"),
                }
            }
            s.push_str("\n  +---+---+---+---+---+---+---+---+\n");
        }
        s.push_str("    a   b   c   d   e   f   g   h");
        s
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board_string())
    }
}
