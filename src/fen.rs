//! FEN parsing and generation for `Board`.
//!
//! Parsing is strict on the six-field structure and on the placement field,
//! tolerant on surrounding whitespace.

use crate::board::Board;
use crate::defs::{self, Color, PieceType};
use crate::errors::EngineError;

impl Board {
    /// Parse a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, EngineError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(EngineError::InvalidFen(format!(
                "expected 6 fields, got {}",
                fields.len()
            )));
        }

        let mut board = Board::empty();

        // Field 1: piece placement, ranks from the top (rank 8) down.
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(EngineError::InvalidFen(format!(
                "expected 8 ranks, got {}",
                ranks.len()
            )));
        }
        for (rank, rank_str) in ranks.iter().enumerate() {
            let mut file: u8 = 0;
            for ch in rank_str.chars() {
                if file > 7 && !ch.is_ascii_digit() {
                    return Err(EngineError::InvalidFen(format!(
                        "rank {} overflows 8 files",
                        8 - rank
                    )));
                }
                if let Some(digit) = ch.to_digit(10) {
                    if !(1..=8).contains(&digit) {
                        return Err(EngineError::InvalidFen(format!(
                            "bad empty-run digit '{ch}'"
                        )));
                    }
                    file += digit as u8;
                    if file > 8 {
                        return Err(EngineError::InvalidFen(format!(
                            "rank {} overflows 8 files",
                            8 - rank
                        )));
                    }
                } else if let Some((color, kind)) = PieceType::from_char(ch) {
                    let sq = defs::square_at(file, rank as u8);
                    board.squares[sq as usize] = Some(defs::Piece::new(color, kind));
                    file += 1;
                } else {
                    return Err(EngineError::InvalidFen(format!(
                        "unknown placement character '{ch}'"
                    )));
                }
            }
            if file != 8 {
                return Err(EngineError::InvalidFen(format!(
                    "rank {} has {file} files instead of 8",
                    8 - rank
                )));
            }
        }

        // Exactly one king per side.
        for color in [Color::White, Color::Black] {
            let kings = board
                .squares
                .iter()
                .flatten()
                .filter(|p| p.color == color && p.kind == PieceType::King)
                .count();
            if kings != 1 {
                return Err(EngineError::InvalidFen(format!(
                    "{color:?} has {kings} kings"
                )));
            }
        }

        // Field 2: active color.
        board.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(EngineError::InvalidFen(format!(
                    "bad active color '{other}'"
                )))
            }
        };

        // Field 3: castling availability.
        board.castling = defs::CastlingRights::from_fen(fields[2]).ok_or_else(|| {
            EngineError::InvalidFen(format!("bad castling field '{}'", fields[2]))
        })?;

        // Field 4: en-passant target square.
        if fields[3] != "-" {
            let ep = defs::from_algebraic(fields[3]).ok_or_else(|| {
                EngineError::InvalidFen(format!("bad en-passant square '{}'", fields[3]))
            })?;
            let rank = defs::rank_of(ep);
            if rank != 2 && rank != 5 {
                return Err(EngineError::InvalidFen(format!(
                    "en-passant square '{}' not on rank 3 or 6",
                    fields[3]
                )));
            }
            board.en_passant = Some(ep);
        }

        // Fields 5 and 6: clocks.
        board.halfmove_clock = fields[4].parse::<u16>().map_err(|_| {
            EngineError::InvalidFen(format!("bad halfmove clock '{}'", fields[4]))
        })?;
        board.fullmove_number = fields[5].parse::<u16>().map_err(|_| {
            EngineError::InvalidFen(format!("bad fullmove number '{}'", fields[5]))
        })?;
        if board.fullmove_number == 0 {
            return Err(EngineError::InvalidFen(
                "fullmove number must be at least 1".to_string(),
            ));
        }

        Ok(board)
    }

    /// Emit the position as a FEN string.
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(80);

        for rank in 0..8u8 {
            let mut empty = 0u8;
            for file in 0..8u8 {
                let sq = defs::square_at(file, rank);
                match self.squares[sq as usize] {
                    Some(p) => {
                        if empty > 0 {
                            fen.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        fen.push(p.kind.to_char(p.color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push((b'0' + empty) as char);
            }
            if rank < 7 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        fen.push_str(&self.castling.to_fen());

        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&defs::to_algebraic(sq)),
            None => fen.push('-'),
        }

        fen.push(' ');
        fen.push_str(&self.halfmove_clock.to_string());
        fen.push(' ');
        fen.push_str(&self.fullmove_number.to_string());

        fen
    }
}
