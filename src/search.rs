//! Iterative-deepening alpha-beta search with quiescence.
//!
//! Scores are always from White's point of view; the move loop runs the
//! maximizing branch when white is to move and the minimizing branch
//! otherwise. The search is single-threaded and cooperative: it checks the
//! caller's deadline at every node and invokes the yield hook at bounded
//! wall-clock intervals so an interactive host stays responsive.

use crate::board::Board;
use crate::defs::{self, Color, PieceType, Square};
use crate::evaluate::Evaluator;
use crate::movegen;
use crate::mv::{Move, MoveList};
use crate::tt::{Bound, Probe, TranspositionTable, TtEntry};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const MATE: i32 = 100_000;
pub const INFINITY: i32 = 1_000_000;
/// Scores beyond this magnitude are treated as forced mates.
pub const MATE_THRESHOLD: i32 = 99_000;

const CONTEMPT: i32 = 12;
const FUTILITY_MARGIN: i32 = 225;
const MAX_PLY: usize = 64;
const YIELD_INTERVAL: Duration = Duration::from_millis(25);

const TT_HINT_SCORE: i64 = 1_000_000_000;
const KILLER_SCORE: i64 = 500_000_000;
const CHECK_BONUS: i64 = 150;
const HISTORY_MAX: i32 = 1_000_000;

/// Draw value signed against the side to move: drawing is slightly bad for
/// whoever is on the move.
#[inline]
pub fn draw_score(side: Color) -> i32 {
    match side {
        Color::White => -CONTEMPT,
        Color::Black => CONTEMPT,
    }
}

/// Small preference for centralizing moves: 8 minus the Manhattan distance
/// of the destination from the board center.
#[inline]
fn center_bonus(sq: Square) -> i32 {
    let f = defs::file_of(sq) as i32;
    let r = defs::rank_of(sq) as i32;
    let fd = if f <= 3 { 3 - f } else { f - 4 };
    let rd = if r <= 3 { 3 - r } else { r - 4 };
    8 - (fd + rd)
}

fn is_castle_move(board: &Board, m: Move) -> bool {
    matches!(board.squares[m.from as usize], Some(p) if p.kind == PieceType::King)
        && (defs::file_of(m.from) as i8 - defs::file_of(m.to) as i8).abs() == 2
}

fn has_non_pawn_material(board: &Board, side: Color) -> bool {
    board.squares.iter().flatten().any(|p| {
        p.color == side && !matches!(p.kind, PieceType::Pawn | PieceType::King)
    })
}

/// One search run: borrowed transposition table and evaluator, killer and
/// history tables, the deadline, and the cooperative yield hook.
pub struct Search<'a> {
    tt: &'a mut TranspositionTable,
    eval: &'a dyn Evaluator,
    deadline: Option<Instant>,
    yield_hook: Option<&'a mut dyn FnMut()>,
    last_yield: Instant,
    killers: [[Option<Move>; 2]; MAX_PLY],
    history: [[[i32; 64]; 64]; 2],
    /// Position keys seen along the current path, for two-fold draw
    /// avoidance.
    rep: HashMap<u64, u32>,
    pub nodes: u64,
}

impl<'a> Search<'a> {
    pub fn new(
        tt: &'a mut TranspositionTable,
        eval: &'a dyn Evaluator,
        deadline: Option<Instant>,
        yield_hook: Option<&'a mut dyn FnMut()>,
    ) -> Self {
        Search {
            tt,
            eval,
            deadline,
            yield_hook,
            last_yield: Instant::now(),
            killers: [[None; 2]; MAX_PLY],
            history: [[[0; 64]; 64]; 2],
            rep: HashMap::new(),
            nodes: 0,
        }
    }

    /// Register a key already on the path (the root position).
    pub fn seed_repetition(&mut self, key: u64) {
        *self.rep.entry(key).or_insert(0) += 1;
    }

    #[inline]
    pub fn out_of_time(&self) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Suspension point: hand control to the host at bounded intervals.
    #[inline]
    fn checkpoint(&mut self) {
        if self.last_yield.elapsed() >= YIELD_INTERVAL {
            if let Some(hook) = self.yield_hook.as_mut() {
                hook();
            }
            self.last_yield = Instant::now();
        }
    }

    // -----------------------------------------------------------------------
    // Alpha-beta
    // -----------------------------------------------------------------------

    /// Search `board` to `depth` plies inside the (alpha, beta) window.
    /// The returned score is from White's point of view.
    pub fn alpha_beta(
        &mut self,
        board: &Board,
        depth: u8,
        alpha: i32,
        beta: i32,
        ply: u32,
    ) -> i32 {
        self.nodes += 1;
        self.checkpoint();

        let side = board.side_to_move;
        if board.halfmove_clock >= 100 || board.insufficient_material() {
            return draw_score(side);
        }

        let key = board.zobrist_key();
        if self.rep.get(&key).copied().unwrap_or(0) >= 1 {
            // Second visit on this path.
            return draw_score(side);
        }

        self.rep.insert(key, 1);
        let score = self.node(board, key, depth, alpha, beta, ply);
        self.rep.remove(&key);
        score
    }

    fn node(
        &mut self,
        board: &Board,
        key: u64,
        depth: u8,
        mut alpha: i32,
        mut beta: i32,
        ply: u32,
    ) -> i32 {
        if depth == 0 || self.out_of_time() {
            return self.quiescence(board, alpha, beta, ply);
        }

        let side = board.side_to_move;
        let maximizing = side == Color::White;
        let in_check = board.in_check();

        let moves = movegen::legal_moves(board);
        if moves.is_empty() {
            return if in_check {
                if maximizing {
                    -MATE + ply as i32
                } else {
                    MATE - ply as i32
                }
            } else {
                0
            };
        }

        // Null-move pruning: hand over the move and search shallow with a
        // null window; a refutation-free result cuts. Disabled in check and
        // when the side has only pawns left (zugzwang territory).
        if !in_check && has_non_pawn_material(board, side) {
            let stat = self.eval.evaluate(board);
            let r = if depth < 6 { 2 } else { 3 };
            if maximizing && stat >= beta {
                let null = board.make_null();
                let score =
                    self.alpha_beta(&null, depth.saturating_sub(1 + r), beta - 1, beta, ply + 1);
                if score >= beta {
                    return score;
                }
            } else if !maximizing && stat <= alpha {
                let null = board.make_null();
                let score =
                    self.alpha_beta(&null, depth.saturating_sub(1 + r), alpha, alpha + 1, ply + 1);
                if score <= alpha {
                    return score;
                }
            }
        }

        // Transposition table: exact hits return, bound hits tighten the
        // window, and shallow entries still seed move ordering.
        let mut tt_move = None;
        match self.tt.probe(key, depth) {
            Probe::Hit(entry) => {
                tt_move = entry.best_move;
                match entry.bound {
                    Bound::Exact => return entry.score,
                    Bound::Lower => alpha = alpha.max(entry.score),
                    Bound::Upper => beta = beta.min(entry.score),
                }
                if alpha >= beta {
                    return entry.score;
                }
            }
            Probe::Hint(m) => tt_move = Some(m),
            Probe::Miss => {}
        }

        let ordered = self.annotate_moves(board, &moves, tt_move, ply, depth, false);

        let alpha_entry = alpha;
        let beta_entry = beta;
        let mut best_score = if maximizing { -INFINITY } else { INFINITY };
        let mut best_move: Option<Move> = None;

        let futility_base = if depth == 1 && !in_check {
            Some(self.eval.evaluate(board))
        } else {
            None
        };

        for (idx, &(m, _)) in ordered.iter().enumerate() {
            let quiet = !movegen::is_capture(board, m);

            // Late-move pruning: quiet tail moves at shallow depth.
            if quiet && idx >= 8 && depth <= 3 && !in_check {
                continue;
            }

            // Futility: a quiet frontier move whose static eval plus margin
            // cannot reach the window.
            if let Some(stat) = futility_base {
                if quiet && idx > 0 {
                    if maximizing && stat + FUTILITY_MARGIN <= alpha {
                        continue;
                    }
                    if !maximizing && stat - FUTILITY_MARGIN >= beta {
                        continue;
                    }
                }
            }

            let mut child = board.clone();
            child.apply_move(m);

            let score = if quiet && idx >= 6 && depth >= 4 && !in_check {
                // Late-move reduction: null-window probe at reduced depth,
                // full re-search when it improves the window edge.
                let r = if idx < 10 { 1 } else { 2 };
                if maximizing {
                    let reduced =
                        self.alpha_beta(&child, depth - 1 - r, alpha, alpha + 1, ply + 1);
                    if reduced > alpha {
                        self.alpha_beta(&child, depth - 1, alpha, beta, ply + 1)
                    } else {
                        reduced
                    }
                } else {
                    let reduced =
                        self.alpha_beta(&child, depth - 1 - r, beta - 1, beta, ply + 1);
                    if reduced < beta {
                        self.alpha_beta(&child, depth - 1, alpha, beta, ply + 1)
                    } else {
                        reduced
                    }
                }
            } else {
                self.alpha_beta(&child, depth - 1, alpha, beta, ply + 1)
            };

            if maximizing {
                if score > best_score {
                    best_score = score;
                    best_move = Some(m);
                }
                if score > alpha {
                    alpha = score;
                }
            } else {
                if score < best_score {
                    best_score = score;
                    best_move = Some(m);
                }
                if score < beta {
                    beta = score;
                }
            }
            if alpha >= beta {
                self.record_cutoff(m, quiet, side, depth, ply);
                break;
            }
        }

        let bound = if best_score <= alpha_entry {
            Bound::Upper
        } else if best_score >= beta_entry {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.tt.store(TtEntry {
            key,
            depth,
            bound,
            score: best_score,
            best_move,
        });

        best_score
    }

    fn record_cutoff(&mut self, m: Move, quiet: bool, side: Color, depth: u8, ply: u32) {
        if !quiet {
            return;
        }
        let ply = ply as usize;
        if ply < MAX_PLY && self.killers[ply][0] != Some(m) {
            self.killers[ply][1] = self.killers[ply][0];
            self.killers[ply][0] = Some(m);
        }
        let bonus = (depth as i32 + 1).pow(2) * 32;
        let slot = &mut self.history[side.index()][m.from as usize][m.to as usize];
        *slot = (*slot + bonus).min(HISTORY_MAX);
    }

    // -----------------------------------------------------------------------
    // Move ordering
    // -----------------------------------------------------------------------

    /// Annotate and sort moves: TT hint, MVV-LVA for captures, killers,
    /// history and a quiet-check bonus, plus a small centralization term.
    /// The light variant (used at the root) skips the check probe.
    pub fn annotate_moves(
        &self,
        board: &Board,
        moves: &MoveList,
        tt_move: Option<Move>,
        ply: u32,
        depth: u8,
        light: bool,
    ) -> Vec<(Move, i64)> {
        let side = board.side_to_move;
        let mut probe = board.clone();
        let mut annotated: Vec<(Move, i64)> = moves
            .as_slice()
            .iter()
            .map(|&m| {
                let mut score: i64 = 0;
                if Some(m) == tt_move {
                    score += TT_HINT_SCORE;
                }
                if let Some(victim) = movegen::victim_kind(board, m) {
                    let attacker =
                        board.squares[m.from as usize].map_or(0, |p| p.kind.value());
                    score += (10 * victim.value() - attacker) as i64;
                } else {
                    let ply = ply as usize;
                    if ply < MAX_PLY {
                        if self.killers[ply][0] == Some(m) {
                            score += KILLER_SCORE;
                        } else if self.killers[ply][1] == Some(m) {
                            score += KILLER_SCORE - 1;
                        }
                    }
                    score +=
                        self.history[side.index()][m.from as usize][m.to as usize] as i64;
                    // Quiet checking moves get a nudge; skipped at shallow
                    // depth and at the root where the probe is too expensive.
                    if !light
                        && depth >= 3
                        && m.promotion.is_none()
                        && !is_castle_move(board, m)
                        && movegen::move_gives_check(&mut probe, m)
                    {
                        score += CHECK_BONUS;
                    }
                }
                score += center_bonus(m.to) as i64;
                (m, score)
            })
            .collect();
        annotated.sort_by(|a, b| b.1.cmp(&a.1));
        annotated
    }

    // -----------------------------------------------------------------------
    // Quiescence
    // -----------------------------------------------------------------------

    /// Capture-only extension (all evasions when in check). Always returns a
    /// finite white-POV score, even after the deadline has passed.
    pub fn quiescence(&mut self, board: &Board, mut alpha: i32, mut beta: i32, ply: u32) -> i32 {
        self.nodes += 1;
        self.checkpoint();

        let maximizing = board.side_to_move == Color::White;
        let stand = self.eval.evaluate(board);
        if maximizing {
            if stand >= beta {
                return stand;
            }
            if stand > alpha {
                alpha = stand;
            }
        } else {
            if stand <= alpha {
                return stand;
            }
            if stand < beta {
                beta = stand;
            }
        }

        if self.out_of_time() {
            return stand;
        }

        let in_check = board.in_check();
        let moves = movegen::legal_moves(board);
        if moves.is_empty() {
            return if in_check {
                if maximizing {
                    -MATE + ply as i32
                } else {
                    MATE - ply as i32
                }
            } else {
                0
            };
        }

        let mut candidates: Vec<(Move, i64)> = moves
            .as_slice()
            .iter()
            .filter_map(|&m| match movegen::victim_kind(board, m) {
                Some(victim) => {
                    let attacker =
                        board.squares[m.from as usize].map_or(0, |p| p.kind.value());
                    Some((m, (10 * victim.value() - attacker) as i64))
                }
                None if in_check => Some((m, 0)),
                None => None,
            })
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        let mut best = stand;
        for (m, _) in candidates {
            let mut child = board.clone();
            child.apply_move(m);
            let score = self.quiescence(&child, alpha, beta, ply + 1);
            if maximizing {
                if score > best {
                    best = score;
                }
                if best > alpha {
                    alpha = best;
                }
            } else {
                if score < best {
                    best = score;
                }
                if best < beta {
                    beta = best;
                }
            }
            if alpha >= beta {
                break;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::ClassicalEval;

    fn run(fen: &str, depth: u8) -> i32 {
        let board = Board::from_fen(fen).unwrap();
        let mut tt = TranspositionTable::new(1 << 14);
        let eval = ClassicalEval;
        let mut search = Search::new(&mut tt, &eval, None, None);
        search.alpha_beta(&board, depth, -INFINITY, INFINITY, 0)
    }

    #[test]
    fn draw_score_is_signed_against_mover() {
        assert_eq!(draw_score(Color::White), -12);
        assert_eq!(draw_score(Color::Black), 12);
    }

    #[test]
    fn center_bonus_shape() {
        assert_eq!(center_bonus(defs::from_algebraic("d4").unwrap()), 8);
        assert_eq!(center_bonus(defs::from_algebraic("e5").unwrap()), 8);
        assert_eq!(center_bonus(defs::from_algebraic("a1").unwrap()), 2);
        assert_eq!(center_bonus(defs::from_algebraic("h8").unwrap()), 2);
    }

    #[test]
    fn detects_mate_in_one_for_white() {
        // Back-rank: Ra1-a8 mates.
        let score = run("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", 2);
        assert!(score > MATE_THRESHOLD, "score {score} should be a mate");
    }

    #[test]
    fn checkmated_position_scores_against_white() {
        // The trapped white king has no escape from the queen's net.
        let score = run("8/8/8/8/8/5k2/5q2/5K2 w - - 0 1", 2);
        assert!(score < -MATE_THRESHOLD, "score {score} should be lost for white");
    }

    #[test]
    fn fifty_move_rule_returns_contempt() {
        assert_eq!(run("4k3/8/8/8/8/8/4R3/4K3 w - - 100 80", 3), -12);
        assert_eq!(run("4k3/8/8/8/8/8/4R3/4K3 b - - 100 80", 3), 12);
    }

    #[test]
    fn insufficient_material_returns_contempt() {
        assert_eq!(run("8/8/4k3/8/8/3KN3/8/8 w - - 0 1", 4), -12);
    }

    #[test]
    fn stalemate_is_zero() {
        assert_eq!(run("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", 1), 0);
    }

    #[test]
    fn yield_hook_is_invoked() {
        let board = Board::new();
        let mut tt = TranspositionTable::new(1 << 14);
        let eval = ClassicalEval;
        let mut calls = 0u32;
        let mut hook = || calls += 1;
        {
            let mut search = Search::new(&mut tt, &eval, None, Some(&mut hook));
            // Deep enough to run well past the yield interval.
            search.alpha_beta(&board, 4, -INFINITY, INFINITY, 0);
        }
        assert!(calls > 0, "the cooperative yield hook never fired");
    }
}
