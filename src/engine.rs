//! Root driver: iterative deepening over the legal root moves, the hint
//! cache, and training-sample emission.

use crate::board::Board;
use crate::book::{now_millis, HintCache, HintEntry};
use crate::defs::{self, Color};
use crate::evaluate::Evaluator;
use crate::movegen;
use crate::mv::Move;
use crate::search::{Search, INFINITY, MATE_THRESHOLD};
use crate::tt::TranspositionTable;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

/// Aspiration window half-width and the depth it switches on.
const ASPIRATION_WINDOW: i32 = 200;
const ASPIRATION_MIN_DEPTH: u8 = 5;
/// Do not start another root move with less than this much time left.
const PER_MOVE_TIME_GUARD: Duration = Duration::from_millis(140);
/// Hints below this depth are ignored when seeding root ordering.
const HINT_MIN_DEPTH: u8 = 2;

/// Search budget: a depth limit and an optional wall-clock limit.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub max_depth: u8,
    pub time_ms: Option<u64>,
}

impl SearchLimits {
    pub fn depth(max_depth: u8) -> Self {
        SearchLimits {
            max_depth,
            time_ms: None,
        }
    }
}

/// Result of a completed search.
#[derive(Debug, Clone, Copy)]
pub struct SearchOutcome {
    pub best_move: Move,
    /// Deepest fully-searched iteration.
    pub depth: u8,
    /// White-POV centipawns.
    pub score_cp: i32,
}

/// One labeled position emitted per completed iteration.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    pub fen: String,
    /// Side-to-move POV centipawns, the convention the training pipeline
    /// expects.
    pub score_cp: i32,
    pub depth: u8,
    pub from: String,
    pub to: String,
    pub key_hex: String,
    pub timestamp: u64,
}

/// Receives labeled positions. The engine itself never persists anything.
pub trait SampleSink {
    fn emit(&mut self, sample: &Sample);
}

/// Streams samples as JSON lines, one object per row.
pub struct JsonlSink {
    writer: std::io::BufWriter<std::fs::File>,
    written: u64,
}

impl JsonlSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = std::fs::File::create(path.as_ref())
            .with_context(|| format!("failed to create {}", path.as_ref().display()))?;
        Ok(JsonlSink {
            writer: std::io::BufWriter::new(file),
            written: 0,
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("failed to flush sample sink")
    }
}

impl SampleSink for JsonlSink {
    fn emit(&mut self, sample: &Sample) {
        match serde_json::to_string(sample) {
            Ok(line) => {
                if writeln!(self.writer, "{line}").is_ok() {
                    self.written += 1;
                    if self.written % 256 == 0 {
                        let _ = self.writer.flush();
                    }
                }
            }
            Err(e) => eprintln!("[WARN] dropping sample: {e}"),
        }
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// The engine: transposition table, hint cache, and sample plumbing.
pub struct Engine {
    tt: TranspositionTable,
    pub book: HintCache,
    sink: Option<Box<dyn SampleSink>>,
    yield_hook: Option<Box<dyn FnMut()>>,
    /// Iterations shallower than this are not emitted as samples.
    pub min_logged_depth: u8,
    /// Print `info depth ...` lines per completed iteration.
    pub verbose: bool,
    pub samples_emitted: u64,
}

impl Engine {
    pub fn new(tt_entries: usize) -> Self {
        Engine {
            tt: TranspositionTable::new(tt_entries),
            book: HintCache::new(),
            sink: None,
            yield_hook: None,
            min_logged_depth: 3,
            verbose: false,
            samples_emitted: 0,
        }
    }

    pub fn set_sample_sink(&mut self, sink: Box<dyn SampleSink>) {
        self.sink = Some(sink);
    }

    /// Install the cooperative yield callback the search invokes at bounded
    /// wall-clock intervals. On preemptive hosts this can stay unset.
    pub fn set_yield_hook(&mut self, hook: Box<dyn FnMut()>) {
        self.yield_hook = Some(hook);
    }

    pub fn clear_tables(&mut self) {
        self.tt.clear();
    }

    /// Pick the principal move for the position.
    ///
    /// Iterates depths up to the budget, aborting on the deadline, and
    /// returns the best move of the last fully-searched iteration together
    /// with its white-POV score. `None` means the side to move has no legal
    /// moves; whether that is mate or stalemate is the caller's question
    /// (`movegen::game_status` answers it).
    pub fn pick_move(
        &mut self,
        board: &Board,
        limits: SearchLimits,
        eval: &dyn Evaluator,
    ) -> Option<SearchOutcome> {
        let root_moves = movegen::legal_moves(board);
        if root_moves.is_empty() {
            return None;
        }

        let start = Instant::now();
        let deadline = limits.time_ms.map(|ms| start + Duration::from_millis(ms));
        let key = board.zobrist_key();
        let maximizing = board.side_to_move == Color::White;

        let hint = self
            .book
            .probe(key, HINT_MIN_DEPTH)
            .map(|e| Move::new(e.from, e.to))
            .and_then(|m| root_moves.find(m.from, m.to));

        let yield_hook: Option<&mut dyn FnMut()> = match self.yield_hook.as_mut() {
            Some(hook) => Some(&mut **hook),
            None => None,
        };
        let mut search = Search::new(&mut self.tt, eval, deadline, yield_hook);
        search.seed_repetition(key);

        // Light root ordering: hint first, no check probes.
        let mut ordered: Vec<Move> = search
            .annotate_moves(board, &root_moves, hint, 0, 0, true)
            .into_iter()
            .map(|(m, _)| m)
            .collect();

        let mut best: Option<SearchOutcome> = None;
        let mut last_score = 0i32;

        'deepening: for depth in 1..=limits.max_depth.max(1) {
            let mut window = if depth >= ASPIRATION_MIN_DEPTH {
                (last_score - ASPIRATION_WINDOW, last_score + ASPIRATION_WINDOW)
            } else {
                (-INFINITY, INFINITY)
            };

            loop {
                let mut iter_best: Option<(Move, i32)> = None;
                let mut aborted = false;

                for &m in ordered.iter() {
                    if depth > 1 {
                        if let Some(deadline) = deadline {
                            if deadline.saturating_duration_since(Instant::now())
                                < PER_MOVE_TIME_GUARD
                            {
                                aborted = true;
                                break;
                            }
                        }
                    }

                    let mut child = board.clone();
                    child.apply_move(m);
                    let score = search.alpha_beta(&child, depth - 1, window.0, window.1, 1);

                    // A score produced after the deadline came from truncated
                    // subtrees; discard the iteration once an earlier depth
                    // has already been committed.
                    if search.out_of_time() && best.is_some() {
                        aborted = true;
                        break;
                    }

                    let better = match iter_best {
                        None => true,
                        Some((_, s)) => {
                            if maximizing {
                                score > s
                            } else {
                                score < s
                            }
                        }
                    };
                    if better {
                        iter_best = Some((m, score));
                    }
                }

                if aborted {
                    break 'deepening;
                }
                let (iter_move, iter_score) = match iter_best {
                    Some(found) => found,
                    None => break 'deepening,
                };

                // Root aspiration failure: retry this depth full-width.
                let full_width = window.0 <= -INFINITY && window.1 >= INFINITY;
                if !full_width && (iter_score <= window.0 || iter_score >= window.1) {
                    window = (-INFINITY, INFINITY);
                    continue;
                }

                best = Some(SearchOutcome {
                    best_move: iter_move,
                    depth,
                    score_cp: iter_score,
                });
                last_score = iter_score;

                // Keep the ordering from this iteration, best move in front.
                if let Some(pos) = ordered.iter().position(|&m| m == iter_move) {
                    let m = ordered.remove(pos);
                    ordered.insert(0, m);
                }

                if self.verbose {
                    let elapsed = start.elapsed();
                    let nps = (search.nodes * 1000) / (elapsed.as_millis() as u64 + 1);
                    println!(
                        "info depth {} score cp {} nodes {} nps {} pv {}",
                        depth, iter_score, search.nodes, nps, iter_move
                    );
                }

                if depth >= self.min_logged_depth {
                    if let Some(sink) = self.sink.as_mut() {
                        let stm_score = match board.side_to_move {
                            Color::White => iter_score,
                            Color::Black => -iter_score,
                        };
                        sink.emit(&Sample {
                            fen: board.to_fen(),
                            score_cp: stm_score,
                            depth,
                            from: defs::to_algebraic(iter_move.from),
                            to: defs::to_algebraic(iter_move.to),
                            key_hex: format!("{key:016x}"),
                            timestamp: now_millis(),
                        });
                        self.samples_emitted += 1;
                    }
                }

                if iter_score.abs() > MATE_THRESHOLD {
                    break 'deepening;
                }
                break;
            }
        }

        if let Some(outcome) = best {
            self.book.store(
                key,
                HintEntry {
                    from: outcome.best_move.from,
                    to: outcome.best_move.to,
                    score: outcome.score_cp,
                    depth: outcome.depth,
                    tag: "search".to_string(),
                    timestamp: now_millis(),
                },
            );
        }

        best
    }
}
