//! Error types surfaced at the engine boundary.

use thiserror::Error;

/// Errors reported by the position codec and the move boundary.
///
/// Weight-load failures never appear here: the evaluator entry point falls
/// back to classical evaluation instead of propagating them. A search asked
/// to move a side with no legal moves returns `None` rather than an error.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The FEN string could not be parsed.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    /// A caller-supplied move is not in the legal move set.
    #[error("illegal move: {0}")]
    IllegalMove(String),
}

/// Result alias for fallible engine-boundary operations.
pub type EngineResult<T> = Result<T, EngineError>;
