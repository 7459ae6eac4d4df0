//! Lodestar - command-line driver.
//!
//! Parses a position, runs the root driver under the requested budget, and
//! prints the chosen move with its score.
//!
//! Usage: lodestar [--fen FEN] [--depth N] [--time-ms MS] [--weights PATH] [--book PATH]

use anyhow::{bail, Result};
use lodestar::board::Board;
use lodestar::book::HintCache;
use lodestar::defs::Color;
use lodestar::engine::{Engine, SearchLimits};
use lodestar::model;
use lodestar::movegen::{self, GameStatus};

struct Args {
    fen: Option<String>,
    depth: u8,
    time_ms: Option<u64>,
    weights: Option<String>,
    book: Option<String>,
}

fn parse_args() -> Result<Option<Args>> {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args {
        fen: None,
        depth: 6,
        time_ms: None,
        weights: None,
        book: None,
    };

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--fen" | "-f" => {
                i += 1;
                args.fen = Some(argv.get(i).cloned().unwrap_or_default());
            }
            "--depth" | "-d" => {
                i += 1;
                args.depth = argv
                    .get(i)
                    .map(|s| s.parse())
                    .transpose()?
                    .unwrap_or(args.depth);
            }
            "--time-ms" | "-t" => {
                i += 1;
                args.time_ms = argv.get(i).map(|s| s.parse()).transpose()?;
            }
            "--weights" | "-w" => {
                i += 1;
                args.weights = argv.get(i).cloned();
            }
            "--book" | "-b" => {
                i += 1;
                args.book = argv.get(i).cloned();
            }
            "--help" | "-h" => {
                println!(
                    "Usage: lodestar [--fen FEN] [--depth N] [--time-ms MS] [--weights PATH] [--book PATH]"
                );
                println!("  --fen FEN       Position to search (default: starting position)");
                println!("  --depth N       Maximum search depth (default: 6)");
                println!("  --time-ms MS    Wall-clock budget in milliseconds");
                println!("  --weights PATH  Value-network weight file (JSON)");
                println!("  --book PATH     Hint-cache file, loaded and saved");
                return Ok(None);
            }
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }
    Ok(Some(args))
}

fn main() -> Result<()> {
    let args = match parse_args()? {
        Some(args) => args,
        None => return Ok(()),
    };

    let board = match &args.fen {
        Some(fen) => Board::from_fen(fen)?,
        None => Board::new(),
    };

    let eval = model::load_evaluator(args.weights.as_deref().map(std::path::Path::new));

    let mut engine = Engine::new(1 << 20);
    engine.verbose = true;
    if let Some(path) = &args.book {
        match HintCache::load(path) {
            Ok(book) => engine.book = book,
            Err(e) => eprintln!("[WARN] starting with an empty hint cache: {e:#}"),
        }
    }

    println!("{board}");
    println!();

    let limits = SearchLimits {
        max_depth: args.depth,
        time_ms: args.time_ms,
    };
    match engine.pick_move(&board, limits, eval.as_ref()) {
        Some(outcome) => {
            println!(
                "bestmove {} depth {} score cp {}",
                outcome.best_move, outcome.depth, outcome.score_cp
            );
        }
        None => {
            let verdict = match movegen::game_status(&board) {
                GameStatus::Checkmate => match board.side_to_move {
                    Color::White => "checkmate, black wins",
                    Color::Black => "checkmate, white wins",
                },
                _ => "stalemate, draw",
            };
            println!("bestmove (none) - {verdict}");
        }
    }

    if let Some(path) = &args.book {
        engine.book.save(path)?;
    }

    Ok(())
}
