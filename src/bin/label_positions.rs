//! Generate value-network training data by playing randomized games and
//! labeling positions with fixed-depth searches.
//!
//! Each completed search iteration at or above the logging depth streams a
//! JSONL row `{fen, score_cp, depth, from, to, key_hex, timestamp}` with the
//! score from the side-to-move point of view, which is what the training
//! pipeline consumes.
//!
//! Usage: cargo run --release --bin label_positions -- --positions 50000 --output data/samples.jsonl

use anyhow::Result;
use lodestar::board::Board;
use lodestar::engine::{Engine, JsonlSink, SearchLimits};
use lodestar::evaluate::ClassicalEval;
use lodestar::movegen;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut num_positions: u64 = 50_000;
    let mut output_path = String::from("data/samples.jsonl");
    let mut label_depth: u8 = 4;
    let mut min_logged_depth: u8 = 3;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--positions" | "-n" => {
                i += 1;
                num_positions = args[i].parse()?;
            }
            "--output" | "-o" => {
                i += 1;
                output_path = args[i].clone();
            }
            "--depth" | "-d" => {
                i += 1;
                label_depth = args[i].parse()?;
            }
            "--min-depth" => {
                i += 1;
                min_logged_depth = args[i].parse()?;
            }
            "--help" | "-h" => {
                println!("Usage: label_positions [--positions N] [--output PATH] [--depth D] [--min-depth D]");
                println!("  --positions N   Number of sample rows to generate (default: 50000)");
                println!("  --output PATH   Output JSONL file (default: data/samples.jsonl)");
                println!("  --depth D       Labeling search depth (default: 4)");
                println!("  --min-depth D   Lowest iteration depth emitted (default: 3)");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Lodestar position labeler ===");
    println!("Target rows: {num_positions}");
    println!("Output: {output_path}");
    println!("Label depth: {label_depth} (logging from {min_logged_depth})");

    let mut engine = Engine::new(1 << 20);
    engine.min_logged_depth = min_logged_depth;
    engine.set_sample_sink(Box::new(JsonlSink::create(&output_path)?));

    let mut rng_state: u64 = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
        | 1;

    let eval = ClassicalEval;
    let mut total_games = 0u64;
    let start_time = std::time::Instant::now();

    while engine.samples_emitted < num_positions {
        let mut board = Board::new();

        // Random game length, 8 to 120 plies.
        let max_plies = 8 + (xorshift64(&mut rng_state) % 113) as usize;

        for ply in 0..max_plies {
            if engine.samples_emitted >= num_positions {
                break;
            }

            let legal = movegen::legal_moves(&board);
            if legal.is_empty() {
                break;
            }
            let mv = pick_random_move(&legal, &board, &mut rng_state);
            board.apply_move(mv);

            // Skip the first few plies: openings are over-represented.
            if ply < 6 {
                continue;
            }
            if movegen::legal_moves(&board).is_empty() {
                break;
            }

            engine.pick_move(&board, SearchLimits::depth(label_depth), &eval);
        }

        total_games += 1;

        if total_games % 50 == 0 || engine.samples_emitted >= num_positions {
            let elapsed = start_time.elapsed().as_secs_f64();
            let rps = engine.samples_emitted as f64 / elapsed.max(0.001);
            let eta = if rps > 0.0 {
                (num_positions.saturating_sub(engine.samples_emitted)) as f64 / rps
            } else {
                0.0
            };
            eprintln!(
                "  Games: {} | Rows: {}/{} | {:.0} rows/s | ETA: {:.0}s",
                total_games, engine.samples_emitted, num_positions, rps, eta
            );
        }
    }

    let elapsed = start_time.elapsed().as_secs_f64();
    eprintln!("\n=== Done ===");
    eprintln!("  Total games: {total_games}");
    eprintln!("  Total rows: {}", engine.samples_emitted);
    eprintln!(
        "  Time: {:.1}s ({:.0} rows/s)",
        elapsed,
        engine.samples_emitted as f64 / elapsed.max(0.001)
    );
    eprintln!("  Output: {output_path}");

    Ok(())
}

/// Pick a random legal move with a slight bias toward captures, which keeps
/// the sampled positions tactically interesting.
fn pick_random_move(
    legal: &lodestar::mv::MoveList,
    board: &Board,
    rng: &mut u64,
) -> lodestar::mv::Move {
    let moves = legal.as_slice();
    if xorshift64(rng) % 100 < 30 {
        let captures: Vec<_> = moves
            .iter()
            .copied()
            .filter(|&m| movegen::is_capture(board, m))
            .collect();
        if !captures.is_empty() {
            let idx = (xorshift64(rng) % captures.len() as u64) as usize;
            return captures[idx];
        }
    }
    let idx = (xorshift64(rng) % moves.len() as u64) as usize;
    moves[idx]
}

/// xorshift64 PRNG
fn xorshift64(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}
