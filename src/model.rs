//! Neural evaluation: a one-hidden-layer value network over board features.
//!
//! Weights arrive as a JSON object with two layers (`W` matrix and `b`
//! vector each), an output scale in centipawns, and a flag saying whether
//! the output is from the side-to-move or the white point of view. Shapes
//! are validated before the network is accepted; any failure falls back to
//! the classical evaluator.

use crate::board::Board;
use crate::defs::Color;
use crate::evaluate::{ClassicalEval, Evaluator};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// 6 piece channels x 64 squares, plus one tempo feature.
pub const INPUT_DIM: usize = 385;

/// Point of view of the raw network output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ModelPov {
    #[serde(rename = "sidemove")]
    SideToMove,
    #[serde(rename = "white")]
    White,
}

impl Default for ModelPov {
    fn default() -> Self {
        ModelPov::SideToMove
    }
}

#[derive(Debug, Deserialize)]
pub struct LayerWeights {
    #[serde(rename = "W")]
    pub w: Vec<Vec<f32>>,
    pub b: Vec<f32>,
}

/// On-disk weight schema. Unknown fields (training metadata such as `basis`
/// or `activation`) are ignored.
#[derive(Debug, Deserialize)]
pub struct NetworkWeights {
    pub layers: Vec<LayerWeights>,
    #[serde(default = "default_scale_cp")]
    pub scale_cp: f32,
    #[serde(default)]
    pub model_pov: ModelPov,
}

fn default_scale_cp() -> f32 {
    1000.0
}

/// The value network, flattened for inference.
pub struct NeuralEval {
    w0: Vec<Vec<f32>>,
    b0: Vec<f32>,
    w1: Vec<f32>,
    b1: f32,
    scale_cp: f32,
    pov: ModelPov,
}

impl NeuralEval {
    /// Validate shapes and build the evaluator from parsed weights.
    pub fn from_weights(weights: NetworkWeights) -> Result<Self> {
        if weights.layers.len() != 2 {
            bail!("expected 2 layers, got {}", weights.layers.len());
        }
        let mut layers = weights.layers;
        let l1 = layers.pop().expect("length checked above");
        let l0 = layers.pop().expect("length checked above");

        let hidden = l0.w.len();
        if hidden == 0 {
            bail!("hidden layer is empty");
        }
        for (i, row) in l0.w.iter().enumerate() {
            if row.len() != INPUT_DIM {
                bail!(
                    "layer 0 row {i} has {} columns, expected {INPUT_DIM}",
                    row.len()
                );
            }
        }
        if l0.b.len() != hidden {
            bail!("layer 0 bias has {} entries, expected {hidden}", l0.b.len());
        }
        if l1.w.len() != 1 || l1.w[0].len() != hidden {
            bail!(
                "layer 1 must be a single row of {hidden} columns, got {}x{}",
                l1.w.len(),
                l1.w.first().map_or(0, Vec::len)
            );
        }
        if l1.b.len() != 1 {
            bail!("layer 1 bias must be a single value, got {}", l1.b.len());
        }

        let mut l1 = l1;
        Ok(NeuralEval {
            w0: l0.w,
            b0: l0.b,
            w1: l1.w.pop().expect("shape checked above"),
            b1: l1.b[0],
            scale_cp: weights.scale_cp,
            pov: weights.model_pov,
        })
    }

    /// Load and validate a weight file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        let weights: NetworkWeights =
            serde_json::from_str(&text).context("failed to parse weight JSON")?;
        Self::from_weights(weights)
    }

    pub fn hidden_size(&self) -> usize {
        self.b0.len()
    }
}

/// Board to feature vector: +1 for a white occupant, -1 for a black occupant
/// of each piece channel, and a final side-to-move feature.
pub fn features(board: &Board) -> [f32; INPUT_DIM] {
    let mut x = [0.0f32; INPUT_DIM];
    for sq in 0..64usize {
        if let Some(p) = board.squares[sq] {
            let sign = match p.color {
                Color::White => 1.0,
                Color::Black => -1.0,
            };
            x[p.kind.index() * 64 + sq] = sign;
        }
    }
    x[INPUT_DIM - 1] = match board.side_to_move {
        Color::White => 1.0,
        Color::Black => -1.0,
    };
    x
}

impl Evaluator for NeuralEval {
    fn evaluate(&self, board: &Board) -> i32 {
        let x = features(board);

        let mut y = self.b1;
        for (row, (&b, &w_out)) in self.w0.iter().zip(self.b0.iter().zip(self.w1.iter())) {
            let mut h = b;
            for (&w, &xi) in row.iter().zip(x.iter()) {
                h += w * xi;
            }
            if h > 0.0 {
                y += w_out * h;
            }
        }

        let mut cp = (y * self.scale_cp).round() as i32;
        if self.pov == ModelPov::SideToMove && board.side_to_move == Color::Black {
            cp = -cp;
        }
        cp
    }
}

/// Build an evaluator, preferring the value network and transparently
/// falling back to classical evaluation when the weights cannot be loaded.
pub fn load_evaluator(weights_path: Option<&Path>) -> Box<dyn Evaluator> {
    match weights_path {
        Some(path) => match NeuralEval::load(path) {
            Ok(net) => Box::new(net),
            Err(e) => {
                eprintln!("[WARN] Failed to load value network: {e:#}. Using classical eval.");
                Box::new(ClassicalEval)
            }
        },
        None => Box::new(ClassicalEval),
    }
}
