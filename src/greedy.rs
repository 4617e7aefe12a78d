//! The greedy decoder (spec §4.3): per-frame argmax, no CTC collapsing. A trivial
//! reference implementation the beam search's top-1 score must never fall below
//! (spec §8, "greedy ≤ beam").

use crate::error::DecoderError;
use crate::result::DecodeResult;
use ndarray::Array2;
use tracing::info;

/// Argmax-per-frame decoder. Ties within a row are broken by lower index, matching the
/// tie-breaking convention used everywhere else in this crate for determinism.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyDecoder;

impl GreedyDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Returns exactly one result: the raw per-frame argmax sequence (length `T`,
    /// including blanks and repeats — CTC collapsing is left to the caller) and the
    /// sum of per-frame max log-scores.
    pub fn decode(&self, frames: &Array2<f32>) -> Result<Vec<DecodeResult>, DecoderError> {
        let (steps, vocab) = frames.dim();
        if vocab == 0 {
            return Err(DecoderError::DimensionMismatch(
                "frame matrix has zero vocabulary columns".to_string(),
            ));
        }
        info!(steps, vocab, "greedy decode");

        let mut tokens = Vec::with_capacity(steps);
        let mut score = 0.0f32;
        for row in frames.rows() {
            let mut best_idx = 0usize;
            let mut best_val = f32::NEG_INFINITY;
            for (idx, &val) in row.iter().enumerate() {
                if val > best_val {
                    best_val = val;
                    best_idx = idx;
                }
            }
            tokens.push(best_idx as u32);
            score += best_val;
        }
        Ok(vec![DecodeResult { tokens, score }])
    }
}
