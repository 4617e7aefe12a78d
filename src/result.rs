//! The decoder's output record (spec §4.5, §6).

use crate::beam::Token;
use serde::Serialize;

/// One decoded hypothesis: a token sequence and its log-score.
///
/// `tokens` is the beam's raw sequence for beam search, or the full per-frame argmax
/// sequence (including blanks and repeats) for the greedy decoder. Neither decoder
/// performs CTC collapsing (drop blanks, drop consecutive duplicates) — that's left to
/// the caller, who alone knows whether the raw or collapsed form is wanted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeResult {
    pub tokens: Vec<Token>,
    pub score: f32,
}
