//! The beam-search driver (spec §4.4): the time-synchronous loop that expands
//! prefixes, applies pruning, and finalises scores. This is the hot path of the crate;
//! everything else exists to set up the data it manipulates.
//!
//! Reference scenario (spec §8): decoding the bundled `logit.txt` matrix against
//! `letter.dict` with the `overfit.arpa` n-gram model is expected to produce a specific
//! top-1 collapsed string. Those fixtures aren't part of this tree (see
//! `SPEC_FULL.md` §3), so that exact assertion isn't a committed test here — this note
//! exists so that whoever drops `logit.txt` / `letter.dict` / `overfit.arpa` into
//! `tests/fixtures/` later knows to wire up `BeamSearchDecoder::with_ngram_lm` against
//! them and assert the collapsed top-1 output.

use crate::beam::{BeamSet, Prefix, Token};
use crate::error::DecoderError;
use crate::lm::{CallbackLm, LanguageModel, NgramLm, NullLm};
use crate::numeric::logadd;
use crate::result::DecodeResult;
use ndarray::{Array2, ArrayView1};
use std::cmp::Ordering;
use tracing::{debug, info, trace};

/// Search configuration (spec §3). Defaults match the spec's reference values.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderOptions {
    /// Maximum entries kept after per-frame pruning.
    pub beam_size: usize,
    /// Top-K token candidates considered at each frame before expansion.
    pub beam_size_token: usize,
    /// Log-score window: entries more than this below the best are dropped.
    pub beam_threshold: f32,
    /// Scalar multiplier applied to LM deltas before they're added to acoustic scores.
    pub lm_weight: f32,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            beam_size: 100,
            beam_size_token: 1000,
            beam_threshold: 1000.0,
            lm_weight: 0.5,
        }
    }
}

impl DecoderOptions {
    pub fn validate(&self) -> Result<(), DecoderError> {
        if self.beam_size == 0 {
            return Err(DecoderError::InvalidOption(
                "beam_size must be greater than 0".to_string(),
            ));
        }
        if self.beam_threshold < 0.0 {
            return Err(DecoderError::InvalidOption(
                "beam_threshold must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// The time-synchronous CTC prefix beam search, generic over its language model.
///
/// The decoder never introspects which concrete `L` it holds — it only calls the three
/// [`LanguageModel`] operations — so swapping the null, callback, or n-gram adapter in
/// and out changes nothing about this struct's logic.
pub struct BeamSearchDecoder<L: LanguageModel> {
    options: DecoderOptions,
    lm: L,
}

impl BeamSearchDecoder<NullLm> {
    /// A beam search decoder with no language model guidance.
    pub fn with_null_lm(options: DecoderOptions) -> Result<Self, DecoderError> {
        Self::new(options, NullLm)
    }
}

impl<S: Clone> BeamSearchDecoder<CallbackLm<S>> {
    /// A beam search decoder guided by a user-supplied scorer.
    pub fn with_callback_lm(options: DecoderOptions, lm: CallbackLm<S>) -> Result<Self, DecoderError> {
        Self::new(options, lm)
    }
}

impl BeamSearchDecoder<NgramLm> {
    /// A beam search decoder guided by an ARPA back-off n-gram model.
    pub fn with_ngram_lm(options: DecoderOptions, lm: NgramLm) -> Result<Self, DecoderError> {
        Self::new(options, lm)
    }
}

impl<L: LanguageModel> BeamSearchDecoder<L> {
    pub fn new(options: DecoderOptions, lm: L) -> Result<Self, DecoderError> {
        options.validate()?;
        Ok(Self { options, lm })
    }

    /// Runs the search over `frames` (`T x V`), with `blank` the reserved
    /// no-emission vocabulary index.
    pub fn decode(&self, frames: &Array2<f32>, blank: Token) -> Result<Vec<DecodeResult>, DecoderError> {
        let (steps, vocab) = frames.dim();
        if blank as usize >= vocab {
            return Err(DecoderError::InvalidOption(format!(
                "blank index {blank} is out of range for vocabulary size {vocab}"
            )));
        }
        info!(steps, vocab, blank, beam_size = self.options.beam_size, "beam search decode");

        if steps == 0 {
            let start = self.lm.start();
            let (_, delta) = self.lm.finish(&start)?;
            return Ok(vec![DecodeResult {
                tokens: Vec::new(),
                score: self.options.lm_weight * delta,
            }]);
        }

        let mut beams = BeamSet::initial(self.lm.start());

        for t in 0..steps {
            let row = frames.row(t);
            let candidates = top_candidates(row, self.options.beam_size_token, blank);
            trace!(frame = t, candidates = candidates.len(), "candidate set");
            beams = self.expand_frame(beams, row, &candidates, blank)?;
            beams = beams.prune(self.options.beam_size, self.options.beam_threshold);
            debug!(
                frame = t,
                survivors = beams.len(),
                best = beams.values().map(|e| e.score()).fold(f32::NEG_INFINITY, f32::max),
                "frame pruned"
            );
        }

        let mut results = Vec::new();
        for entry in beams.into_values() {
            let (_, delta) = self.lm.finish(&entry.lm_state)?;
            let score = entry.score() + self.options.lm_weight * delta;
            results.push(DecodeResult {
                tokens: entry.seq,
                score,
            });
        }
        sort_results(&mut results);
        Ok(results)
    }

    /// One frame of expansion (spec §4.4.2): every live prefix, extended by every
    /// candidate token (plus blank, always implicitly considered).
    fn expand_frame(
        &self,
        prev: BeamSet<L::State>,
        row: ArrayView1<f32>,
        candidates: &[Token],
        blank: Token,
    ) -> Result<BeamSet<L::State>, DecoderError> {
        let mut curr: BeamSet<L::State> = BeamSet::new();

        for entry in prev.values() {
            let last = entry.seq.last().copied();

            for &v in candidates {
                let am_score = row[v as usize];

                if v == blank {
                    let contribution = logadd(entry.p_b, entry.p_nb) + am_score;
                    let lm_state = entry.lm_state.clone();
                    curr.merge_blank(&entry.seq, contribution, || lm_state);
                    continue;
                }

                if Some(v) == last {
                    // Fold: the repeated emission has no blank separator, so it
                    // collapses onto the existing trailing token. No LM call.
                    let fold_contribution = entry.p_nb + am_score;
                    let lm_state = entry.lm_state.clone();
                    curr.merge_nonblank(&entry.seq, fold_contribution, || lm_state);

                    // Extend: a blank separator makes this a distinct second emission.
                    let (next_state, delta) = self.lm.score(&entry.lm_state, v)?;
                    let extend_contribution = entry.p_b + am_score + self.options.lm_weight * delta;
                    let mut seq = entry.seq.clone();
                    seq.push(v);
                    curr.merge_nonblank(&seq, extend_contribution, || next_state);
                } else {
                    let (next_state, delta) = self.lm.score(&entry.lm_state, v)?;
                    let contribution =
                        logadd(entry.p_b, entry.p_nb) + am_score + self.options.lm_weight * delta;
                    let mut seq = entry.seq.clone();
                    seq.push(v);
                    curr.merge_nonblank(&seq, contribution, || next_state);
                }
            }
        }

        Ok(curr)
    }
}

/// Top `k` indices of `row` by log-score, ties broken by lower index, with `blank`
/// always included regardless of its rank (spec §4.4.2).
fn top_candidates(row: ArrayView1<f32>, k: usize, blank: Token) -> Vec<Token> {
    let vocab = row.len();
    let k = k.min(vocab);
    let mut indices: Vec<u32> = (0..vocab as u32).collect();

    if k < vocab {
        pdqselect::select_by(&mut indices, k, |&a, &b| {
            row[b as usize]
                .partial_cmp(&row[a as usize])
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(&b))
        });
    }
    indices.truncate(k);
    indices.sort_by(|&a, &b| {
        row[b as usize]
            .partial_cmp(&row[a as usize])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });

    if !indices.contains(&blank) {
        indices.push(blank);
    }
    indices
}

fn sort_results(results: &mut [DecodeResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.tokens.cmp(&b.tokens))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lm::NullLm;
    use ndarray::array;

    fn decoder(options: DecoderOptions) -> BeamSearchDecoder<NullLm> {
        BeamSearchDecoder::with_null_lm(options).unwrap()
    }

    #[test]
    fn rejects_zero_beam_size() {
        let mut options = DecoderOptions::default();
        options.beam_size = 0;
        assert!(matches!(
            BeamSearchDecoder::with_null_lm(options),
            Err(DecoderError::InvalidOption(_))
        ));
    }

    #[test]
    fn with_callback_lm_decodes_like_with_null_lm_at_zero_weight() {
        let blank = 2;
        let frames = array![[0.5, 0.3, 0.2], [0.1, 0.6, 0.3]];

        let null_results = decoder(DecoderOptions::default())
            .decode(&frames, blank)
            .unwrap();

        let mut options = DecoderOptions::default();
        options.lm_weight = 0.0;
        let callback: crate::lm::CallbackLm<()> =
            crate::lm::CallbackLm::new(|| (), |_, _| Ok(((), 5.0)), |_| Ok(((), 5.0)));
        let callback_results = BeamSearchDecoder::with_callback_lm(options, callback)
            .unwrap()
            .decode(&frames, blank)
            .unwrap();

        assert_eq!(null_results, callback_results);
    }

    #[test]
    fn rejects_negative_threshold() {
        let mut options = DecoderOptions::default();
        options.beam_threshold = -1.0;
        assert!(matches!(
            BeamSearchDecoder::with_null_lm(options),
            Err(DecoderError::InvalidOption(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_blank() {
        let decoder = decoder(DecoderOptions::default());
        let frames = Array2::<f32>::zeros((3, 4));
        assert!(matches!(
            decoder.decode(&frames, 10),
            Err(DecoderError::InvalidOption(_))
        ));
    }

    #[test]
    fn zero_length_input_returns_single_empty_result() {
        let decoder = decoder(DecoderOptions::default());
        let frames = Array2::<f32>::zeros((0, 4));
        let results = decoder.decode(&frames, 3).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].tokens.is_empty());
        assert_eq!(results[0].score, 0.0);
    }

    #[test]
    fn blank_only_vocabulary_always_emits_empty_sequence() {
        let mut options = DecoderOptions::default();
        options.beam_size = 4;
        let decoder = decoder(options);
        let frames = array![[0.0], [0.0], [0.0]];
        let results = decoder.decode(&frames, 0).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].tokens.is_empty());
    }

    #[test]
    fn uniform_matrix_all_blank_prefix_scores_t_times_l00() {
        // Spec §8: for a uniform matrix, the all-blank prefix's score equals
        // T * L[0,0] (it has exactly one alignment: blank at every frame). It need
        // not be the top-1 result — sequences with many collapsing alignments (e.g.
        // a single repeated token) accumulate more probability mass and can outscore
        // it — so we look the result up by its token sequence rather than assuming
        // position 0.
        let mut options = DecoderOptions::default();
        options.beam_size = 8; // >= vocab size
        let decoder = decoder(options);
        let l00 = 0.0f32;
        let frames = array![[l00, l00, l00], [l00, l00, l00], [l00, l00, l00]];
        let results = decoder.decode(&frames, 2).unwrap();
        let all_blank = results
            .iter()
            .find(|r| r.tokens.is_empty())
            .expect("all-blank prefix should survive with beam_size >= V");
        assert!((all_blank.score - 3.0 * l00).abs() < 1e-5);
    }

    #[test]
    fn results_are_sorted_by_descending_score() {
        let decoder = decoder(DecoderOptions::default());
        let frames = array![[0.6, 0.3, 0.1], [0.1, 0.7, 0.2], [0.2, 0.1, 0.7]];
        let results = decoder.decode(&frames, 2).unwrap();
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn beams_within_a_frame_have_distinct_sequences() {
        let decoder = decoder(DecoderOptions::default());
        let frames = array![[0.6, 0.3, 0.1], [0.1, 0.7, 0.2], [0.2, 0.1, 0.7]];
        let results = decoder.decode(&frames, 2).unwrap();
        let mut seen = std::collections::HashSet::new();
        for r in &results {
            assert!(seen.insert(r.tokens.clone()));
        }
    }

    #[test]
    fn increasing_beam_size_never_decreases_top_score() {
        let frames = array![
            [0.4, 0.3, 0.2, 0.1],
            [0.1, 0.5, 0.3, 0.1],
            [0.2, 0.1, 0.4, 0.3],
            [0.3, 0.2, 0.1, 0.4]
        ];
        let small = {
            let mut o = DecoderOptions::default();
            o.beam_size = 1;
            decoder(o).decode(&frames, 3).unwrap()
        };
        let large = {
            let mut o = DecoderOptions::default();
            o.beam_size = 4;
            decoder(o).decode(&frames, 3).unwrap()
        };
        assert!(large[0].score >= small[0].score - 1e-5);
    }

    #[test]
    fn decode_is_idempotent() {
        let decoder = decoder(DecoderOptions::default());
        let frames = array![[0.6, 0.3, 0.1], [0.1, 0.7, 0.2], [0.2, 0.1, 0.7]];
        let first = decoder.decode(&frames, 2).unwrap();
        let second = decoder.decode(&frames, 2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn beam_top1_is_never_worse_than_greedy() {
        use crate::greedy::GreedyDecoder;
        let frames = array![
            [0.4, 0.35, 0.25],
            [0.2, 0.5, 0.3],
            [0.3, 0.3, 0.4],
            [0.1, 0.6, 0.3]
        ];
        let greedy = GreedyDecoder::new().decode(&frames).unwrap();

        // Greedy's raw score sums per-frame maxima without CTC collapsing; the beam
        // search's comparable quantity is its top hypothesis's combined log-prob
        // before any LM term (lm_weight = 0 here via the null LM), which by
        // construction can only do as well as or better than always taking the
        // single best per-frame path, since the beam search considers it as one of
        // its candidate alignments.
        let mut options = DecoderOptions::default();
        options.beam_size = 16;
        let beam = decoder(options).decode(&frames, 2).unwrap();
        assert!(beam[0].score >= greedy[0].score - 1e-4);
    }
}
