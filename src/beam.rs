//! The per-beam aggregate and the bookkeeping that merges beams collapsing to the same
//! label sequence (spec §3, §4.4.6).

use crate::numeric::{logadd, NEG_INFINITY};
use std::collections::BTreeMap;

/// A vocabulary index. Never equal to `blank` when it appears inside an emitted
/// [`Prefix`].
pub type Token = u32;

/// An ordered token sequence under construction during search. Identity for merging
/// purposes is the sequence itself, so `Prefix` is used directly as a map key.
pub type Prefix = Vec<Token>;

/// One live beam: a candidate prefix plus the two CTC alignment probabilities and the
/// LM state that corresponds to exactly this prefix.
///
/// Invariant: `p_nb == NEG_INFINITY` iff `seq` is empty (spec invariant 1).
#[derive(Clone, Debug)]
pub struct BeamEntry<S> {
    /// The decoded token sequence so far.
    pub seq: Prefix,
    /// Log-probability of all alignments consistent with `seq` that end in blank.
    pub p_b: f32,
    /// Log-probability of all alignments consistent with `seq` that end in `seq`'s
    /// trailing non-blank token.
    pub p_nb: f32,
    /// LM state produced by scoring exactly `seq` (the LM's `start` state for the
    /// empty prefix).
    pub lm_state: S,
}

impl<S> BeamEntry<S> {
    /// `logadd(p_b, p_nb)` — the combined log-probability of this prefix, recomputed
    /// on demand rather than cached.
    pub fn score(&self) -> f32 {
        logadd(self.p_b, self.p_nb)
    }
}

/// The working set of [`BeamEntry`] values for one frame, keyed by sequence so that
/// beams reached by different alignments but collapsing to the same prefix merge
/// automatically.
///
/// A `BTreeMap` is used instead of a `HashMap` so that the order results are built in
/// (and therefore tie-breaking during the final sort) stays deterministic across runs
/// without depending on hasher seeding — spec invariant 4 requires byte-identical
/// results given the same input.
pub struct BeamSet<S> {
    entries: BTreeMap<Prefix, BeamEntry<S>>,
}

impl<S: Clone> BeamSet<S> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The initial beam set for `decode_begin` (spec §4.4.1): one entry for the empty
    /// prefix, `p_b = 0`, `p_nb = -inf`, `lm_state` the LM's start state.
    pub fn initial(lm_start_state: S) -> Self {
        let mut set = Self::new();
        set.entries.insert(
            Vec::new(),
            BeamEntry {
                seq: Vec::new(),
                p_b: 0.0,
                p_nb: NEG_INFINITY,
                lm_state: lm_start_state,
            },
        );
        set
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn values(&self) -> impl Iterator<Item = &BeamEntry<S>> {
        self.entries.values()
    }

    pub fn into_values(self) -> impl Iterator<Item = BeamEntry<S>> {
        self.entries.into_values()
    }

    /// Fold `contribution` into `curr[seq].p_b` via `logadd`, creating the entry (with
    /// `lm_state`) if this is the first contribution to reach `seq` this frame.
    pub fn merge_blank(&mut self, seq: &Prefix, contribution: f32, lm_state: impl FnOnce() -> S) {
        let entry = self
            .entries
            .entry(seq.clone())
            .or_insert_with(|| BeamEntry {
                seq: seq.clone(),
                p_b: NEG_INFINITY,
                p_nb: NEG_INFINITY,
                lm_state: lm_state(),
            });
        entry.p_b = logadd(entry.p_b, contribution);
    }

    /// Fold `contribution` into `curr[seq].p_nb` via `logadd`, creating the entry (with
    /// `lm_state`) if this is the first contribution to reach `seq` this frame.
    pub fn merge_nonblank(
        &mut self,
        seq: &Prefix,
        contribution: f32,
        lm_state: impl FnOnce() -> S,
    ) {
        let entry = self
            .entries
            .entry(seq.clone())
            .or_insert_with(|| BeamEntry {
                seq: seq.clone(),
                p_b: NEG_INFINITY,
                p_nb: NEG_INFINITY,
                lm_state: lm_state(),
            });
        entry.p_nb = logadd(entry.p_nb, contribution);
    }

    /// Per-frame pruning (spec §4.4.3): drop entries more than `beam_threshold` below
    /// the best score, then keep only the top `beam_size` by score. If every entry's
    /// score is `-inf`, nothing is dropped by the threshold (spec edge case).
    pub fn prune(self, beam_size: usize, beam_threshold: f32) -> Self {
        let best = self
            .entries
            .values()
            .map(BeamEntry::score)
            .fold(NEG_INFINITY, f32::max);

        let mut survivors: Vec<BeamEntry<S>> = self
            .entries
            .into_values()
            .filter(|e| !best.is_finite() || e.score() >= best - beam_threshold)
            .collect();

        survivors.sort_by(|a, b| {
            b.score()
                .partial_cmp(&a.score())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.seq.cmp(&b.seq))
        });
        survivors.truncate(beam_size);

        let entries = survivors
            .into_iter()
            .map(|e| (e.seq.clone(), e))
            .collect();
        Self { entries }
    }
}

impl<S: Clone> Default for BeamSet<S> {
    fn default() -> Self {
        Self::new()
    }
}
