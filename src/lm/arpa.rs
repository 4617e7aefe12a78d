//! A minimal ARPA back-off n-gram reader and query engine.
//!
//! Spec §1 treats the n-gram LM's file format and backoff query engine as an external
//! black box the decoder never sees directly. This module is that box's
//! implementation: it exists so [`super::ngram::NgramLm`] has something real to query,
//! but the decoder only ever talks to `NgramLm` through the [`super::LanguageModel`]
//! trait.
//!
//! Format (standard ARPA):
//!
//! ```text
//! \data\
//! ngram 1=3
//! ngram 2=2
//!
//! \1-grams:
//! -1.0 <unk>
//! -0.5 the -0.2
//! -0.6 cat
//!
//! \2-grams:
//! -0.3 the cat
//!
//! \end\
//! ```
//!
//! Each n-gram line is `logprob word... [backoff]`; the backoff column is only present
//! for orders below the file's maximum.

use crate::error::DecoderError;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// An id into the model's own word table, distinct from the decoder's `Token` ids.
/// The n-gram adapter owns the mapping between the two (spec §6).
pub type WordId = u32;

const UNK: &str = "<unk>";

#[derive(Debug, Clone, Copy)]
struct Entry {
    logprob: f32,
    backoff: f32,
}

/// A parsed ARPA model: word <-> id table, per-order n-gram probability/backoff
/// entries, and the order (highest n seen in the file).
#[derive(Debug)]
pub struct ArpaModel {
    order: usize,
    word_ids: HashMap<String, WordId>,
    unigrams: Vec<Entry>,
    // indexed by (n - 2) for n in 2..=order; keyed by the full n-gram's word ids.
    higher_order: Vec<HashMap<Vec<WordId>, Entry>>,
    unk_id: Option<WordId>,
}

impl ArpaModel {
    /// Parses an ARPA file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DecoderError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            DecoderError::LMFailure(anyhow::anyhow!(
                "could not open ARPA file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Parses an ARPA model from any reader — kept separate from [`Self::load`] so
    /// tests can build models from in-memory strings.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, DecoderError> {
        let mut word_ids: HashMap<String, WordId> = HashMap::new();
        let mut unigrams: Vec<Entry> = Vec::new();
        let mut higher_order: Vec<HashMap<Vec<WordId>, Entry>> = Vec::new();
        let mut order = 1usize;
        let mut current_order = 0usize;

        let mut intern = |word: &str, word_ids: &mut HashMap<String, WordId>, unigrams: &mut Vec<Entry>| -> WordId {
            if let Some(&id) = word_ids.get(word) {
                id
            } else {
                let id = unigrams.len() as WordId;
                unigrams.push(Entry {
                    logprob: f32::NEG_INFINITY,
                    backoff: 0.0,
                });
                word_ids.insert(word.to_string(), id);
                id
            }
        };

        for line in reader.lines() {
            let line = line
                .map_err(|e| DecoderError::LMFailure(anyhow::anyhow!("error reading ARPA file: {e}")))?;
            let line = line.trim();
            if line.is_empty() || line == "\\data\\" || line == "\\end\\" {
                continue;
            }
            if let Some(rest) = line.strip_prefix("ngram ") {
                if let Some((n, _count)) = rest.split_once('=') {
                    if let Ok(n) = n.trim().parse::<usize>() {
                        order = order.max(n);
                    }
                }
                continue;
            }
            if let Some(rest) = line.strip_prefix('\\') {
                if let Some(n_str) = rest.strip_suffix("-grams:") {
                    current_order = n_str.parse().unwrap_or(0);
                    while higher_order.len() < order.saturating_sub(1) {
                        higher_order.push(HashMap::new());
                    }
                }
                continue;
            }
            if current_order == 0 {
                continue;
            }

            let mut fields = line.split_whitespace();
            let logprob: f32 = match fields.next().and_then(|s| s.parse().ok()) {
                Some(v) => v,
                None => continue,
            };
            let words: Vec<&str> = fields.clone().take(current_order).collect();
            if words.len() < current_order {
                continue;
            }
            for _ in 0..current_order {
                fields.next();
            }
            let backoff: f32 = fields.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);

            let ids: Vec<WordId> = words
                .iter()
                .map(|w| intern(w, &mut word_ids, &mut unigrams))
                .collect();

            if current_order == 1 {
                unigrams[ids[0] as usize] = Entry { logprob, backoff };
            } else {
                let slot = current_order - 2;
                while higher_order.len() <= slot {
                    higher_order.push(HashMap::new());
                }
                higher_order[slot].insert(ids, Entry { logprob, backoff });
            }
        }

        let unk_id = word_ids.get(UNK).copied();

        Ok(Self {
            order,
            word_ids,
            unigrams,
            higher_order,
            unk_id,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Looks up the model's internal word id for a vocabulary string, if known.
    pub fn word_id(&self, word: &str) -> Option<WordId> {
        self.word_ids.get(word).copied()
    }

    /// The model's own unknown-word unigram log-probability, or a conservative
    /// fallback if the file defines no explicit `<unk>` entry.
    pub fn unknown_word_logprob(&self) -> f32 {
        match self.unk_id {
            Some(id) => self.unigrams[id as usize].logprob,
            None => -100.0,
        }
    }

    /// Katz-style back-off query: `log P(word | history)`, falling back through
    /// shorter contexts (applying each context's backoff weight) until a matching
    /// n-gram is found or the unigram table is reached.
    pub fn log_prob(&self, history: &[WordId], word: WordId) -> f32 {
        self.log_prob_rec(history, word)
    }

    fn log_prob_rec(&self, history: &[WordId], word: WordId) -> f32 {
        if history.is_empty() {
            return self.unigrams.get(word as usize).map_or(
                self.unknown_word_logprob(),
                |e| {
                    if e.logprob.is_finite() {
                        e.logprob
                    } else {
                        self.unknown_word_logprob()
                    }
                },
            );
        }

        let n = history.len() + 1;
        if n <= self.order {
            let mut full = history.to_vec();
            full.push(word);
            let slot = n - 2;
            if let Some(table) = self.higher_order.get(slot) {
                if let Some(entry) = table.get(&full) {
                    return entry.logprob;
                }
            }
        }

        let backoff = self.backoff_weight(history);
        backoff + self.log_prob_rec(&history[1..], word)
    }

    fn backoff_weight(&self, context: &[WordId]) -> f32 {
        if context.is_empty() {
            return 0.0;
        }
        if context.len() == 1 {
            return self
                .unigrams
                .get(context[0] as usize)
                .map_or(0.0, |e| e.backoff);
        }
        let slot = context.len() - 2;
        self.higher_order
            .get(slot)
            .and_then(|table| table.get(context))
            .map_or(0.0, |e| e.backoff)
    }
}
