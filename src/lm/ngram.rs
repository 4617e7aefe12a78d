//! The n-gram LM adapter: wraps an ARPA back-off model (spec §4.2, §6).
//!
//! Constructed from a path to an ARPA file and the decoder's vocabulary (one entry per
//! token id); the token id -> LM word id mapping is resolved once here and cached, so
//! the hot path never touches strings.

use super::arpa::{ArpaModel, WordId};
use super::LanguageModel;
use crate::beam::Token;
use crate::error::DecoderError;
use std::path::Path;
use tracing::warn;

/// Per-beam n-gram history: the most recent `order - 1` LM word ids. Bounded in size
/// by construction, so cloning it on every beam extension is cheap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NgramState {
    history: Vec<WordId>,
}

/// Wraps an [`ArpaModel`] and a decoder-token -> LM-word-id mapping built once at
/// construction.
pub struct NgramLm {
    model: ArpaModel,
    token_to_word: Vec<Option<WordId>>,
    /// The model's own `</s>` word id, if the ARPA file defines one.
    eos_id: Option<WordId>,
}

impl NgramLm {
    /// Loads the ARPA file at `path` and maps `vocab[token] -> LM word id` for every
    /// token. In strict mode, a vocabulary entry with no corresponding LM word is a
    /// construction-time [`DecoderError::LMVocabularyMissing`]; otherwise it silently
    /// falls back to the model's unknown-word probability at query time.
    pub fn new(path: impl AsRef<Path>, vocab: &[String], strict: bool) -> Result<Self, DecoderError> {
        let model = ArpaModel::load(path)?;
        Self::with_model(model, vocab, strict)
    }

    /// As [`Self::new`], but takes an already-parsed model — useful for tests and for
    /// callers sharing one ARPA model across several decoders.
    pub fn with_model(
        model: ArpaModel,
        vocab: &[String],
        strict: bool,
    ) -> Result<Self, DecoderError> {
        let mut token_to_word = Vec::with_capacity(vocab.len());
        for (token, word) in vocab.iter().enumerate() {
            match model.word_id(word) {
                Some(id) => token_to_word.push(Some(id)),
                None if strict => {
                    return Err(DecoderError::LMVocabularyMissing {
                        word: word.clone(),
                        token: token as u32,
                    })
                }
                None => {
                    warn!(
                        token,
                        word, "vocabulary entry has no n-gram mapping; using unknown-word probability"
                    );
                    token_to_word.push(None);
                }
            }
        }
        let eos_id = model.word_id("</s>");
        Ok(Self {
            model,
            token_to_word,
            eos_id,
        })
    }

    fn history_len(&self) -> usize {
        self.model.order().saturating_sub(1)
    }

    fn word_for(&self, token: Token) -> Option<WordId> {
        self.token_to_word.get(token as usize).copied().flatten()
    }
}

impl LanguageModel for NgramLm {
    type State = NgramState;

    fn start(&self) -> NgramState {
        NgramState::default()
    }

    fn score(&self, state: &NgramState, token: Token) -> Result<(NgramState, f32), DecoderError> {
        let word = self.word_for(token);
        let logprob = match word {
            Some(id) => self.model.log_prob(&state.history, id),
            None => self.model.unknown_word_logprob(),
        };

        let mut history = state.history.clone();
        if let Some(id) = word {
            history.push(id);
        }
        let max_len = self.history_len();
        if history.len() > max_len {
            let drop = history.len() - max_len;
            history.drain(0..drop);
        }
        Ok((NgramState { history }, logprob))
    }

    fn finish(&self, state: &NgramState) -> Result<(NgramState, f32), DecoderError> {
        // Scores the end-of-sequence transition against the model's own `</s>` entry,
        // backing off through `state.history` exactly like any other word. ARPA files
        // with no `</s>` unigram (see DESIGN.md) contribute nothing here.
        let delta = match self.eos_id {
            Some(id) => self.model.log_prob(&state.history, id),
            None => 0.0,
        };
        Ok((state.clone(), delta))
    }
}
