//! Decoder error taxonomy (spec §7).
//!
//! Kept as a typed `thiserror` enum rather than `anyhow` because this is a library
//! callers are expected to match on (did my options validate? did the LM blow up?),
//! not an application boundary.

use thiserror::Error;

/// Everything that can go wrong building or running a decoder.
#[derive(Debug, Error)]
pub enum DecoderError {
    /// `beam_size == 0`, a negative `beam_threshold`, or `blank` outside `[0, V)`.
    #[error("invalid decoder option: {0}")]
    InvalidOption(String),

    /// The vocabulary size implied by the options doesn't match the frame matrix width,
    /// or the caller's contract forbids the `T = 0` input it was given.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A language model adapter raised an error while scoring or finishing a beam.
    #[error("language model failure")]
    LMFailure(#[source] anyhow::Error),

    /// The n-gram adapter could not map a vocabulary entry to a known LM word and the
    /// caller opted into strict mode.
    #[error("vocabulary entry {word:?} (token {token}) has no mapping in the language model")]
    LMVocabularyMissing { word: String, token: u32 },
}
