//! The null LM adapter: every score and finish contribution is zero. Decoding with it
//! is equivalent to decoding with `lm_weight = 0.0` and any other adapter (spec §8,
//! "null-LM equivalence").

use super::LanguageModel;
use crate::beam::Token;
use crate::error::DecoderError;

/// An LM that contributes nothing. Useful as the default when no external language
/// model is available, and as the reference point for the null-LM equivalence law.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLm;

impl LanguageModel for NullLm {
    type State = ();

    fn start(&self) {}

    fn score(&self, _state: &(), _token: Token) -> Result<((), f32), DecoderError> {
        Ok(((), 0.0))
    }

    fn finish(&self, _state: &()) -> Result<((), f32), DecoderError> {
        Ok(((), 0.0))
    }
}
