//! Language model adapters (spec §4.2).
//!
//! The decoder talks to an LM through exactly three operations — `start`, `score`,
//! `finish` — and never inspects which concrete adapter it's holding. Three adapters
//! implement the trait: [`null::NullLm`] (always zero), [`callback::CallbackLm`]
//! (forwards to a user closure), and [`ngram::NgramLm`] (wraps an ARPA backoff model).
//! The decoder is generic over `L: LanguageModel`, so dispatch is static and the
//! "tagged set" the design notes describe falls out of monomorphization rather than an
//! enum or trait object — there's exactly one non-core consumer of the trait per
//! decoder instance, so there is nothing to tag at runtime.

pub mod arpa;
pub mod callback;
pub mod ngram;
pub mod null;

pub use callback::CallbackLm;
pub use ngram::NgramLm;
pub use null::NullLm;

use crate::beam::Token;
use crate::error::DecoderError;

/// Capability set a language model must provide. All methods are pure with respect to
/// `&self` — the decoder never mutates an adapter through this trait, and an adapter
/// that wraps shared state (like an n-gram table) is responsible for its own interior
/// sharing discipline.
pub trait LanguageModel {
    /// Opaque per-beam state. Cloned every time a beam is extended, so adapters should
    /// keep it cheap (a handful of word ids, not the whole decoded history).
    type State: Clone;

    /// The state for the empty prefix, computed once per decode call.
    fn start(&self) -> Self::State;

    /// Conditional log-probability contribution of emitting `token` after `state`.
    /// The decoder multiplies the returned delta by `lm_weight` before adding it to
    /// acoustic scores.
    fn score(&self, state: &Self::State, token: Token) -> Result<(Self::State, f32), DecoderError>;

    /// End-of-sequence contribution, applied once per surviving beam after the last
    /// frame.
    fn finish(&self, state: &Self::State) -> Result<(Self::State, f32), DecoderError>;
}
