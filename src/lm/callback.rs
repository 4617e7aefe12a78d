//! The user-callback LM adapter: delegates every operation to closures supplied by the
//! caller. The adapter owns no state beyond forwarding — whatever state threading a
//! real scorer needs lives in the caller's `S`.

use super::LanguageModel;
use crate::beam::Token;
use crate::error::DecoderError;

type StartFn<S> = Box<dyn Fn() -> S + Send + Sync>;
type ScoreFn<S> = Box<dyn Fn(&S, Token) -> anyhow::Result<(S, f32)> + Send + Sync>;
type FinishFn<S> = Box<dyn Fn(&S) -> anyhow::Result<(S, f32)> + Send + Sync>;

/// Wraps a caller-supplied scorer behind the [`LanguageModel`] trait. Any error the
/// closures raise is wrapped as [`DecoderError::LMFailure`] before it reaches the
/// decoder, per spec §4.2.
pub struct CallbackLm<S> {
    start: StartFn<S>,
    score: ScoreFn<S>,
    finish: FinishFn<S>,
}

impl<S> CallbackLm<S> {
    pub fn new(
        start: impl Fn() -> S + Send + Sync + 'static,
        score: impl Fn(&S, Token) -> anyhow::Result<(S, f32)> + Send + Sync + 'static,
        finish: impl Fn(&S) -> anyhow::Result<(S, f32)> + Send + Sync + 'static,
    ) -> Self {
        Self {
            start: Box::new(start),
            score: Box::new(score),
            finish: Box::new(finish),
        }
    }
}

impl<S: Clone> LanguageModel for CallbackLm<S> {
    type State = S;

    fn start(&self) -> S {
        (self.start)()
    }

    fn score(&self, state: &S, token: Token) -> Result<(S, f32), DecoderError> {
        (self.score)(state, token).map_err(DecoderError::LMFailure)
    }

    fn finish(&self, state: &S) -> Result<(S, f32), DecoderError> {
        (self.finish)(state).map_err(DecoderError::LMFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_to_closures() {
        let lm: CallbackLm<i32> = CallbackLm::new(
            || 0,
            |state, token| Ok((state + token as i32, 0.25)),
            |state| Ok((*state, 0.1)),
        );
        let state = lm.start();
        let (state, delta) = lm.score(&state, 3).unwrap();
        assert_eq!(state, 3);
        assert_eq!(delta, 0.25);
        let (_, delta) = lm.finish(&state).unwrap();
        assert_eq!(delta, 0.1);
    }

    #[test]
    fn surfaces_closure_errors_as_lm_failure() {
        let lm: CallbackLm<()> = CallbackLm::new(
            || (),
            |_, _| Err(anyhow::anyhow!("scorer exploded")),
            |_| Ok(((), 0.0)),
        );
        let err = lm.score(&(), 0).unwrap_err();
        assert!(matches!(err, DecoderError::LMFailure(_)));
    }
}
