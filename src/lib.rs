#![doc = include_str!("../README.md")]
use std::env;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{Layer, Registry};

pub mod beam;
pub mod decoder;
pub mod error;
pub mod greedy;
pub mod lm;
pub mod numeric;
pub mod result;

pub use beam::Token;
pub use decoder::{BeamSearchDecoder, DecoderOptions};
pub use error::DecoderError;
pub use greedy::GreedyDecoder;
pub use result::DecodeResult;

/// Convenience function to set up logging for the `decode` demo binary. Mirrors the
/// usual shape for binaries in this corpus: `RUST_LOG` wins if set, otherwise the
/// library and binary default to `info`.
pub fn setup_logging() {
    let filter = match env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_env("RUST_LOG"),
        _ => EnvFilter::new("ctc_decode=info,decode=info"),
    };

    let fmt = tracing_subscriber::fmt::Layer::default();
    let subscriber = filter.and_then(fmt).with_subscriber(Registry::default());
    let _ = tracing::subscriber::set_global_default(subscriber);
}
