//! Benchmarks the beam search driver over a larger synthetic matrix. Mirrors the
//! sibling `ctclib-pp` crate's `benches/decode.rs` (`harness = false`, `criterion`).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ctc_decode::decoder::{BeamSearchDecoder, DecoderOptions};
use ndarray::Array2;

/// A deterministic pseudo-random matrix so the benchmark doesn't need a real acoustic
/// model output and still exercises a realistic T/V shape.
fn synthetic_frames(steps: usize, vocab: usize) -> Array2<f32> {
    let mut state: u64 = 0x9E3779B97F4A7C15;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 1000) as f32 / 1000.0
    };
    Array2::from_shape_fn((steps, vocab), |_| next())
}

fn bench_beam_search(c: &mut Criterion) {
    let frames = synthetic_frames(500, 30);
    let blank = 29;

    c.bench_function("beam_search_500x30_beam100", |b| {
        b.iter(|| {
            let decoder =
                BeamSearchDecoder::with_null_lm(DecoderOptions::default()).unwrap();
            black_box(decoder.decode(black_box(&frames), blank).unwrap());
        })
    });
}

criterion_group!(benches, bench_beam_search);
criterion_main!(benches);
