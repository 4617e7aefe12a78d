//! Demo CLI around the `ctc_decode` library: load a frame matrix and a vocabulary from
//! disk, run either decoder, print the result. Mirrors the shape of this corpus's other
//! demo binaries — `clap::Parser` args, `anyhow::Result` from `main`.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use ctc_decode::decoder::{BeamSearchDecoder, DecoderOptions};
use ctc_decode::greedy::GreedyDecoder;
use ctc_decode::lm::NgramLm;
use ctc_decode::{DecodeResult, Token};
use ndarray::Array2;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    Greedy,
    Beam,
}

#[derive(Parser, Debug)]
pub struct Args {
    /// Whitespace-separated log-probability matrix, one row per time step
    #[clap(long)]
    logits: PathBuf,
    /// Vocabulary file, one symbol per line; blank defaults to the last line
    #[clap(long)]
    vocab: PathBuf,
    /// Which decoder to run
    #[clap(long, value_enum, default_value = "beam")]
    mode: Mode,
    /// ARPA n-gram file to guide the beam search; omit for the null LM
    #[clap(long)]
    arpa: Option<PathBuf>,
    /// Reject vocabulary entries the n-gram model has no mapping for, instead of
    /// falling back to its unknown-word probability
    #[clap(long)]
    strict_lm_vocab: bool,
    #[clap(long, default_value_t = DecoderOptions::default().beam_size)]
    beam_size: usize,
    #[clap(long, default_value_t = DecoderOptions::default().beam_size_token)]
    beam_size_token: usize,
    #[clap(long, default_value_t = DecoderOptions::default().beam_threshold)]
    beam_threshold: f32,
    #[clap(long, default_value_t = DecoderOptions::default().lm_weight)]
    lm_weight: f32,
    /// Apply CTC collapse (drop blanks, drop consecutive duplicates) before printing
    #[clap(long)]
    collapse: bool,
    /// Print results as JSON instead of plain text
    #[clap(long)]
    json: bool,
}

fn read_vocab(path: &PathBuf) -> anyhow::Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read vocabulary file {}", path.display()))?;
    Ok(contents.lines().map(|l| l.trim().to_string()).collect())
}

fn read_logits(path: &PathBuf) -> anyhow::Result<Array2<f32>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read logits file {}", path.display()))?;
    let mut rows = Vec::new();
    let mut width = None;
    for line in contents.lines().filter(|l| !l.trim().is_empty()) {
        let row: Vec<f32> = line
            .split_whitespace()
            .map(|tok| tok.parse::<f32>())
            .collect::<Result<_, _>>()
            .with_context(|| format!("failed to parse logits row: {line}"))?;
        width = Some(*width.get_or_insert(row.len()));
        if Some(row.len()) != width {
            anyhow::bail!("inconsistent row width in {}", path.display());
        }
        rows.push(row);
    }
    let height = rows.len();
    let width = width.unwrap_or(0);
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((height, width), flat).context("failed to build logits matrix")
}

fn collapse(tokens: &[Token], blank: Token) -> Vec<Token> {
    let mut out = Vec::new();
    let mut last = None;
    for &t in tokens {
        if t == blank {
            last = None;
            continue;
        }
        if Some(t) != last {
            out.push(t);
        }
        last = Some(t);
    }
    out
}

fn render(results: &[DecodeResult], vocab: &[String], blank: Token, do_collapse: bool, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    for result in results {
        let tokens = if do_collapse {
            collapse(&result.tokens, blank)
        } else {
            result.tokens.clone()
        };
        let text: String = tokens
            .iter()
            .map(|&t| vocab.get(t as usize).map(String::as_str).unwrap_or("?"))
            .collect();
        println!("{:.4}\t{}", result.score, text);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    ctc_decode::setup_logging();
    let args = Args::parse();

    let vocab = read_vocab(&args.vocab)?;
    let frames = read_logits(&args.logits)?;
    let blank = vocab.len() as Token;

    if frames.ncols() != vocab.len() + 1 {
        anyhow::bail!(
            "logits have {} columns but vocabulary has {} entries (expected {})",
            frames.ncols(),
            vocab.len(),
            vocab.len() + 1
        );
    }

    info!(rows = frames.nrows(), cols = frames.ncols(), blank, "loaded input");

    let results = match args.mode {
        Mode::Greedy => GreedyDecoder::new().decode(&frames)?,
        Mode::Beam => {
            let options = DecoderOptions {
                beam_size: args.beam_size,
                beam_size_token: args.beam_size_token,
                beam_threshold: args.beam_threshold,
                lm_weight: args.lm_weight,
            };
            match &args.arpa {
                Some(path) => {
                    let lm = NgramLm::new(path, &vocab, args.strict_lm_vocab)?;
                    BeamSearchDecoder::with_ngram_lm(options, lm)?.decode(&frames, blank)?
                }
                None => BeamSearchDecoder::with_null_lm(options)?.decode(&frames, blank)?,
            }
        }
    };

    render(&results, &vocab, blank, args.collapse, args.json)
}
