//! Benchmark Driver
//!
//! Runs the three benchmarks in order and stops at the first failure:
//!
//! 1. random stream round trips through the schema codec
//! 2. random stream round trips through the legacy codec
//! 3. sparse encoder warmup, then equivalence + timing across both codecs

use crate::codec::{Codec, LegacyCodec, SchemaCodec};
use crate::config::{AppConfig, EncoderScenarioConfig, RandomScenarioConfig};
use crate::encoder::{EncoderParams, SparseEncoder};
use crate::error::{BenchResult, ShapeError};
use crate::harness::{
    ENCODER_SCENARIO, EquivalenceRun, STREAM_SCENARIO, StreamRun, run_equivalence,
    run_stream_round_trips,
};
use crate::perf::CodecTimings;
use crate::random::DeterministicRandom;
use crate::sdr::SparseBinaryVector;
use crate::store::BlobStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;
use tracing::info;

// ============================================================
// Report Types
// ============================================================

#[derive(Debug, Clone, Serialize)]
pub struct CodecSummary {
    pub codec: &'static str,
    pub trials: usize,
    pub total_ms: f64,
    pub mean_us: Option<f64>,
    pub p50_us: Option<f64>,
    pub p99_us: Option<f64>,
}

impl From<&CodecTimings> for CodecSummary {
    fn from(t: &CodecTimings) -> Self {
        Self {
            codec: t.codec_name,
            trials: t.trials(),
            total_ms: t.total_ms(),
            mean_us: t.mean_us(),
            p50_us: t.percentile(50.0),
            p99_us: t.percentile(99.0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub iterations: usize,
    pub elapsed_ms: f64,
    pub codecs: Vec<CodecSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub started_at: DateTime<Utc>,
    pub scenarios: Vec<ScenarioReport>,
}

impl BenchReport {
    pub fn write_json(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }
}

// ============================================================
// Scenarios
// ============================================================

/// Benchmarks (a) and (b): one codec at a time over a seeded stream.
pub fn run_random_scenario<S: BlobStore + ?Sized>(
    codec: &dyn Codec<DeterministicRandom>,
    store: &mut S,
    cfg: &RandomScenarioConfig,
) -> BenchResult<ScenarioReport> {
    let outcome = run_stream_round_trips(
        codec,
        store,
        StreamRun {
            seed: cfg.seed,
            iterations: cfg.iterations,
            draws_per_check: cfg.draws_per_check,
        },
    )?;
    Ok(ScenarioReport {
        name: format!("{}_{}", STREAM_SCENARIO, codec.name()),
        iterations: outcome.iterations,
        elapsed_ms: outcome.elapsed_us as f64 / 1000.0,
        codecs: vec![CodecSummary::from(&outcome.timings)],
    })
}

/// Initialize the encoder and the driving stream, then run the learning warmup.
pub fn prepare_encoder(
    cfg: &EncoderScenarioConfig,
) -> BenchResult<(SparseEncoder, DeterministicRandom, SparseBinaryVector)> {
    if cfg.input_active_bits > cfg.input_size as usize {
        return Err(ShapeError {
            what: "input_active_bits",
            expected: cfg.input_size as usize,
            actual: cfg.input_active_bits,
        }
        .into());
    }

    let params = EncoderParams::new(cfg.input_size, cfg.column_count, cfg.active_count)
        .with_seed(cfg.encoder_seed)
        .with_boost_strength(cfg.boost_strength);
    let mut encoder = SparseEncoder::initialize(params)?;
    let mut rng = DeterministicRandom::new(cfg.driver_seed);
    let mut input =
        SparseBinaryVector::with_leading_ones(cfg.input_size as usize, cfg.input_active_bits);

    let start = Instant::now();
    for i in 0..cfg.warmup_iterations {
        rng.shuffle(input.as_mut_slice());
        encoder.compute(&input, true)?;
        if (i + 1) % 2_000 == 0 {
            info!(done = i + 1, total = cfg.warmup_iterations, "Encoder warmup progress");
        }
    }
    info!(
        iterations = cfg.warmup_iterations,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Encoder warmup complete"
    );

    Ok((encoder, rng, input))
}

/// Benchmark (c): warmup, then equivalence trials across both codecs.
pub fn run_encoder_scenario<S: BlobStore + ?Sized>(
    store: &mut S,
    cfg: &EncoderScenarioConfig,
) -> BenchResult<ScenarioReport> {
    let (mut encoder, mut rng, mut input) = prepare_encoder(cfg)?;
    let codecs: [&dyn Codec<SparseEncoder>; 2] = [&SchemaCodec, &LegacyCodec];

    let outcome = run_equivalence(
        &mut encoder,
        &mut rng,
        &mut input,
        &codecs,
        store,
        EquivalenceRun {
            trials: cfg.trials,
            learn: cfg.learn_during_trials,
        },
    )?;

    Ok(ScenarioReport {
        name: ENCODER_SCENARIO.to_string(),
        iterations: outcome.trials,
        elapsed_ms: outcome.elapsed_us as f64 / 1000.0,
        codecs: outcome.timings.iter().map(CodecSummary::from).collect(),
    })
}

/// Run all three benchmarks; `on_scenario` sees each report as it completes.
pub fn run_all<S: BlobStore + ?Sized>(
    config: &AppConfig,
    store: &mut S,
    mut on_scenario: impl FnMut(&ScenarioReport),
) -> BenchResult<BenchReport> {
    let mut report = BenchReport {
        started_at: Utc::now(),
        scenarios: Vec::with_capacity(3),
    };

    let stream_codecs: [&dyn Codec<DeterministicRandom>; 2] = [&SchemaCodec, &LegacyCodec];
    for codec in stream_codecs {
        let scenario = run_random_scenario(codec, store, &config.random_scenario)?;
        on_scenario(&scenario);
        report.scenarios.push(scenario);
    }

    let scenario = run_encoder_scenario(store, &config.encoder_scenario)?;
    on_scenario(&scenario);
    report.scenarios.push(scenario);

    Ok(report)
}
