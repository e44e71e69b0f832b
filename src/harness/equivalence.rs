//! Encoder equivalence + performance harness
//!
//! ```text
//! Init ─▶ { GenerateInput ─▶ ComputeBaseline ─▶ RoundTripAndVerify(codec)* ─▶ NextTrial }* ─▶ Cleanup ─▶ Done
//! ```
//!
//! Every codec keeps its own persisted copy of the encoder. Per trial and per
//! codec the timed section is: load blob, decode, compute, encode, store blob.
//! The decoded output is then compared to the baseline bit for bit outside the
//! timed section. The first mismatch aborts the run. Cleanup of the persisted
//! blobs happens on every exit path via [`ScopedBlobs`].

use crate::codec::Codec;
use crate::encoder::SparseEncoder;
use crate::error::{BenchError, BenchResult, ValidationError};
use crate::perf::CodecTimings;
use crate::random::DeterministicRandom;
use crate::sdr::SparseBinaryVector;
use crate::store::{BlobStore, ScopedBlobs};
use std::time::Instant;
use tracing::{debug, info};

pub const ENCODER_SCENARIO: &str = "sparse_encoder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquivalenceRun {
    pub trials: usize,
    /// Learn on baseline and decoded copies; each copy is re-persisted so
    /// the next trial starts from the learned state.
    pub learn: bool,
}

#[derive(Debug, Clone)]
pub struct EquivalenceOutcome {
    pub trials: usize,
    pub elapsed_us: u64,
    /// One entry per codec, in the order the codecs were given
    pub timings: Vec<CodecTimings>,
}

/// Drive `run.trials` trials against `baseline`.
///
/// `input` is permuted in place by `rng` each trial, so the caller controls
/// the input weight and the sequence of inputs.
pub fn run_equivalence<S: BlobStore + ?Sized>(
    baseline: &mut SparseEncoder,
    rng: &mut DeterministicRandom,
    input: &mut SparseBinaryVector,
    codecs: &[&dyn Codec<SparseEncoder>],
    store: &mut S,
    run: EquivalenceRun,
) -> BenchResult<EquivalenceOutcome> {
    // Init
    let mut scope = ScopedBlobs::new(store);
    let keys: Vec<String> = codecs
        .iter()
        .map(|codec| format!("encoder_{}", codec.name()))
        .collect();
    for (codec, key) in codecs.iter().zip(&keys) {
        let bytes = codec.encode_bytes(baseline)?;
        debug!(codec = codec.name(), bytes = bytes.len(), "Persisted initial encoder state");
        scope.put(key, &bytes)?;
    }
    let mut timings: Vec<CodecTimings> = codecs
        .iter()
        .map(|codec| CodecTimings::new(codec.name()))
        .collect();

    info!(
        trials = run.trials,
        learn = run.learn,
        codecs = codecs.len(),
        "Encoder equivalence benchmark started"
    );
    let start = Instant::now();

    for trial in 0..run.trials {
        // GenerateInput
        rng.shuffle(input.as_mut_slice());

        // ComputeBaseline
        let expected = baseline.compute(input, run.learn)?;

        for ((codec, key), timing) in codecs.iter().zip(&keys).zip(timings.iter_mut()) {
            // RoundTripAndVerify
            let actual = timing.time(|| -> BenchResult<SparseBinaryVector> {
                let bytes = scope.get(key)?;
                let mut decoded: SparseEncoder = codec.decode_bytes(&bytes)?;
                let output = decoded.compute(input, run.learn)?;
                scope.put(key, &codec.encode_bytes(&decoded)?)?;
                Ok(output)
            })?;

            let positions = expected.diff_positions(&actual);
            if !positions.is_empty() {
                return Err(BenchError::from(ValidationError {
                    scenario: ENCODER_SCENARIO,
                    trial,
                    codec: codec.name(),
                    positions,
                    expected: as_u64(&expected),
                    actual: as_u64(&actual),
                }));
            }
        }

        debug!(trial, active = ?expected.active_indices(), "Trial verified");
    }

    let elapsed_us = start.elapsed().as_micros() as u64;
    info!(
        trials = run.trials,
        elapsed_ms = elapsed_us as f64 / 1000.0,
        "Encoder equivalence benchmark finished"
    );

    // Cleanup runs when `scope` drops
    Ok(EquivalenceOutcome {
        trials: run.trials,
        elapsed_us,
        timings,
    })
}

fn as_u64(v: &SparseBinaryVector) -> Vec<u64> {
    v.active_indices().into_iter().map(|i| i as u64).collect()
}
