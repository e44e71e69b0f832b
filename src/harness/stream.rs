//! Random stream round-trip harness
//!
//! Each iteration draws one value, persists the stream through a codec and the
//! blob store, restores it, then checks the next `draws_per_check` values of
//! the original and the restored stream pairwise.

use crate::codec::Codec;
use crate::error::{BenchError, BenchResult, ValidationError};
use crate::perf::CodecTimings;
use crate::random::DeterministicRandom;
use crate::store::{BlobStore, ScopedBlobs};
use std::time::Instant;
use tracing::{debug, info};

pub const STREAM_SCENARIO: &str = "random_stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRun {
    pub seed: u64,
    pub iterations: usize,
    pub draws_per_check: usize,
}

#[derive(Debug, Clone)]
pub struct StreamOutcome {
    pub iterations: usize,
    /// Whole benchmark, including the checks
    pub elapsed_us: u64,
    /// Encode + put + get + decode only
    pub timings: CodecTimings,
}

pub fn run_stream_round_trips<S: BlobStore + ?Sized>(
    codec: &dyn Codec<DeterministicRandom>,
    store: &mut S,
    run: StreamRun,
) -> BenchResult<StreamOutcome> {
    let key = format!("random_{}", codec.name());
    let mut scope = ScopedBlobs::new(store);
    let mut timings = CodecTimings::new(codec.name());
    let mut original = DeterministicRandom::new(run.seed);

    info!(
        codec = codec.name(),
        seed = run.seed,
        iterations = run.iterations,
        "Stream round-trip benchmark started"
    );
    let start = Instant::now();

    for iteration in 0..run.iterations {
        original.next_u32();

        let mut restored = timings.time(|| -> BenchResult<DeterministicRandom> {
            let bytes = codec.encode_bytes(&original)?;
            scope.put(&key, &bytes)?;
            let bytes = scope.get(&key)?;
            Ok(codec.decode_bytes(&bytes)?)
        })?;

        for offset in 0..run.draws_per_check {
            let expected = original.next_u32();
            let actual = restored.next_u32();
            if expected != actual {
                return Err(BenchError::from(ValidationError {
                    scenario: STREAM_SCENARIO,
                    trial: iteration,
                    codec: codec.name(),
                    positions: vec![offset],
                    expected: vec![expected as u64],
                    actual: vec![actual as u64],
                }));
            }
        }

        if iteration % 100 == 0 {
            debug!(codec = codec.name(), iteration, draws = original.draw_count(), "Stream checkpoint");
        }
    }

    let elapsed_us = start.elapsed().as_micros() as u64;
    info!(
        codec = codec.name(),
        elapsed_ms = elapsed_us as f64 / 1000.0,
        "Stream round-trip benchmark finished"
    );

    Ok(StreamOutcome {
        iterations: run.iterations,
        elapsed_us,
        timings,
    })
}
