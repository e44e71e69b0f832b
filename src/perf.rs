//! Performance Metrics - per-codec round-trip timing
//!
//! Timings are plain accumulator values returned by the harnesses; nothing
//! here is global and nothing here decides pass/fail. Samples are kept in
//! nanoseconds and reported in microseconds.

use serde::Serialize;
use std::time::Instant;

const NANOS_PER_MICRO: f64 = 1_000.0;

/// One timed round trip. Never mutated after recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingSample {
    pub codec_name: &'static str,
    pub elapsed_us: f64,
}

/// Accumulated timing for one codec
#[derive(Debug, Clone, Default, Serialize)]
pub struct CodecTimings {
    pub codec_name: &'static str,
    pub total_ns: u64,
    samples: Vec<u64>,
}

impl CodecTimings {
    pub fn new(codec_name: &'static str) -> Self {
        CodecTimings {
            codec_name,
            total_ns: 0,
            samples: Vec::with_capacity(1_000),
        }
    }

    /// Run `f` under a monotonic clock and record only its duration.
    #[inline]
    pub fn time<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(start.elapsed().as_nanos() as u64);
        out
    }

    #[inline]
    pub fn record(&mut self, elapsed_ns: u64) -> TimingSample {
        self.total_ns += elapsed_ns;
        self.samples.push(elapsed_ns);
        self.sample(elapsed_ns)
    }

    fn sample(&self, elapsed_ns: u64) -> TimingSample {
        TimingSample {
            codec_name: self.codec_name,
            elapsed_us: elapsed_ns as f64 / NANOS_PER_MICRO,
        }
    }

    pub fn trials(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> impl Iterator<Item = TimingSample> + '_ {
        self.samples.iter().map(|&ns| self.sample(ns))
    }

    pub fn total_ms(&self) -> f64 {
        self.total_ns as f64 / 1_000_000.0
    }

    /// Mean per-trial cost in microseconds
    pub fn mean_us(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.total_ns as f64 / NANOS_PER_MICRO / self.samples.len() as f64)
    }

    /// Calculate percentile from samples, in microseconds
    ///
    /// # Arguments
    /// * `p` - Percentile (0-100), e.g., 50.0 for median, 99.0 for P99
    pub fn percentile(&self, p: f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        Some(sorted[idx.min(sorted.len() - 1)] as f64 / NANOS_PER_MICRO)
    }

    pub fn min_us(&self) -> Option<f64> {
        self.samples.iter().min().map(|&ns| ns as f64 / NANOS_PER_MICRO)
    }

    pub fn max_us(&self) -> Option<f64> {
        self.samples.iter().max().map(|&ns| ns as f64 / NANOS_PER_MICRO)
    }
}
