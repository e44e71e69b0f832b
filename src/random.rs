//! Deterministic Random Source
//!
//! Additive lagged-Fibonacci generator (degree 31, separation 3) whose full
//! state is a handful of integers, so it can be persisted and restored with
//! bit-exact continuation.
//!
//! # Algorithm
//!
//! ```text
//! seeding:  s[0] = fold(seed)
//!           s[i] = 16807 * s[i-1] mod (2^31 - 1)      (Park-Miller, Schrage form)
//!           front = 3, rear = 0, then 310 discarded steps
//! step:     s[front] += s[rear]   (wrapping u32)
//!           out = s[front]; front, rear advance mod 31
//! ```
//!
//! # Example
//!
//! ```rust
//! use roundtrip_bench::random::DeterministicRandom;
//!
//! let mut a = DeterministicRandom::new(7);
//! let mut b = DeterministicRandom::from_snapshot(a.snapshot()).unwrap();
//! assert_eq!(a.next_u32(), b.next_u32());
//! ```

use crate::error::FormatError;
use serde::{Deserialize, Serialize};

/// Number of state words.
pub const STATE_WORDS: usize = 31;

/// Distance between the front and rear taps.
pub const TAP_SEPARATION: usize = 3;

/// Warm-up steps discarded after seeding (not counted as draws).
const WARMUP_STEPS: usize = 10 * STATE_WORDS;

/// Plain-data snapshot of a [`DeterministicRandom`], shared by every codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomState {
    pub seed: u64,
    pub draw_count: u64,
    pub state: [u32; STATE_WORDS],
    pub front: u32,
    pub rear: u32,
}

/// Reproducible pseudo-random stream.
///
/// Every value returned is a pure function of `(seed, draw_count)`; two
/// instances with equal snapshots produce identical futures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterministicRandom {
    seed: u64,
    draw_count: u64,
    state: [u32; STATE_WORDS],
    front: usize,
    rear: usize,
}

impl Default for DeterministicRandom {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRandom {
    /// Create a stream positioned at draw 0 of `seed`.
    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            seed,
            draw_count: 0,
            state: [0; STATE_WORDS],
            front: TAP_SEPARATION,
            rear: 0,
        };
        rng.seed(seed);
        rng
    }

    /// Reset the stream to draw 0 of `seed`.
    pub fn seed(&mut self, seed: u64) {
        self.seed = seed;
        self.state[0] = (seed ^ (seed >> 32)) as u32;
        for i in 1..STATE_WORDS {
            self.state[i] = park_miller(self.state[i - 1]);
        }
        self.front = TAP_SEPARATION;
        self.rear = 0;
        for _ in 0..WARMUP_STEPS {
            self.step();
        }
        self.draw_count = 0;
    }

    #[inline]
    fn step(&mut self) -> u32 {
        let value = self.state[self.front].wrapping_add(self.state[self.rear]);
        self.state[self.front] = value;
        self.front = (self.front + 1) % STATE_WORDS;
        self.rear = (self.rear + 1) % STATE_WORDS;
        value
    }

    /// Advance by exactly one step and return the raw 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.draw_count = self.draw_count.wrapping_add(1);
        self.step()
    }

    /// Value in `[0, bound)` from exactly one draw (multiply-shift mapping).
    ///
    /// A zero bound still consumes the draw and yields 0.
    #[inline]
    pub fn next_below(&mut self, bound: u32) -> u32 {
        let raw = self.next_u32();
        ((raw as u64 * bound as u64) >> 32) as u32
    }

    /// Value in `[0.0, 1.0)` from exactly one draw.
    pub fn next_real64(&mut self) -> f64 {
        self.next_u32() as f64 / (1u64 << 32) as f64
    }

    /// In-place Fisher–Yates shuffle consuming `len - 1` draws.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_below(i as u32 + 1) as usize;
            items.swap(i, j);
        }
    }

    /// Seed this stream was last reset with.
    pub fn seed_value(&self) -> u64 {
        self.seed
    }

    /// Draws taken since the last reset.
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    /// Capture the complete state.
    pub fn snapshot(&self) -> RandomState {
        RandomState {
            seed: self.seed,
            draw_count: self.draw_count,
            state: self.state,
            front: self.front as u32,
            rear: self.rear as u32,
        }
    }

    /// Rebuild a stream from a snapshot, rejecting impossible tap positions.
    pub fn from_snapshot(snapshot: RandomState) -> Result<Self, FormatError> {
        let front = snapshot.front as usize;
        let rear = snapshot.rear as usize;
        if front >= STATE_WORDS || rear >= STATE_WORDS {
            return Err(FormatError::Corrupt(format!(
                "tap index out of range: front={}, rear={}",
                front, rear
            )));
        }
        if (front + STATE_WORDS - rear) % STATE_WORDS != TAP_SEPARATION {
            return Err(FormatError::Corrupt(format!(
                "tap separation must be {}: front={}, rear={}",
                TAP_SEPARATION, front, rear
            )));
        }
        Ok(Self {
            seed: snapshot.seed,
            draw_count: snapshot.draw_count,
            state: snapshot.state,
            front,
            rear,
        })
    }
}

/// One step of the Park–Miller minimal standard generator (Schrage's method).
fn park_miller(x: u32) -> u32 {
    let mut x = (x & 0x7fff_ffff) as i64;
    if x == 0 {
        x = 123_459_876;
    }
    let hi = x / 127_773;
    let lo = x % 127_773;
    let mut next = 16_807 * lo - 2_836 * hi;
    if next < 0 {
        next += 0x7fff_ffff;
    }
    next as u32
}
