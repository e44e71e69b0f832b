//! Sparse Encoder - competitive k-winners model with learned permanences
//!
//! Maps a fixed-size binary input onto a fixed-size binary output with exactly
//! `active_count` set bits. Columns compete on their count of connected active
//! inputs; winners adapt their permanences when learning is enabled.
//!
//! All randomness is consumed at initialization from a [`DeterministicRandom`]
//! seeded by [`EncoderParams::seed`]. `compute` itself is a pure function of
//! (state, input, learn), and without learning it does not touch the state.

use crate::error::{FormatError, ShapeError};
use crate::random::DeterministicRandom;
use crate::sdr::SparseBinaryVector;
use serde::{Deserialize, Serialize};

// ============================================================
// Parameters
// ============================================================

/// Construction parameters, persisted alongside the learned state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderParams {
    pub input_size: u32,
    pub column_count: u32,
    /// Winners per compute (`k`)
    pub active_count: u32,
    /// Fraction of inputs each column may ever connect to
    pub potential_pct: f32,
    pub connected_threshold: f32,
    pub permanence_increment: f32,
    pub permanence_decrement: f32,
    /// Overlaps below this count as zero
    pub stimulus_threshold: u32,
    pub duty_cycle_period: u32,
    /// 0.0 disables boosting
    pub boost_strength: f32,
    pub seed: u64,
}

impl EncoderParams {
    pub fn new(input_size: u32, column_count: u32, active_count: u32) -> Self {
        Self {
            input_size,
            column_count,
            active_count,
            potential_pct: 0.5,
            connected_threshold: 0.2,
            permanence_increment: 0.05,
            permanence_decrement: 0.008,
            stimulus_threshold: 0,
            duty_cycle_period: 1000,
            boost_strength: 0.0,
            seed: 1,
        }
    }

    /// Flatten multi-dimensional input/output shapes.
    pub fn from_dims(input_dims: &[u32], column_dims: &[u32], active_count: u32) -> Self {
        Self::new(
            input_dims.iter().product(),
            column_dims.iter().product(),
            active_count,
        )
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_boost_strength(mut self, boost_strength: f32) -> Self {
        self.boost_strength = boost_strength;
        self
    }

    fn validate(&self) -> Result<(), ShapeError> {
        if self.input_size == 0 {
            return Err(ShapeError {
                what: "input_size",
                expected: 1,
                actual: 0,
            });
        }
        if self.column_count == 0 {
            return Err(ShapeError {
                what: "column_count",
                expected: 1,
                actual: 0,
            });
        }
        if self.active_count == 0 || self.active_count > self.column_count {
            return Err(ShapeError {
                what: "active_count",
                expected: self.column_count as usize,
                actual: self.active_count as usize,
            });
        }
        Ok(())
    }

    fn pool_size(&self) -> usize {
        let n = (self.potential_pct.clamp(0.0, 1.0) * self.input_size as f32).round() as usize;
        n.clamp(1, self.input_size as usize)
    }
}

// ============================================================
// Persisted State
// ============================================================

/// Everything `compute` depends on. Codecs persist exactly this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderState {
    pub params: EncoderParams,
    /// Sorted input indices per column
    pub potential_pools: Vec<Vec<u32>>,
    /// Dense `column_count x input_size`, row-major by column
    pub permanences: Vec<f32>,
    /// Per-column score offset in [0, 0.01)
    pub tie_breakers: Vec<f32>,
    pub boost_factors: Vec<f32>,
    pub active_duty_cycles: Vec<f32>,
    pub learning_iterations: u64,
    /// Winners of the most recent learning step
    pub last_active: Vec<u32>,
}

impl EncoderState {
    /// Structural invariants a decoded state must satisfy before use.
    pub fn check(&self) -> Result<(), FormatError> {
        self.params
            .validate()
            .map_err(|e| FormatError::Corrupt(e.to_string()))?;

        let inputs = self.params.input_size as usize;
        let columns = self.params.column_count as usize;

        let expect_len = |what: &str, actual: usize, expected: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(FormatError::Corrupt(format!(
                    "{} has {} entries, expected {}",
                    what, actual, expected
                )))
            }
        };
        expect_len("potential_pools", self.potential_pools.len(), columns)?;
        expect_len("permanences", self.permanences.len(), columns * inputs)?;
        expect_len("tie_breakers", self.tie_breakers.len(), columns)?;
        expect_len("boost_factors", self.boost_factors.len(), columns)?;
        expect_len("active_duty_cycles", self.active_duty_cycles.len(), columns)?;

        if let Some(i) = self
            .potential_pools
            .iter()
            .flatten()
            .find(|&&i| i as usize >= inputs)
        {
            return Err(FormatError::Corrupt(format!(
                "potential pool index {} out of range {}",
                i, inputs
            )));
        }
        if let Some(p) = self
            .permanences
            .iter()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(FormatError::Corrupt(format!("permanence {} outside [0, 1]", p)));
        }
        if self.last_active.iter().any(|&c| c as usize >= columns) {
            return Err(FormatError::Corrupt("last_active column out of range".into()));
        }
        Ok(())
    }
}

// ============================================================
// Encoder
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SparseEncoder {
    state: EncoderState,
}

impl SparseEncoder {
    /// Allocate shapes and draw the initial potential pools and permanences.
    pub fn initialize(params: EncoderParams) -> Result<Self, ShapeError> {
        params.validate()?;
        let mut rng = DeterministicRandom::new(params.seed);
        let inputs = params.input_size as usize;
        let columns = params.column_count as usize;
        let pool_size = params.pool_size();
        let connected = params.connected_threshold;

        let mut potential_pools = Vec::with_capacity(columns);
        let mut permanences = vec![0.0f32; columns * inputs];
        let mut candidates: Vec<u32> = (0..params.input_size).collect();

        for column in 0..columns {
            rng.shuffle(&mut candidates);
            let mut pool = candidates[..pool_size].to_vec();
            pool.sort_unstable();

            let row = &mut permanences[column * inputs..(column + 1) * inputs];
            for &input in &pool {
                let start_connected = rng.next_real64() < 0.5;
                let r = rng.next_real64() as f32;
                row[input as usize] = if start_connected {
                    (connected + (1.0 - connected) * r * 0.1).min(1.0)
                } else {
                    connected * r
                };
            }
            potential_pools.push(pool);
        }

        let tie_breakers = (0..columns)
            .map(|_| 0.01 * rng.next_real64() as f32)
            .collect();

        Ok(Self {
            state: EncoderState {
                params,
                potential_pools,
                permanences,
                tie_breakers,
                boost_factors: vec![1.0; columns],
                active_duty_cycles: vec![0.0; columns],
                learning_iterations: 0,
                last_active: Vec::new(),
            },
        })
    }

    /// Rebuild from decoded state after checking its invariants.
    pub fn from_state(state: EncoderState) -> Result<Self, FormatError> {
        state.check()?;
        Ok(Self { state })
    }

    pub fn state(&self) -> &EncoderState {
        &self.state
    }

    pub fn params(&self) -> &EncoderParams {
        &self.state.params
    }

    pub fn input_size(&self) -> usize {
        self.state.params.input_size as usize
    }

    pub fn column_count(&self) -> usize {
        self.state.params.column_count as usize
    }

    pub fn active_count(&self) -> usize {
        self.state.params.active_count as usize
    }

    pub fn learning_iterations(&self) -> u64 {
        self.state.learning_iterations
    }

    /// Select winners and, if `learn` is set, adapt the winners' permanences.
    pub fn compute(
        &mut self,
        input: &SparseBinaryVector,
        learn: bool,
    ) -> Result<SparseBinaryVector, ShapeError> {
        let winners = self.winners(input)?;
        if learn {
            self.learn(input, &winners);
        }
        SparseBinaryVector::from_indices(self.column_count(), &winners)
    }

    /// Non-learning compute; borrows immutably so the state provably stays put.
    pub fn infer(&self, input: &SparseBinaryVector) -> Result<SparseBinaryVector, ShapeError> {
        let winners = self.winners(input)?;
        SparseBinaryVector::from_indices(self.column_count(), &winners)
    }

    /// Connected active-input count per column.
    pub fn overlaps(&self, input: &SparseBinaryVector) -> Result<Vec<u32>, ShapeError> {
        if input.len() != self.input_size() {
            return Err(ShapeError {
                what: "input vector",
                expected: self.input_size(),
                actual: input.len(),
            });
        }
        let inputs = self.input_size();
        let active = input.active_indices();
        let threshold = self.state.params.connected_threshold;

        Ok(self
            .state
            .permanences
            .chunks_exact(inputs)
            .map(|row| active.iter().filter(|&&i| row[i] >= threshold).count() as u32)
            .collect())
    }

    fn winners(&self, input: &SparseBinaryVector) -> Result<Vec<usize>, ShapeError> {
        let overlaps = self.overlaps(input)?;
        let stimulus = self.state.params.stimulus_threshold;

        let scores: Vec<f32> = overlaps
            .iter()
            .enumerate()
            .map(|(c, &overlap)| {
                let overlap = if overlap < stimulus { 0 } else { overlap };
                overlap as f32 * self.state.boost_factors[c] + self.state.tie_breakers[c]
            })
            .collect();

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
        order.truncate(self.active_count());
        order.sort_unstable();
        Ok(order)
    }

    fn learn(&mut self, input: &SparseBinaryVector, winners: &[usize]) {
        let inputs = self.input_size();
        let columns = self.column_count();
        let params = &self.state.params;
        let (inc, dec) = (params.permanence_increment, params.permanence_decrement);
        let bits = input.as_slice();

        for &column in winners {
            let row = &mut self.state.permanences[column * inputs..(column + 1) * inputs];
            for &i in &self.state.potential_pools[column] {
                let p = &mut row[i as usize];
                let moved = if bits[i as usize] { *p + inc } else { *p - dec };
                *p = moved.clamp(0.0, 1.0);
            }
        }

        self.state.learning_iterations = self.state.learning_iterations.wrapping_add(1);
        let period = self
            .state
            .learning_iterations
            .clamp(1, params.duty_cycle_period.max(1) as u64) as f32;
        let mut is_winner = vec![false; columns];
        for &c in winners {
            is_winner[c] = true;
        }
        for (duty, &won) in self.state.active_duty_cycles.iter_mut().zip(&is_winner) {
            let hit = if won { 1.0 } else { 0.0 };
            *duty = (*duty * (period - 1.0) + hit) / period;
        }

        if params.boost_strength > 0.0 {
            let target = params.active_count as f32 / params.column_count as f32;
            let strength = params.boost_strength;
            for (boost, &duty) in self
                .state
                .boost_factors
                .iter_mut()
                .zip(&self.state.active_duty_cycles)
            {
                *boost = ((target - duty) * strength).exp();
            }
        }

        self.state.last_active = winners.iter().map(|&c| c as u32).collect();
    }
}
