//! Sparse Binary Vector
//!
//! Fixed-length bit vector used for encoder inputs and outputs. The length is
//! fixed at construction and every access is bounds-checked.

use crate::error::ShapeError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SparseBinaryVector {
    bits: Vec<bool>,
}

impl SparseBinaryVector {
    /// All-zero vector of `len` bits.
    pub fn zeros(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    /// Vector whose first `count` bits are set.
    pub fn with_leading_ones(len: usize, count: usize) -> Self {
        let mut v = Self::zeros(len);
        for bit in v.bits.iter_mut().take(count) {
            *bit = true;
        }
        v
    }

    /// Build from active indices; fails if any index is `>= len`.
    pub fn from_indices(len: usize, indices: &[usize]) -> Result<Self, ShapeError> {
        let mut v = Self::zeros(len);
        for &i in indices {
            v.set(i, true)?;
        }
        Ok(v)
    }

    pub fn from_dense(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<bool, ShapeError> {
        self.bits.get(index).copied().ok_or(ShapeError {
            what: "bit index",
            expected: self.bits.len(),
            actual: index,
        })
    }

    pub fn set(&mut self, index: usize, value: bool) -> Result<(), ShapeError> {
        let len = self.bits.len();
        match self.bits.get_mut(index) {
            Some(bit) => {
                *bit = value;
                Ok(())
            }
            None => Err(ShapeError {
                what: "bit index",
                expected: len,
                actual: index,
            }),
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Ascending indices of set bits.
    pub fn active_indices(&self) -> Vec<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
            .collect()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    /// Mutable view for in-place permutation; the length cannot change.
    pub fn as_mut_slice(&mut self) -> &mut [bool] {
        &mut self.bits
    }

    /// Positions where `self` and `other` disagree (length mismatch counts the tail).
    pub fn diff_positions(&self, other: &Self) -> Vec<usize> {
        let longest = self.len().max(other.len());
        (0..longest)
            .filter(|&i| self.bits.get(i) != other.bits.get(i))
            .collect()
    }
}
