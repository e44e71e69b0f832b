//! Error Types
//!
//! Every failure the benchmark can hit maps onto one of four categories:
//! validation (round-trip output drift), format (undecodable blob),
//! shape (caller passed a wrong-sized vector) and I/O (persistence medium).
//! None of them is retried.

use thiserror::Error;

/// Raised by codec decode paths when bytes cannot be turned back into a component.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Format tag mismatch: expected {expected}, found {found}")]
    TagMismatch { expected: String, found: String },

    #[error("Unsupported version for {tag}: expected {expected}, found {found}")]
    VersionMismatch {
        tag: String,
        expected: u16,
        found: u16,
    },

    #[error("Truncated blob: declared {declared} bytes, available {available}")]
    Truncated { declared: usize, available: usize },

    #[error("CRC32 checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Decoded state violates invariant: {0}")]
    Corrupt(String),
}

/// Input vector length does not match the component's configured size.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
pub struct ShapeError {
    pub what: &'static str,
    pub expected: usize,
    pub actual: usize,
}

/// A decoded instance behaved differently from the baseline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "[{scenario}] trial {trial}: codec '{codec}' diverged at positions {positions:?} \
     (expected {expected:?}, actual {actual:?})"
)]
pub struct ValidationError {
    pub scenario: &'static str,
    pub trial: usize,
    pub codec: &'static str,
    /// Output positions (or draw offsets) that differ.
    pub positions: Vec<usize>,
    pub expected: Vec<u64>,
    pub actual: Vec<u64>,
}

/// Umbrella error returned by harnesses and the driver.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Process exit code reported by the binary for this failure class.
    pub fn exit_code(&self) -> u8 {
        match self {
            BenchError::Validation(_) => 1,
            BenchError::Format(_) | BenchError::Shape(_) => 2,
            BenchError::Io(_) => 3,
        }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;
