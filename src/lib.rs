//! Round-trip Bench - codec equivalence and cost for stateful components
//!
//! Verifies that two independent codecs persist a deterministic random
//! stream and a sparse encoder without changing their observable behaviour,
//! and times each codec's save/restore cycle.
//!
//! # Modules
//!
//! - [`random`] - Reproducible random stream with serializable state
//! - [`sdr`] - Fixed-length sparse binary vectors
//! - [`encoder`] - Competitive k-winners sparse encoder
//! - [`codec`] - Schema (bincode) and legacy (text) codecs over one frame
//! - [`store`] - Blob store (memory/file) with scoped cleanup
//! - [`perf`] - Per-codec timing accumulators
//! - [`harness`] - Stream and encoder round-trip harnesses
//! - [`driver`] - Orchestrates the three benchmarks
//! - [`config`] / [`logging`] - YAML configuration and tracing setup

// Core types - must be first!
pub mod error;
pub mod random;
pub mod sdr;

// Components and persistence
pub mod codec;
pub mod encoder;
pub mod store;

// Benchmarking
pub mod driver;
pub mod harness;
pub mod perf;

// Ambient
pub mod config;
pub mod logging;

// Convenient re-exports at crate root
pub use codec::{Codec, CodecKind, LegacyCodec, Persistable, SchemaCodec, SerializedBlob, decode_any};
pub use encoder::{EncoderParams, EncoderState, SparseEncoder};
pub use error::{BenchError, BenchResult, FormatError, ShapeError, ValidationError};
pub use perf::{CodecTimings, TimingSample};
pub use random::{DeterministicRandom, RandomState};
pub use sdr::SparseBinaryVector;
pub use store::{BlobStore, FileStore, MemoryStore, ScopedBlobs};
