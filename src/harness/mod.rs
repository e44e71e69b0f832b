//! Round-trip Harnesses
//!
//! - [`stream`] - random stream save/restore continuity, one codec per run
//! - [`equivalence`] - encoder output equality across codecs, with timing

pub mod equivalence;
pub mod stream;

pub use equivalence::{ENCODER_SCENARIO, EquivalenceOutcome, EquivalenceRun, run_equivalence};
pub use stream::{STREAM_SCENARIO, StreamOutcome, StreamRun, run_stream_round_trips};
