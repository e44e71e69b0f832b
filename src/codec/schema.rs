//! Schema Codec
//!
//! bincode encoding of the component's serde state struct. Field order and
//! types come from the `#[derive(Serialize, Deserialize)]` schema, so the
//! payload carries no field names or separators.

use super::{Codec, Persistable, SerializedBlob};
use crate::error::FormatError;
use bincode::Options;

/// Payload format version written by this codec
pub const SCHEMA_VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaCodec;

/// Fixed-width little-endian integers; the payload must be consumed exactly.
fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

impl<T: Persistable> Codec<T> for SchemaCodec {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn encode(&self, value: &T) -> Result<SerializedBlob, FormatError> {
        let state = value.to_state();
        let payload = options()
            .serialize(&*state)
            .map_err(|e| FormatError::Malformed(format!("bincode encode: {}", e)))?;
        Ok(SerializedBlob::new(T::SCHEMA_TAG, SCHEMA_VERSION, payload))
    }

    fn decode(&self, blob: &SerializedBlob) -> Result<T, FormatError> {
        blob.expect(T::SCHEMA_TAG, SCHEMA_VERSION)?;
        let state: T::State = options()
            .deserialize(&blob.payload)
            .map_err(|e| FormatError::Malformed(format!("bincode decode: {}", e)))?;
        T::from_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{EncoderParams, SparseEncoder};
    use crate::random::DeterministicRandom;
    use crate::sdr::SparseBinaryVector;

    #[test]
    fn test_random_round_trip_continues_stream() {
        let mut original = DeterministicRandom::new(7);
        for _ in 0..13 {
            original.next_u32();
        }
        let blob = Codec::<DeterministicRandom>::encode(&SchemaCodec, &original).unwrap();
        assert_eq!(blob.format_tag, *b"SRNG");

        let mut restored: DeterministicRandom = SchemaCodec.decode(&blob).unwrap();
        for _ in 0..20 {
            assert_eq!(original.next_u32(), restored.next_u32());
        }
    }

    #[test]
    fn test_encoder_round_trip_preserves_state() {
        let mut encoder = SparseEncoder::initialize(EncoderParams::new(40, 20, 3)).unwrap();
        let mut rng = DeterministicRandom::new(2);
        let mut input = SparseBinaryVector::with_leading_ones(40, 6);
        for _ in 0..10 {
            rng.shuffle(input.as_mut_slice());
            encoder.compute(&input, true).unwrap();
        }

        let bytes = SchemaCodec.encode_bytes(&encoder).unwrap();
        let restored: SparseEncoder = SchemaCodec.decode_bytes(&bytes).unwrap();
        assert_eq!(restored, encoder);
    }

    #[test]
    fn test_rejects_legacy_tag() {
        let rng = DeterministicRandom::new(1);
        let legacy = crate::codec::LegacyCodec.encode(&rng).unwrap();
        let result: Result<DeterministicRandom, _> = SchemaCodec.decode(&legacy);
        assert!(matches!(result, Err(FormatError::TagMismatch { .. })));
    }

    #[test]
    fn test_rejects_short_payload() {
        let rng = DeterministicRandom::new(1);
        let mut blob = Codec::<DeterministicRandom>::encode(&SchemaCodec, &rng).unwrap();
        blob.payload.truncate(blob.payload.len() / 2);
        let result: Result<DeterministicRandom, _> = SchemaCodec.decode(&blob);
        assert!(matches!(result, Err(FormatError::Malformed(_))));
    }

    #[test]
    fn test_rejects_trailing_payload_bytes() {
        let rng = DeterministicRandom::new(1);
        let mut blob = Codec::<DeterministicRandom>::encode(&SchemaCodec, &rng).unwrap();
        blob.payload.extend_from_slice(b"GARBAGE");
        let bytes = blob.to_bytes();
        let result: Result<DeterministicRandom, _> = SchemaCodec.decode_bytes(&bytes);
        assert!(matches!(result, Err(FormatError::Malformed(_))));
    }

    #[test]
    fn test_payload_matches_default_bincode_layout() {
        let rng = DeterministicRandom::new(5);
        let blob = Codec::<DeterministicRandom>::encode(&SchemaCodec, &rng).unwrap();
        assert_eq!(blob.payload, bincode::serialize(&rng.snapshot()).unwrap());
    }
}
