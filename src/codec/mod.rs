//! Codecs - persist stateful components to bytes and back
//!
//! Two interchangeable implementations share one outer frame:
//!
//! - [`SchemaCodec`] - bincode payload of the serde state struct
//! - [`LegacyCodec`] - whitespace-separated ASCII token stream
//!
//! # Frame Layout (16-byte header)
//!
//! ```text
//! ┌─────────────┬─────────┬────────────────────────────────────┐
//! │ format_tag  │ 4 bytes │ Codec + component (e.g. SENC/LRNG) │
//! │ version     │ 2 bytes │ Payload format version (LE)        │
//! │ reserved    │ 2 bytes │ Always zero                        │
//! │ payload_len │ 4 bytes │ Payload size in bytes (LE)         │
//! │ checksum    │ 4 bytes │ CRC32 of payload (LE)              │
//! └─────────────┴─────────┴────────────────────────────────────┘
//! ```
//!
//! Decoding never hands back a partially built component: the frame, the
//! payload and the component's own invariants are all checked first.

pub mod legacy;
pub mod schema;

pub use legacy::{LegacyCodec, LegacyRecord};
pub use schema::SchemaCodec;

use crate::encoder::{EncoderState, SparseEncoder};
use crate::error::FormatError;
use crate::random::{DeterministicRandom, RandomState};
use crc32fast::Hasher;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;

// ============================================================
// CONSTANTS
// ============================================================

/// Frame header size in bytes
pub const FRAME_HEADER_SIZE: usize = 16;

// ============================================================
// SERIALIZED BLOB
// ============================================================

/// Output of `encode`, input of `decode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedBlob {
    pub format_tag: [u8; 4],
    pub version: u16,
    pub payload: Vec<u8>,
}

impl SerializedBlob {
    pub fn new(format_tag: [u8; 4], version: u16, payload: Vec<u8>) -> Self {
        Self {
            format_tag,
            version,
            payload,
        }
    }

    /// Frame header + payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&self.format_tag);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&crc32_checksum(&self.payload).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parse a frame, checking declared length and checksum.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(FormatError::Truncated {
                declared: FRAME_HEADER_SIZE,
                available: bytes.len(),
            });
        }
        let format_tag = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        let payload_len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        let checksum = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

        let payload = &bytes[FRAME_HEADER_SIZE..];
        if payload.len() < payload_len {
            return Err(FormatError::Truncated {
                declared: payload_len,
                available: payload.len(),
            });
        }
        if payload.len() > payload_len {
            return Err(FormatError::Malformed(format!(
                "{} trailing bytes after payload",
                payload.len() - payload_len
            )));
        }

        let actual = crc32_checksum(payload);
        if actual != checksum {
            return Err(FormatError::ChecksumMismatch {
                expected: checksum,
                actual,
            });
        }

        Ok(Self::new(format_tag, version, payload.to_vec()))
    }

    /// Check tag and version against what a codec produces.
    pub fn expect(&self, tag: [u8; 4], version: u16) -> Result<(), FormatError> {
        if self.format_tag != tag {
            return Err(FormatError::TagMismatch {
                expected: tag_name(&tag),
                found: tag_name(&self.format_tag),
            });
        }
        if self.version != version {
            return Err(FormatError::VersionMismatch {
                tag: tag_name(&tag),
                expected: version,
                found: self.version,
            });
        }
        Ok(())
    }
}

/// Printable form of a format tag.
pub fn tag_name(tag: &[u8; 4]) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

/// Calculate CRC32 checksum of data
#[inline]
pub fn crc32_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

// ============================================================
// CODEC TRAIT
// ============================================================

/// Encode/decode capability for one component type.
pub trait Codec<T> {
    /// Short name used in logs, errors and reports.
    fn name(&self) -> &'static str;

    fn encode(&self, value: &T) -> Result<SerializedBlob, FormatError>;

    fn decode(&self, blob: &SerializedBlob) -> Result<T, FormatError>;

    fn encode_bytes(&self, value: &T) -> Result<Vec<u8>, FormatError> {
        Ok(self.encode(value)?.to_bytes())
    }

    fn decode_bytes(&self, bytes: &[u8]) -> Result<T, FormatError> {
        self.decode(&SerializedBlob::from_bytes(bytes)?)
    }
}

/// A component both codecs know how to persist.
pub trait Persistable: Sized {
    type State: Clone + Serialize + DeserializeOwned + LegacyRecord;

    const SCHEMA_TAG: [u8; 4];
    const LEGACY_TAG: [u8; 4];

    fn to_state(&self) -> Cow<'_, Self::State>;

    /// Must reject states that would leave the component unusable.
    fn from_state(state: Self::State) -> Result<Self, FormatError>;

    fn encode_with(&self, codec: &dyn Codec<Self>) -> Result<Vec<u8>, FormatError> {
        codec.encode_bytes(self)
    }

    fn decode_with(codec: &dyn Codec<Self>, bytes: &[u8]) -> Result<Self, FormatError> {
        codec.decode_bytes(bytes)
    }
}

impl Persistable for DeterministicRandom {
    type State = RandomState;

    const SCHEMA_TAG: [u8; 4] = *b"SRNG";
    const LEGACY_TAG: [u8; 4] = *b"LRNG";

    fn to_state(&self) -> Cow<'_, RandomState> {
        Cow::Owned(self.snapshot())
    }

    fn from_state(state: RandomState) -> Result<Self, FormatError> {
        DeterministicRandom::from_snapshot(state)
    }
}

impl Persistable for SparseEncoder {
    type State = EncoderState;

    const SCHEMA_TAG: [u8; 4] = *b"SENC";
    const LEGACY_TAG: [u8; 4] = *b"LENC";

    fn to_state(&self) -> Cow<'_, EncoderState> {
        Cow::Borrowed(self.state())
    }

    fn from_state(state: EncoderState) -> Result<Self, FormatError> {
        SparseEncoder::from_state(state)
    }
}

// ============================================================
// FORMAT DETECTION
// ============================================================

/// Which codec produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Schema,
    Legacy,
}

/// Decode bytes written by either codec, dispatching on the frame tag.
///
/// Lets a schema-default reader load state persisted in the legacy format.
pub fn decode_any<T: Persistable>(bytes: &[u8]) -> Result<(T, CodecKind), FormatError> {
    let blob = SerializedBlob::from_bytes(bytes)?;
    if blob.format_tag == T::SCHEMA_TAG {
        Ok((SchemaCodec.decode(&blob)?, CodecKind::Schema))
    } else if blob.format_tag == T::LEGACY_TAG {
        Ok((LegacyCodec.decode(&blob)?, CodecKind::Legacy))
    } else {
        Err(FormatError::TagMismatch {
            expected: format!(
                "{}|{}",
                tag_name(&T::SCHEMA_TAG),
                tag_name(&T::LEGACY_TAG)
            ),
            found: tag_name(&blob.format_tag),
        })
    }
}
