//! Legacy Codec - ASCII token stream
//!
//! The older persistence path: every field is written as a whitespace
//! separated token, sequences as `<count> <item>...`, and each record is
//! bracketed by an opening and closing marker word:
//!
//! ```text
//! RandomState <seed> <draw_count> <front> <rear> 31 <w0> ... <w30> ~RandomState
//! ```
//!
//! Floats use Rust's shortest round-trip formatting, so parsing them back is
//! bit-exact.

use super::{Codec, Persistable, SerializedBlob};
use crate::encoder::{EncoderParams, EncoderState};
use crate::error::FormatError;
use crate::random::{RandomState, STATE_WORDS};
use std::fmt::{Display, Write};
use std::str::{FromStr, SplitAsciiWhitespace};

/// Payload format version written by this codec
pub const LEGACY_VERSION: u16 = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyCodec;

impl<T: Persistable> Codec<T> for LegacyCodec {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn encode(&self, value: &T) -> Result<SerializedBlob, FormatError> {
        let mut out = TokenWriter::default();
        value.to_state().write_tokens(&mut out);
        Ok(SerializedBlob::new(
            T::LEGACY_TAG,
            LEGACY_VERSION,
            out.finish().into_bytes(),
        ))
    }

    fn decode(&self, blob: &SerializedBlob) -> Result<T, FormatError> {
        blob.expect(T::LEGACY_TAG, LEGACY_VERSION)?;
        let text = std::str::from_utf8(&blob.payload)
            .map_err(|e| FormatError::Malformed(format!("payload is not UTF-8: {}", e)))?;
        let mut input = TokenReader::new(text);
        let state = T::State::read_tokens(&mut input)?;
        input.finish()?;
        T::from_state(state)
    }
}

// ============================================================
// Token I/O
// ============================================================

#[derive(Debug, Default)]
pub struct TokenWriter {
    buf: String,
}

impl TokenWriter {
    pub fn token(&mut self, value: impl Display) {
        // Writing into a String cannot fail
        let _ = write!(self.buf, "{} ", value);
    }

    pub fn seq<T: Display>(&mut self, items: &[T]) {
        self.token(items.len());
        for item in items {
            self.token(item);
        }
    }

    pub fn newline(&mut self) {
        self.buf.push('\n');
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

pub struct TokenReader<'a> {
    tokens: SplitAsciiWhitespace<'a>,
}

impl<'a> TokenReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            tokens: text.split_ascii_whitespace(),
        }
    }

    pub fn next_token(&mut self, what: &str) -> Result<&'a str, FormatError> {
        self.tokens.next().ok_or_else(|| {
            FormatError::Malformed(format!("unexpected end of payload reading {}", what))
        })
    }

    pub fn parse<T: FromStr>(&mut self, what: &str) -> Result<T, FormatError> {
        let token = self.next_token(what)?;
        token
            .parse()
            .map_err(|_| FormatError::Malformed(format!("invalid {}: '{}'", what, token)))
    }

    pub fn marker(&mut self, expected: &str) -> Result<(), FormatError> {
        let token = self.next_token(expected)?;
        if token != expected {
            return Err(FormatError::Malformed(format!(
                "expected marker '{}', found '{}'",
                expected, token
            )));
        }
        Ok(())
    }

    pub fn seq<T: FromStr>(&mut self, what: &str) -> Result<Vec<T>, FormatError> {
        let count: usize = self.parse(what)?;
        let mut items = Vec::new();
        for _ in 0..count {
            items.push(self.parse(what)?);
        }
        Ok(items)
    }

    /// Reject anything after the closing marker.
    pub fn finish(mut self) -> Result<(), FormatError> {
        match self.tokens.next() {
            None => Ok(()),
            Some(extra) => Err(FormatError::Malformed(format!(
                "trailing token after record: '{}'",
                extra
            ))),
        }
    }
}

// ============================================================
// Records
// ============================================================

/// State structs the legacy codec can write and read.
pub trait LegacyRecord: Sized {
    fn write_tokens(&self, out: &mut TokenWriter);
    fn read_tokens(input: &mut TokenReader<'_>) -> Result<Self, FormatError>;
}

impl LegacyRecord for RandomState {
    fn write_tokens(&self, out: &mut TokenWriter) {
        out.token("RandomState");
        out.token(self.seed);
        out.token(self.draw_count);
        out.token(self.front);
        out.token(self.rear);
        out.seq(&self.state);
        out.token("~RandomState");
    }

    fn read_tokens(input: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        input.marker("RandomState")?;
        let seed = input.parse("seed")?;
        let draw_count = input.parse("draw_count")?;
        let front = input.parse("front")?;
        let rear = input.parse("rear")?;
        let words: Vec<u32> = input.seq("state word")?;
        let state: [u32; STATE_WORDS] = words.try_into().map_err(|w: Vec<u32>| {
            FormatError::Corrupt(format!(
                "random state has {} words, expected {}",
                w.len(),
                STATE_WORDS
            ))
        })?;
        input.marker("~RandomState")?;
        Ok(RandomState {
            seed,
            draw_count,
            state,
            front,
            rear,
        })
    }
}

impl LegacyRecord for EncoderParams {
    fn write_tokens(&self, out: &mut TokenWriter) {
        out.token(self.input_size);
        out.token(self.column_count);
        out.token(self.active_count);
        out.token(self.potential_pct);
        out.token(self.connected_threshold);
        out.token(self.permanence_increment);
        out.token(self.permanence_decrement);
        out.token(self.stimulus_threshold);
        out.token(self.duty_cycle_period);
        out.token(self.boost_strength);
        out.token(self.seed);
    }

    fn read_tokens(input: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        Ok(EncoderParams {
            input_size: input.parse("input_size")?,
            column_count: input.parse("column_count")?,
            active_count: input.parse("active_count")?,
            potential_pct: input.parse("potential_pct")?,
            connected_threshold: input.parse("connected_threshold")?,
            permanence_increment: input.parse("permanence_increment")?,
            permanence_decrement: input.parse("permanence_decrement")?,
            stimulus_threshold: input.parse("stimulus_threshold")?,
            duty_cycle_period: input.parse("duty_cycle_period")?,
            boost_strength: input.parse("boost_strength")?,
            seed: input.parse("seed")?,
        })
    }
}

impl LegacyRecord for EncoderState {
    fn write_tokens(&self, out: &mut TokenWriter) {
        out.token("SparseEncoder");
        self.params.write_tokens(out);
        out.newline();

        out.token(self.potential_pools.len());
        for pool in &self.potential_pools {
            out.seq(pool);
        }
        out.newline();

        for values in [
            &self.permanences,
            &self.tie_breakers,
            &self.boost_factors,
            &self.active_duty_cycles,
        ] {
            out.seq(values);
            out.newline();
        }

        out.token(self.learning_iterations);
        out.seq(&self.last_active);
        out.token("~SparseEncoder");
    }

    fn read_tokens(input: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        input.marker("SparseEncoder")?;
        let params = EncoderParams::read_tokens(input)?;

        let pool_count: usize = input.parse("pool count")?;
        let mut potential_pools = Vec::new();
        for _ in 0..pool_count {
            potential_pools.push(input.seq("potential pool")?);
        }

        let permanences = input.seq("permanence")?;
        let tie_breakers = input.seq("tie_breaker")?;
        let boost_factors = input.seq("boost_factor")?;
        let active_duty_cycles = input.seq("active_duty_cycle")?;
        let learning_iterations = input.parse("learning_iterations")?;
        let last_active = input.seq("last_active")?;
        input.marker("~SparseEncoder")?;

        Ok(EncoderState {
            params,
            potential_pools,
            permanences,
            tie_breakers,
            boost_factors,
            active_duty_cycles,
            learning_iterations,
            last_active,
        })
    }
}
