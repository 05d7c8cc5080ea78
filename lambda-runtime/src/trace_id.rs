//! Codec for the X-Ray trace identifier carried on the
//! `lambda-runtime-trace-id` header.
//!
//! AWS guarantees the wire format is exactly `1-HHHHHHHH-HHHHHHHHHHHHHHHHHHHHHHHH`
//! (lowercase hex, hyphen-separated, 35 ASCII bytes). We parse and format it
//! by hand rather than pulling in a general hex crate: the format is fixed
//! width and the only thing worth optimizing for is rejecting anything that
//! isn't exactly this shape, since a silently-accepted uppercase byte would
//! make round-trips lossy and mask a bug upstream.

use rand::RngCore;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

const HEX_ENCODE: &[u8; 16] = b"0123456789abcdef";

/// Decode table for ASCII bytes `[0-9a-f]`; everything else maps to `0xff`.
/// Built once at compile time so `parse` never has to branch on ranges.
const HEX_DECODE: [u8; 256] = build_hex_decode_table();

const fn build_hex_decode_table() -> [u8; 256] {
    let mut table = [0xffu8; 256];
    let mut b = b'0';
    while b <= b'9' {
        table[b as usize] = b - b'0';
        b += 1;
    }
    let mut b = b'a';
    while b <= b'f' {
        table[b as usize] = b - b'a' + 10;
        b += 1;
    }
    table
}

fn decode_hex_into(src: &[u8], dst: &mut [u8]) -> Result<(), usize> {
    debug_assert_eq!(src.len(), dst.len() * 2);
    for (i, pair) in src.chunks_exact(2).enumerate() {
        let hi = HEX_DECODE[pair[0] as usize];
        let lo = HEX_DECODE[pair[1] as usize];
        if hi == 0xff {
            return Err(2 * i);
        }
        if lo == 0xff {
            return Err(2 * i + 1);
        }
        dst[i] = (hi << 4) | lo;
    }
    Ok(())
}

fn encode_hex_into(src: &[u8], dst: &mut [u8]) {
    debug_assert_eq!(dst.len(), src.len() * 2);
    for (i, byte) in src.iter().enumerate() {
        dst[2 * i] = HEX_ENCODE[(byte >> 4) as usize];
        dst[2 * i + 1] = HEX_ENCODE[(byte & 0x0f) as usize];
    }
}

/// Why a string failed to parse as a [`TraceId`] or [`SegmentId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TraceIdError {
    /// The string was not exactly the expected length.
    #[error("invalid trace id length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Length the grammar requires.
        expected: usize,
        /// Length actually observed.
        actual: usize,
    },
    /// The leading version byte was not `'1'`.
    #[error("invalid trace id version byte")]
    InvalidVersion,
    /// A hyphen was missing at one of the two fixed positions.
    #[error("missing dash separator in trace id")]
    MissingDashes,
    /// A byte outside `[0-9a-f]` appeared where hex was required.
    #[error("invalid hex byte at offset {0}")]
    InvalidFormat(usize),
}

/// The 35-byte X-Ray trace identifier: `1-{8 hex timestamp}-{24 hex identifier}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId {
    timestamp: u32,
    identifier: [u8; 12],
}

const TRACE_ID_LEN: usize = 35;

impl TraceId {
    /// Seconds-since-epoch recorded in the identifier.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// The 12 random identifier bytes.
    pub fn identifier(&self) -> [u8; 12] {
        self.identifier
    }

    /// Generate a new trace id: current Unix time plus 12 bytes from a
    /// cryptographically secure random source.
    pub fn generate() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let mut identifier = [0u8; 12];
        rand::rngs::OsRng.fill_bytes(&mut identifier);
        Self { timestamp, identifier }
    }

    /// Parse the canonical 35-byte textual form.
    pub fn parse(s: &str) -> Result<Self, TraceIdError> {
        let bytes = s.as_bytes();
        if bytes.len() != TRACE_ID_LEN {
            return Err(TraceIdError::InvalidLength {
                expected: TRACE_ID_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != b'1' {
            return Err(TraceIdError::InvalidVersion);
        }
        if bytes[1] != b'-' || bytes[10] != b'-' {
            return Err(TraceIdError::MissingDashes);
        }

        let mut timestamp_bytes = [0u8; 4];
        decode_hex_into(&bytes[2..10], &mut timestamp_bytes).map_err(|off| TraceIdError::InvalidFormat(2 + off))?;
        let timestamp = u32::from_be_bytes(timestamp_bytes);

        let mut identifier = [0u8; 12];
        decode_hex_into(&bytes[11..35], &mut identifier).map_err(|off| TraceIdError::InvalidFormat(11 + off))?;

        Ok(Self { timestamp, identifier })
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; TRACE_ID_LEN];
        buf[0] = b'1';
        buf[1] = b'-';
        encode_hex_into(&self.timestamp.to_be_bytes(), &mut buf[2..10]);
        buf[10] = b'-';
        encode_hex_into(&self.identifier, &mut buf[11..35]);
        // Every byte above came from a fixed lowercase-hex table or a literal.
        f.write_str(std::str::from_utf8(&buf).expect("trace id buffer is always valid ASCII"))
    }
}

/// A 64-bit X-Ray segment id, rendered as 16 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(u64);

const SEGMENT_ID_LEN: usize = 16;

impl SegmentId {
    /// Wrap a raw 64-bit id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw 64-bit value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Generate a new segment id from a cryptographically secure random source.
    pub fn generate() -> Self {
        Self(rand::rngs::OsRng.next_u64())
    }

    /// Parse exactly 16 lowercase hex characters.
    pub fn parse(s: &str) -> Result<Self, TraceIdError> {
        let bytes = s.as_bytes();
        if bytes.len() != SEGMENT_ID_LEN {
            return Err(TraceIdError::InvalidLength {
                expected: SEGMENT_ID_LEN,
                actual: bytes.len(),
            });
        }
        let mut id_bytes = [0u8; 8];
        decode_hex_into(bytes, &mut id_bytes).map_err(TraceIdError::InvalidFormat)?;
        Ok(Self(u64::from_be_bytes(id_bytes)))
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; SEGMENT_ID_LEN];
        encode_hex_into(&self.0.to_be_bytes(), &mut buf);
        f.write_str(std::str::from_utf8(&buf).expect("segment id buffer is always valid ASCII"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trips_the_spec_example() {
        let s = "1-5759e988-bd862e3fe1be46a994272793";
        let parsed = TraceId::parse(s).unwrap();
        assert_eq!(parsed.to_string(), s);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = TraceId::parse("1-5759e988-bd862e3fe1be46a99427279").unwrap_err();
        assert_eq!(
            err,
            TraceIdError::InvalidLength {
                expected: 35,
                actual: 34
            }
        );
    }

    #[test]
    fn rejects_bad_version_byte() {
        let s = "2-5759e988-bd862e3fe1be46a994272793";
        assert_eq!(TraceId::parse(s).unwrap_err(), TraceIdError::InvalidVersion);
    }

    #[test]
    fn rejects_missing_dashes() {
        let s = "1_5759e988-bd862e3fe1be46a994272793";
        assert_eq!(TraceId::parse(s).unwrap_err(), TraceIdError::MissingDashes);
        let s = "1-5759e988_bd862e3fe1be46a994272793";
        assert_eq!(TraceId::parse(s).unwrap_err(), TraceIdError::MissingDashes);
    }

    #[test]
    fn rejects_uppercase_hex() {
        let s = "1-5759E988-bd862e3fe1be46a994272793";
        assert!(matches!(
            TraceId::parse(s).unwrap_err(),
            TraceIdError::InvalidFormat(_)
        ));
    }

    #[test]
    fn generate_produces_grammar_conformant_string_with_fresh_timestamp() {
        let before = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as u32;
        let id = TraceId::generate();
        let after = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as u32;
        assert!(id.timestamp() >= before.saturating_sub(1) && id.timestamp() <= after + 1);
        let formatted = id.to_string();
        assert_eq!(TraceId::parse(&formatted).unwrap(), id);
    }

    #[test]
    fn segment_id_round_trips_and_pads() {
        let id = SegmentId::new(0x2a);
        assert_eq!(id.to_string(), "000000000000002a");
        assert_eq!(SegmentId::parse(&id.to_string()).unwrap(), id);
    }

    proptest! {
        #[test]
        fn format_parse_round_trip(timestamp: u32, identifier: [u8; 12]) {
            let id = TraceId { timestamp, identifier };
            let formatted = id.to_string();
            prop_assert_eq!(formatted.len(), 35);
            prop_assert_eq!(TraceId::parse(&formatted).unwrap(), id);
        }

        #[test]
        fn any_35_byte_grammar_string_round_trips(
            ts in proptest::collection::vec(0u8..16, 8),
            ident in proptest::collection::vec(0u8..16, 24),
        ) {
            let nibble = |n: u8| HEX_ENCODE[n as usize] as char;
            let mut s = String::with_capacity(35);
            s.push('1');
            s.push('-');
            for n in &ts { s.push(nibble(*n)); }
            s.push('-');
            for n in &ident { s.push(nibble(*n)); }
            let parsed = TraceId::parse(&s).unwrap();
            prop_assert_eq!(parsed.to_string(), s);
        }

        #[test]
        fn segment_id_round_trip(value: u64) {
            let id = SegmentId::new(value);
            prop_assert_eq!(SegmentId::parse(&id.to_string()).unwrap(), id);
        }
    }
}
