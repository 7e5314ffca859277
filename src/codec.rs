//! Snapshot encoding.
//!
//! A snapshot is a fixed header followed by a `serde_json` payload:
//!
//! ```text
//! offset  size  field
//! 0       4     magic "CCSN"
//! 4       2     format version (u16 LE)
//! 6       4     schema version (u32 LE, chosen by the cache owner)
//! 10      8     payload length in bytes (u64 LE)
//! 18      32    SHA-256 of the payload
//! 50      n     payload
//! ```
//!
//! Any deviation (wrong magic, unknown versions, short payload, trailing
//! bytes, checksum mismatch, JSON that does not fit the target type) is
//! reported as a [`CodecError`], which the strategy treats as a corrupt file.

use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

/// Leading bytes of every snapshot.
pub const MAGIC: [u8; 4] = *b"CCSN";

/// Current version of the envelope layout.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 50;

/// Default ceiling for the payload length declared in a header.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// Upper bound on the up-front allocation when reading a payload.
const INITIAL_READ_CAPACITY: usize = 64 * 1024;

/// Converts a cache to and from a byte stream.
pub trait SnapshotCodec<T> {
    /// Write `cache` to `out`.
    fn encode(&self, cache: &T, out: &mut dyn Write) -> Result<(), CodecError>;

    /// Read a cache from `input`, consuming it to the end.
    fn decode(&self, input: &mut dyn Read) -> Result<T, CodecError>;
}

/// Errors produced while encoding or decoding a snapshot.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    /// The underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input does not start with [`MAGIC`].
    #[error("Not a cache snapshot (bad magic)")]
    BadMagic,

    /// The envelope layout version is not understood.
    #[error("Unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedFormat { found: u16, expected: u16 },

    /// The snapshot was written for a different cache schema.
    #[error("Snapshot schema version {found} does not match expected {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    /// The input ended early.
    #[error("Snapshot truncated in {section}: expected {expected} bytes, found {found}")]
    Truncated {
        section: &'static str,
        expected: u64,
        found: u64,
    },

    /// The declared payload length exceeds the configured limit.
    #[error("Snapshot payload of {size} bytes exceeds limit of {max} bytes")]
    PayloadTooLarge { size: u64, max: u64 },

    /// Bytes follow the declared payload.
    #[error("Snapshot has unexpected trailing bytes")]
    TrailingBytes,

    /// The payload does not match its recorded checksum.
    #[error("Snapshot integrity check failed: checksum mismatch")]
    ChecksumMismatch,

    /// The payload is not valid JSON for the cache type.
    #[error("Failed to parse snapshot payload: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The cache could not be serialized.
    #[error("Failed to serialize snapshot payload: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Versioned, checksummed envelope around a JSON payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeCodec {
    schema_version: u32,
    max_payload_bytes: u64,
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new(1)
    }
}

impl EnvelopeCodec {
    /// Create a codec that writes and accepts only `schema_version`.
    ///
    /// Bump the schema version whenever the cache type changes shape in a
    /// way that old snapshots should no longer be trusted.
    #[must_use]
    pub fn new(schema_version: u32) -> Self {
        Self {
            schema_version,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    /// Set the largest payload length that `encode` writes and `decode` accepts.
    #[must_use]
    pub fn with_max_payload_bytes(mut self, max: u64) -> Self {
        self.max_payload_bytes = max;
        self
    }

    /// Schema version written into and expected from every snapshot.
    #[must_use]
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Largest payload length accepted by `decode`.
    #[must_use]
    pub fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }

    fn header(&self, payload: &[u8]) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&MAGIC);
        header[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        header[6..10].copy_from_slice(&self.schema_version.to_le_bytes());
        header[10..18].copy_from_slice(&(payload.len() as u64).to_le_bytes());
        header[18..50].copy_from_slice(&checksum(payload));
        header
    }
}

impl<T> SnapshotCodec<T> for EnvelopeCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, cache: &T, out: &mut dyn Write) -> Result<(), CodecError> {
        let payload = serde_json::to_vec(cache).map_err(CodecError::Encode)?;
        // A snapshot this codec would refuse to read back is not written
        if payload.len() as u64 > self.max_payload_bytes {
            return Err(CodecError::PayloadTooLarge {
                size: payload.len() as u64,
                max: self.max_payload_bytes,
            });
        }
        out.write_all(&self.header(&payload))?;
        out.write_all(&payload)?;
        out.flush()?;
        Ok(())
    }

    fn decode(&self, input: &mut dyn Read) -> Result<T, CodecError> {
        let mut header = [0u8; HEADER_LEN];
        let found = read_full(input, &mut header)?;
        if found < HEADER_LEN {
            return Err(CodecError::Truncated {
                section: "header",
                expected: HEADER_LEN as u64,
                found: found as u64,
            });
        }

        if header[0..4] != MAGIC {
            return Err(CodecError::BadMagic);
        }

        let format = u16::from_le_bytes([header[4], header[5]]);
        if format != FORMAT_VERSION {
            return Err(CodecError::UnsupportedFormat {
                found: format,
                expected: FORMAT_VERSION,
            });
        }

        let schema = u32::from_le_bytes([header[6], header[7], header[8], header[9]]);
        if schema != self.schema_version {
            return Err(CodecError::SchemaMismatch {
                found: schema,
                expected: self.schema_version,
            });
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&header[10..18]);
        let len = u64::from_le_bytes(len_bytes);
        if len > self.max_payload_bytes {
            return Err(CodecError::PayloadTooLarge {
                size: len,
                max: self.max_payload_bytes,
            });
        }

        let capacity = usize::try_from(len)
            .unwrap_or(usize::MAX)
            .min(INITIAL_READ_CAPACITY);
        let mut payload = Vec::with_capacity(capacity);
        (&mut *input).take(len).read_to_end(&mut payload)?;
        if (payload.len() as u64) < len {
            return Err(CodecError::Truncated {
                section: "payload",
                expected: len,
                found: payload.len() as u64,
            });
        }

        let mut probe = [0u8; 1];
        if read_full(input, &mut probe)? != 0 {
            return Err(CodecError::TrailingBytes);
        }

        if checksum(&payload)[..] != header[18..50] {
            return Err(CodecError::ChecksumMismatch);
        }

        serde_json::from_slice(&payload).map_err(CodecError::Malformed)
    }
}

/// SHA-256 of `payload`.
fn checksum(payload: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Fill `buf` as far as the input allows, returning the number of bytes read.
fn read_full(input: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
