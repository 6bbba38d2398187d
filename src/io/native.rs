//! Native binary format for numeric tables.
//!
//! # Format Structure
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Header (32 bytes)                        │
//! ├────────────────────────────────────────────────────────────┤
//! │                    Payload (variable)                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The payload is the Postcard encoding of the whole [`NumericTable`]:
//! dictionary, layout parameters and stored values. Values are written
//! bit-for-bit, so a round trip reproduces the table exactly.
//!
//! # Example
//!
//! ```
//! use numtable::io::TableCodec;
//! use numtable::NumericTable;
//!
//! let table = NumericTable::from_vec(2, 2, vec![1.0f64, 2.0, 3.0, 4.0]).unwrap();
//! let codec = TableCodec::new();
//! let bytes = codec.serialize_table(&table).unwrap();
//! let loaded = codec.deserialize_table(&bytes).unwrap();
//! assert_eq!(loaded, table);
//! ```

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::data::{NumericTable, StorageLayout, Table};
use crate::error::TableError;

// ============================================================================
// Constants
// ============================================================================

/// Magic bytes identifying a serialized table.
pub const MAGIC: &[u8; 4] = b"NTBL";

/// Current format version (major).
pub const CURRENT_VERSION_MAJOR: u8 = 1;

/// Current format version (minor).
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the format header in bytes.
pub const HEADER_SIZE: usize = 32;

// ============================================================================
// Format Flags
// ============================================================================

/// Bitfield flags describing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags(u16);

impl FormatFlags {
    /// Storage was allocated when written.
    pub const ALLOCATED: u16 = 1 << 0;
    /// At least one column is categorical.
    pub const HAS_CATEGORICAL: u16 = 1 << 1;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    pub fn set(&mut self, flag: u16) {
        self.0 |= flag;
    }

    pub fn clear(&mut self, flag: u16) {
        self.0 &= !flag;
    }
}

// ============================================================================
// Format Header
// ============================================================================

/// 32-byte header of a serialized table.
///
/// # Layout
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     Magic ("NTBL")
/// 4       1     Version major
/// 5       1     Version minor
/// 6       1     Storage layout tag
/// 7       1     Reserved
/// 8       2     Flags (bitfield)
/// 10      2     Reserved
/// 12      4     Payload size (bytes)
/// 16      4     CRC32 checksum of payload
/// 20      4     Number of rows
/// 24      4     Number of columns
/// 28      4     Reserved
/// ```
///
/// Multi-byte fields are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub layout: StorageLayout,
    pub flags: FormatFlags,
    /// Size of the payload in bytes.
    pub payload_size: u32,
    /// CRC32 checksum of the payload.
    pub checksum: u32,
    pub n_rows: u32,
    pub n_cols: u32,
}

impl FormatHeader {
    /// Create a header with the current version and an empty payload.
    pub fn new(layout: StorageLayout, n_rows: u32, n_cols: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            layout,
            flags: FormatFlags::empty(),
            payload_size: 0,
            checksum: 0,
            n_rows,
            n_cols,
        }
    }

    /// Header describing `table`.
    ///
    /// # Errors
    ///
    /// `SerializeError::TooLarge` if a dimension does not fit in 32 bits.
    pub fn for_table(table: &NumericTable) -> Result<Self, SerializeError> {
        let n_rows = u32::try_from(table.n_rows()).map_err(|_| SerializeError::TooLarge {
            field: "rows",
            value: table.n_rows(),
        })?;
        let n_cols = u32::try_from(table.n_cols()).map_err(|_| SerializeError::TooLarge {
            field: "columns",
            value: table.n_cols(),
        })?;
        let mut header = Self::new(table.layout(), n_rows, n_cols);
        if table.is_allocated() {
            header.flags.set(FormatFlags::ALLOCATED);
        }
        if table.dictionary().has_categorical() {
            header.flags.set(FormatFlags::HAS_CATEGORICAL);
        }
        Ok(header)
    }

    /// Serialize header to 32 bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[6] = self.layout.tag();
        buf[8..10].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf[20..24].copy_from_slice(&self.n_rows.to_le_bytes());
        buf[24..28].copy_from_slice(&self.n_cols.to_le_bytes());
        buf
    }

    /// Parse header from 32 bytes.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, DeserializeError> {
        if &buf[0..4] != MAGIC {
            return Err(DeserializeError::NotATable);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(DeserializeError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let layout = StorageLayout::from_tag(buf[6])
            .ok_or_else(|| DeserializeError::CorruptPayload(format!("invalid layout tag {}", buf[6])))?;

        let le_u32 = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);

        Ok(Self {
            version_major,
            version_minor,
            layout,
            flags: FormatFlags::from_bits(u16::from_le_bytes([buf[8], buf[9]])),
            payload_size: le_u32(12),
            checksum: le_u32(16),
            n_rows: le_u32(20),
            n_cols: le_u32(24),
        })
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during serialization.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    /// A dimension or the payload exceeds the 32-bit header fields.
    #[error("{field} count {value} does not fit the format header")]
    TooLarge { field: &'static str, value: usize },
}

/// Errors that can occur during deserialization.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// Wrong magic bytes.
    #[error("not a serialized numeric table")]
    NotATable,

    /// Written by a newer major version of the format.
    #[error("table requires format version {major}.{minor} or later")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("input truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Payload decoded but disagrees with the header or is malformed.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// Payload layout differs from the layout tag in the header.
    #[error("layout mismatch: header says {header:?}, payload holds {payload:?}")]
    LayoutMismatch {
        header: StorageLayout,
        payload: StorageLayout,
    },

    /// Payload decoded into a table that violates its own invariants.
    #[error("invalid table: {0}")]
    InvalidTable(#[from] TableError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding error: {0}")]
    Decoding(#[from] postcard::Error),
}

// ============================================================================
// Component Encoding
// ============================================================================

/// Compute CRC32 checksum of data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Encode a dictionary, descriptor, backend or table without framing.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializeError> {
    Ok(postcard::to_allocvec(value)?)
}

/// Decode a value written by [`encode`].
///
/// Decoded backends and tables are not validated; use
/// [`TableCodec::deserialize_table`] for checked table input.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DeserializeError> {
    Ok(postcard::from_bytes(bytes)?)
}

// ============================================================================
// Table Codec
// ============================================================================

/// Codec for tables in the native format.
#[derive(Debug, Clone, Default)]
pub struct TableCodec {
    /// Skip the structural validation of decoded tables.
    pub trust_payload: bool,
}

impl TableCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write header and payload, filling in size and checksum.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        header: &mut FormatHeader,
        payload: &[u8],
    ) -> Result<(), SerializeError> {
        header.payload_size = u32::try_from(payload.len()).map_err(|_| SerializeError::TooLarge {
            field: "payload bytes",
            value: payload.len(),
        })?;
        header.checksum = compute_checksum(payload);
        writer.write_all(&header.to_bytes())?;
        writer.write_all(payload)?;
        Ok(())
    }

    /// Read header and payload, verifying the checksum.
    pub fn read_from<R: Read>(&self, reader: &mut R) -> Result<(FormatHeader, Vec<u8>), DeserializeError> {
        let mut header_buf = [0u8; HEADER_SIZE];
        read_exact(reader, &mut header_buf)?;
        let header = FormatHeader::from_bytes(&header_buf)?;

        let mut payload = vec![0u8; header.payload_size as usize];
        read_exact(reader, &mut payload)?;

        let actual = compute_checksum(&payload);
        if actual != header.checksum {
            return Err(DeserializeError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }
        Ok((header, payload))
    }

    /// Serialize `table` with its header.
    pub fn serialize_table(&self, table: &NumericTable) -> Result<Vec<u8>, SerializeError> {
        let payload = encode(table)?;
        let mut header = FormatHeader::for_table(table)?;
        let mut output = Vec::with_capacity(HEADER_SIZE + payload.len());
        self.write_to(&mut output, &mut header, &payload)?;
        debug!(
            layout = ?header.layout,
            rows = header.n_rows,
            cols = header.n_cols,
            bytes = output.len(),
            "serialized table"
        );
        Ok(output)
    }

    /// Stream `table` to `writer`.
    pub fn write_table<W: Write>(&self, writer: &mut W, table: &NumericTable) -> Result<(), SerializeError> {
        let payload = encode(table)?;
        let mut header = FormatHeader::for_table(table)?;
        self.write_to(writer, &mut header, &payload)
    }

    /// Deserialize a table from bytes.
    pub fn deserialize_table(&self, bytes: &[u8]) -> Result<NumericTable, DeserializeError> {
        let mut cursor = bytes;
        self.read_table(&mut cursor)
    }

    /// Read a table from `reader`.
    ///
    /// The decoded table must agree with its header and, unless
    /// `trust_payload` is set, pass [`NumericTable::check_invariants`].
    pub fn read_table<R: Read>(&self, reader: &mut R) -> Result<NumericTable, DeserializeError> {
        let (header, payload) = self.read_from(reader)?;
        let table: NumericTable = decode(&payload)?;

        if table.layout() != header.layout {
            return Err(DeserializeError::LayoutMismatch {
                header: header.layout,
                payload: table.layout(),
            });
        }
        if table.n_rows() != header.n_rows as usize || table.n_cols() != header.n_cols as usize {
            return Err(DeserializeError::CorruptPayload(format!(
                "header shape {}x{} differs from payload shape {}x{}",
                header.n_rows,
                header.n_cols,
                table.n_rows(),
                table.n_cols()
            )));
        }
        if header.flags.contains(FormatFlags::ALLOCATED) != table.is_allocated() {
            return Err(DeserializeError::CorruptPayload("allocation flag differs from payload".into()));
        }
        if !self.trust_payload {
            table.check_invariants()?;
        }
        debug!(layout = ?header.layout, rows = header.n_rows, cols = header.n_cols, "deserialized table");
        Ok(table)
    }
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), DeserializeError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(DeserializeError::Truncated {
                    expected: buf.len(),
                    actual: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(DeserializeError::Io(e)),
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
