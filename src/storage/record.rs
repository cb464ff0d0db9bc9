//! Slot file layout
//!
//! ```text
//! File header (8 bytes)
//! +--------------+----------------+-------------+
//! | Magic "SLOT" | Format (u16 LE)| Fields (u16)|
//! +--------------+----------------+-------------+
//!
//! Record frame
//! +------------------+
//! | Frame Length     | (u32 LE, whole frame)
//! +------------------+
//! | Slot             | (u32 LE)
//! +------------------+
//! | Version          | (u64 LE)
//! +------------------+
//! | Deleted Flag     | (u8: 0 = live, 1 = deleted)
//! +------------------+
//! | Field Count      | (u32 LE)
//! +------------------+
//! | Field Strings    | (length-prefixed UTF-8, repeated)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! The checksum covers every byte of the frame before it.

use std::io::{self, Cursor, Read};

use super::checksum::{compute_checksum, verify_checksum};
use crate::record::{FieldValue, Record, SlotId};
use crate::schema::{Schema, SchemaResult};

pub const MAGIC: [u8; 4] = *b"SLOT";
pub const FORMAT_VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 8;

/// len + slot + version + deleted + field count + checksum
pub const MIN_FRAME_SIZE: usize = 4 + 4 + 8 + 1 + 4 + 4;

/// File header identifying format and record width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub format_version: u16,
    pub field_count: u16,
}

impl FileHeader {
    pub fn new(field_count: u16) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            field_count,
        }
    }

    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..6].copy_from_slice(&self.format_version.to_le_bytes());
        buf[6..8].copy_from_slice(&self.field_count.to_le_bytes());
        buf
    }

    pub fn deserialize(data: &[u8]) -> io::Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Header too short"));
        }
        if data[0..4] != MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "Bad magic, not a slot file"));
        }
        let format_version = u16::from_le_bytes([data[4], data[5]]);
        if format_version != FORMAT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported format version {}", format_version),
            ));
        }
        Ok(Self {
            format_version,
            field_count: u16::from_le_bytes([data[6], data[7]]),
        })
    }
}

/// One persisted generation of a slot, fields in string form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotFileRecord {
    pub slot: SlotId,
    pub version: u64,
    pub deleted: bool,
    pub fields: Vec<String>,
}

impl SlotFileRecord {
    pub fn from_record(record: &Record) -> Self {
        Self {
            slot: record.slot(),
            version: record.version(),
            deleted: record.is_deleted(),
            fields: record.string_forms(),
        }
    }

    /// Parse the stored string forms back into typed values
    pub fn into_record(self, schema: &Schema) -> SchemaResult<Record> {
        let fields = FieldValue::decode_row(&schema.fields, &self.fields)?;
        Ok(if self.deleted {
            Record::tombstone(self.slot, fields, self.version)
        } else {
            Record::new(self.slot, fields, self.version)
        })
    }

    fn serialize_body(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.slot.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.push(u8::from(self.deleted));
        buf.extend_from_slice(&(self.fields.len() as u32).to_le_bytes());
        for field in &self.fields {
            buf.extend_from_slice(&(field.len() as u32).to_le_bytes());
            buf.extend_from_slice(field.as_bytes());
        }
        buf
    }

    /// Complete frame: length, body, checksum
    pub fn serialize(&self) -> Vec<u8> {
        let body = self.serialize_body();
        let frame_length = (4 + body.len() + 4) as u32;

        let mut frame = Vec::with_capacity(frame_length as usize);
        frame.extend_from_slice(&frame_length.to_le_bytes());
        frame.extend_from_slice(&body);
        let checksum = compute_checksum(&frame);
        frame.extend_from_slice(&checksum.to_le_bytes());
        frame
    }

    /// Decode one frame, verifying its checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Frame too short"));
        }

        let frame_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if frame_length < MIN_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid frame length: {}", frame_length),
            ));
        }
        if data.len() < frame_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Frame truncated: expected {} bytes, got {}", frame_length, data.len()),
            ));
        }

        let checksum_offset = frame_length - 4;
        let stored = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        if !verify_checksum(&data[..checksum_offset], stored) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    compute_checksum(&data[..checksum_offset]),
                    stored
                ),
            ));
        }

        let mut cursor = Cursor::new(&data[4..checksum_offset]);
        let slot = read_u32(&mut cursor)?;
        let mut version_buf = [0u8; 8];
        cursor.read_exact(&mut version_buf)?;
        let version = u64::from_le_bytes(version_buf);
        let mut deleted_buf = [0u8; 1];
        cursor.read_exact(&mut deleted_buf)?;
        let deleted = match deleted_buf[0] {
            0 => false,
            1 => true,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid deleted flag: {}", other),
                ))
            }
        };

        let field_count = read_u32(&mut cursor)? as usize;
        let mut fields = Vec::with_capacity(field_count.min(u16::MAX as usize));
        for _ in 0..field_count {
            fields.push(read_string(&mut cursor)?);
        }

        if cursor.position() as usize != checksum_offset - 4 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "Trailing bytes in frame body"));
        }

        Ok((
            Self {
                slot,
                version,
                deleted,
                fields,
            },
            frame_length,
        ))
    }
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let len = read_u32(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {}", e)))
}
