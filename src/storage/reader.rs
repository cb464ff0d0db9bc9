//! Sequential slot file reader
//!
//! Validates the header on open and the checksum of every frame. A short
//! read, bad length or checksum mismatch anywhere is corruption; the reader
//! never skips over a damaged frame.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use super::record::{FileHeader, SlotFileRecord, HEADER_SIZE, MIN_FRAME_SIZE};

pub struct SlotFileReader {
    path: PathBuf,
    reader: BufReader<File>,
    header: FileHeader,
    current_offset: u64,
    file_size: u64,
}

impl SlotFileReader {
    /// Opens the slot file and validates its header
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = File::open(path)
            .map_err(|e| StorageError::read_failed(format!("Failed to open slot file: {}", path.display()), e))?;

        let file_size = file
            .metadata()
            .map_err(|e| StorageError::read_failed("Failed to read slot file metadata", e))?
            .len();

        let mut reader = BufReader::new(file);
        let mut buf = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut buf)
            .map_err(|e| StorageError::corruption_at_offset(0, format!("Failed to read header: {}", e)))?;
        let header = FileHeader::deserialize(&buf).map_err(|e| StorageError::corruption_at_offset(0, e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            header,
            current_offset: HEADER_SIZE as u64,
            file_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> FileHeader {
        self.header
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next frame.
    ///
    /// `Ok(None)` at end of file, `Err(STORAGE_DATA_CORRUPTION)` on any
    /// damaged or truncated frame.
    pub fn read_next(&mut self) -> StorageResult<Option<SlotFileRecord>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_FRAME_SIZE as u64 {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Truncated slot file: {} bytes remaining, minimum frame size is {}",
                    remaining, MIN_FRAME_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            StorageError::corruption_at_offset(self.current_offset, format!("Failed to read frame length: {}", e))
        })?;
        let frame_length = u32::from_le_bytes(len_buf) as u64;

        if frame_length < MIN_FRAME_SIZE as u64 {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!("Invalid frame length: {}", frame_length),
            ));
        }
        if frame_length > remaining {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!("Frame length {} exceeds remaining file size {}", frame_length, remaining),
            ));
        }

        let mut frame = vec![0u8; frame_length as usize];
        frame[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut frame[4..]).map_err(|e| {
            StorageError::corruption_at_offset(self.current_offset, format!("Failed to read frame body: {}", e))
        })?;

        let (record, consumed) = SlotFileRecord::deserialize(&frame)
            .map_err(|e| StorageError::corruption_at_offset(self.current_offset, e.to_string()))?;

        if record.fields.len() != self.header.field_count as usize {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Frame for slot {} has {} fields, header declares {}",
                    record.slot,
                    record.fields.len(),
                    self.header.field_count
                ),
            ));
        }

        self.current_offset += consumed as u64;
        Ok(Some(record))
    }

    /// Reads every frame in file order
    pub fn read_all(&mut self) -> StorageResult<Vec<SlotFileRecord>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.read_next()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}
