//! Append-only slot file writer
//!
//! Every frame is fsynced before `append` returns. Nothing is ever
//! rewritten in place; a later frame for the same slot supersedes earlier
//! ones.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use super::record::{FileHeader, SlotFileRecord, HEADER_SIZE};
use crate::observability::{log_event_at, Event, Severity};
use crate::record::SlotId;

/// `<data_dir>/data/slots.dat`
pub fn slot_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join("data").join("slots.dat")
}

/// Writer holding the slot file open for append
pub struct SlotFileWriter {
    path: PathBuf,
    file: File,
    current_offset: u64,
}

impl SlotFileWriter {
    /// Opens or creates the slot file under `data_dir`.
    ///
    /// A new file gets a header for `field_count` fields. An existing file
    /// must carry a header for the same field count.
    pub fn open(data_dir: &Path, field_count: usize) -> StorageResult<Self> {
        let path = slot_file_path(data_dir);
        let data_subdir = data_dir.join("data");

        if !data_subdir.exists() {
            fs::create_dir_all(&data_subdir).map_err(|e| {
                StorageError::write_failed(
                    format!("Failed to create data directory: {}", data_subdir.display()),
                    e,
                )
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::write_failed(format!("Failed to open slot file: {}", path.display()), e))?;

        let len = file
            .metadata()
            .map_err(|e| StorageError::io_error("Failed to read slot file metadata", e))?
            .len();

        let width = u16::try_from(field_count).map_err(|_| StorageError::schema_mismatch(u16::MAX as usize, field_count))?;

        if len == 0 {
            file.write_all(&FileHeader::new(width).serialize())
                .map_err(|e| StorageError::write_failed("Failed to write slot file header", e))?;
            file.sync_all()
                .map_err(|e| StorageError::write_failed("fsync failed after writing slot file header", e))?;
        } else {
            let mut buf = [0u8; HEADER_SIZE];
            file.read_exact(&mut buf)
                .map_err(|e| StorageError::corruption_at_offset(0, format!("Failed to read header: {}", e)))?;
            let header =
                FileHeader::deserialize(&buf).map_err(|e| StorageError::corruption_at_offset(0, e.to_string()))?;
            if header.field_count != width {
                return Err(StorageError::schema_mismatch(field_count, header.field_count as usize));
            }
        }

        let current_offset = len.max(HEADER_SIZE as u64);

        Ok(Self {
            path,
            file,
            current_offset,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset the next frame will be written at
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Appends one frame and fsyncs. Returns the frame's offset.
    ///
    /// On failure the file is cut back to the previous frame boundary.
    pub fn append(&mut self, record: &SlotFileRecord) -> StorageResult<u64> {
        let frame = record.serialize();
        let offset = self.current_offset;

        if let Err(err) = self.write_frame(&frame, record.slot) {
            if let Err(truncate_err) = self.discard_partial() {
                let path = self.path.display().to_string();
                let reason = truncate_err.to_string();
                log_event_at(
                    Severity::Error,
                    Event::PersistFailed,
                    &[("path", path.as_str()), ("error", reason.as_str())],
                );
            }
            return Err(err);
        }

        self.current_offset += frame.len() as u64;
        Ok(offset)
    }

    fn write_frame(&mut self, frame: &[u8], slot: SlotId) -> StorageResult<()> {
        self.file
            .write_all(frame)
            .map_err(|e| StorageError::write_failed(format!("Failed to write slot {}", slot), e))?;

        self.file
            .sync_all()
            .map_err(|e| StorageError::write_failed(format!("fsync failed after writing slot {}", slot), e))
    }

    /// Drop any bytes past the last complete frame
    fn discard_partial(&mut self) -> StorageResult<()> {
        self.file
            .set_len(self.current_offset)
            .map_err(|e| StorageError::write_failed("Failed to truncate partial frame", e))?;
        self.file
            .sync_all()
            .map_err(|e| StorageError::write_failed("fsync failed after truncating partial frame", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SlotFileReader;
    use tempfile::TempDir;

    fn frame(slot: u32, version: u64, owner: &str) -> SlotFileRecord {
        SlotFileRecord {
            slot,
            version,
            deleted: false,
            fields: vec!["Palace".into(), owner.into()],
        }
    }

    #[test]
    fn test_writer_creates_directories_and_header() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!temp_dir.path().join("data").exists());

        let writer = SlotFileWriter::open(temp_dir.path(), 2).unwrap();
        assert!(writer.path().exists());
        assert_eq!(writer.current_offset(), HEADER_SIZE as u64);
        assert_eq!(fs::metadata(writer.path()).unwrap().len(), HEADER_SIZE as u64);
    }

    #[test]
    fn test_offsets_advance() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = SlotFileWriter::open(temp_dir.path(), 2).unwrap();

        let first = writer.append(&frame(0, 1, "")).unwrap();
        let second = writer.append(&frame(0, 2, "1234")).unwrap();
        assert_eq!(first, HEADER_SIZE as u64);
        assert!(second > first);
        assert_eq!(writer.current_offset(), fs::metadata(writer.path()).unwrap().len());
    }

    #[test]
    fn test_partial_frame_is_cut_back() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = SlotFileWriter::open(temp_dir.path(), 2).unwrap();
        writer.append(&frame(0, 1, "")).unwrap();
        let committed = writer.current_offset();

        // a write that died halfway through the frame
        let torn = frame(1, 1, "1234").serialize();
        writer.file.write_all(&torn[..7]).unwrap();
        writer.discard_partial().unwrap();
        assert_eq!(fs::metadata(writer.path()).unwrap().len(), committed);

        writer.append(&frame(1, 1, "1234")).unwrap();
        drop(writer);

        let mut reader = SlotFileReader::open(&slot_file_path(temp_dir.path())).unwrap();
        let frames = reader.read_all().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].fields[1], "1234");
    }

    #[test]
    fn test_reopen_appends_after_existing_frames() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut writer = SlotFileWriter::open(temp_dir.path(), 2).unwrap();
            writer.append(&frame(0, 1, "")).unwrap();
        }
        {
            let mut writer = SlotFileWriter::open(temp_dir.path(), 2).unwrap();
            assert!(writer.current_offset() > HEADER_SIZE as u64);
            writer.append(&frame(1, 1, "")).unwrap();
        }

        let mut reader = SlotFileReader::open(&slot_file_path(temp_dir.path())).unwrap();
        let frames = reader.read_all().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].slot, 1);
    }

    #[test]
    fn test_reopen_with_other_width_is_schema_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        SlotFileWriter::open(temp_dir.path(), 2).unwrap();

        let err = SlotFileWriter::open(temp_dir.path(), 7).err().unwrap();
        assert_eq!(err.code().code(), "STORAGE_SCHEMA_MISMATCH");
        assert!(err.is_fatal());
    }
}
