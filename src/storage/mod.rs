//! Slot file storage
//!
//! The durable form of the record store: an append-only file of
//! checksummed frames, one per persisted record generation.
//!
//! # Design Principles
//!
//! - Append-only, fsync after every frame
//! - Checksum verified on every read
//! - Tombstones are written and loaded like any other generation
//! - Latest frame for a slot wins
//! - Any damaged or truncated frame fails the load

mod checksum;
mod errors;
mod file_persistence;
mod reader;
mod record;
mod writer;

pub use checksum::compute_checksum;
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use file_persistence::FilePersistence;
pub use reader::SlotFileReader;
pub use record::{FileHeader, SlotFileRecord, FORMAT_VERSION, HEADER_SIZE};
pub use writer::{slot_file_path, SlotFileWriter};
