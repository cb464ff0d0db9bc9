//! Slot file backed persistence

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::errors::{StorageError, StorageResult};
use super::reader::SlotFileReader;
use super::record::SlotFileRecord;
use super::writer::SlotFileWriter;
use crate::observability::{log_event_with_fields, Event};
use crate::record::{Record, SlotId};
use crate::schema::Schema;
use crate::store::Persistence;

pub struct FilePersistence {
    schema: Schema,
    path: PathBuf,
    writer: Mutex<SlotFileWriter>,
}

impl FilePersistence {
    /// Opens (creating if needed) `<data_dir>/data/slots.dat` for `schema`
    pub fn open(data_dir: &Path, schema: &Schema) -> StorageResult<Self> {
        let writer = SlotFileWriter::open(data_dir, schema.field_count())?;
        Ok(Self {
            schema: schema.clone(),
            path: writer.path().to_path_buf(),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest frame per slot, in slot order
    fn latest_frames(&self) -> StorageResult<BTreeMap<SlotId, SlotFileRecord>> {
        let mut reader = SlotFileReader::open(&self.path)?;
        if reader.header().field_count as usize != self.schema.field_count() {
            return Err(StorageError::schema_mismatch(
                self.schema.field_count(),
                reader.header().field_count as usize,
            ));
        }

        let mut latest = BTreeMap::new();
        while let Some(frame) = reader.read_next()? {
            latest.insert(frame.slot, frame);
        }
        Ok(latest)
    }
}

impl Persistence for FilePersistence {
    fn load_all(&self) -> StorageResult<Vec<Record>> {
        let frames = self.latest_frames().map_err(|e| {
            if e.is_fatal() {
                let message = e.to_string();
                let path = self.path.display().to_string();
                log_event_with_fields(
                    Event::StorageCorruption,
                    &[("path", path.as_str()), ("error", message.as_str())],
                );
            }
            e
        })?;

        frames
            .into_values()
            .map(|frame| {
                let slot = frame.slot;
                frame
                    .into_record(&self.schema)
                    .map_err(|e| StorageError::corruption_for_slot(slot, e.to_string()))
            })
            .collect()
    }

    fn persist(&self, record: &Record) -> StorageResult<()> {
        let frame = SlotFileRecord::from_record(record);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.append(&frame)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use crate::schema::{FieldDef, FieldType};
    use tempfile::TempDir;

    fn schema() -> Schema {
        Schema::new(
            "rooms",
            vec![
                FieldDef::new("name", FieldType::Text),
                FieldDef::new("rate", FieldType::Currency),
            ],
        )
    }

    fn record(slot: SlotId, name: &str, cents: i64, version: u64) -> Record {
        Record::new(slot, vec![FieldValue::Text(name.into()), FieldValue::Currency(cents)], version)
    }

    #[test]
    fn test_latest_generation_wins_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = FilePersistence::open(temp_dir.path(), &schema()).unwrap();
        persistence.persist(&record(0, "Palace", 15000, 1)).unwrap();
        persistence.persist(&record(1, "Castle", 9900, 1)).unwrap();
        persistence.persist(&record(0, "Palace", 17500, 2)).unwrap();
        persistence.persist(&record(1, "Castle", 9900, 1).tombstoned()).unwrap();
        drop(persistence);

        let reopened = FilePersistence::open(temp_dir.path(), &schema()).unwrap();
        let loaded = reopened.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], record(0, "Palace", 17500, 2));
        assert!(loaded[1].is_deleted());
        assert_eq!(loaded[1].version(), 2);
    }

    #[test]
    fn test_empty_file_loads_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = FilePersistence::open(temp_dir.path(), &schema()).unwrap();
        assert!(persistence.load_all().unwrap().is_empty());
        assert!(persistence.path().ends_with("data/slots.dat"));
    }

    #[test]
    fn test_unparsable_field_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut writer = SlotFileWriter::open(temp_dir.path(), 2).unwrap();
            writer
                .append(&SlotFileRecord {
                    slot: 0,
                    version: 1,
                    deleted: false,
                    fields: vec!["Palace".into(), "lots".into()],
                })
                .unwrap();
        }

        let persistence = FilePersistence::open(temp_dir.path(), &schema()).unwrap();
        let err = persistence.load_all().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.details(), Some("slot: 0"));
    }
}
