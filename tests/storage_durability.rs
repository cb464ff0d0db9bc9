//! Storage Durability Tests
//!
//! - Every committed create/update/delete survives a reopen
//! - The latest frame per slot wins on load
//! - Tombstones reload as deleted slots that stay reusable
//! - Corruption and truncation are never ignored

use std::fs;
use std::path::Path;
use std::sync::Arc;

use slotdb::policy::Unrestricted;
use slotdb::record::FieldValue;
use slotdb::schema::{FieldDef, FieldType, Schema};
use slotdb::session::SessionId;
use slotdb::storage::{slot_file_path, FilePersistence, HEADER_SIZE};
use slotdb::store::{RecordStore, StoreError};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn schema() -> Schema {
    Schema::new(
        "rooms",
        vec![
            FieldDef::new("name", FieldType::Text),
            FieldDef::new("rate", FieldType::Currency),
            FieldDef::new("date", FieldType::Date),
        ],
    )
}

fn row(name: &str, rate: i64) -> Vec<FieldValue> {
    vec![
        FieldValue::Text(name.into()),
        FieldValue::Currency(rate),
        FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2026, 11, 1).unwrap()),
    ]
}

fn open_store(data_dir: &Path) -> Result<RecordStore, StoreError> {
    let persistence = FilePersistence::open(data_dir, &schema())?;
    RecordStore::open(schema(), Arc::new(persistence), Arc::new(Unrestricted))
}

fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

// =============================================================================
// Reopen
// =============================================================================

#[test]
fn test_committed_changes_survive_reopen() {
    let temp_dir = create_temp_data_dir();
    let session = SessionId::new();

    {
        let store = open_store(temp_dir.path()).unwrap();
        store.create(row("Palace", 15000)).unwrap();
        store.create(row("Castle", 9900)).unwrap();
        store.create(row("Manor", 12000)).unwrap();

        store.lock(0, session).unwrap();
        store.update(0, session, row("Palace", 17500), 1).unwrap();
        store.update(0, session, row("Palace", 18000), 2).unwrap();
        store.unlock(0, session).unwrap();

        store.lock(1, session).unwrap();
        store.delete(1, session, 1).unwrap();
        store.unlock(1, session).unwrap();
    }

    let store = open_store(temp_dir.path()).unwrap();
    assert_eq!(store.slot_count(), 3);
    assert_eq!(store.live_count(), 2);

    let palace = store.read(0).unwrap();
    assert_eq!(palace.version(), 3);
    assert_eq!(palace.fields()[1], FieldValue::Currency(18000));

    assert!(matches!(store.read(1), Err(StoreError::NotFound(1))));
    assert_eq!(store.read(2).unwrap().fields()[0], FieldValue::Text("Manor".into()));
}

#[test]
fn test_reloaded_tombstone_is_reused() {
    let temp_dir = create_temp_data_dir();
    let session = SessionId::new();

    {
        let store = open_store(temp_dir.path()).unwrap();
        store.create(row("Palace", 100)).unwrap();
        store.create(row("Castle", 100)).unwrap();
        store.lock(0, session).unwrap();
        store.delete(0, session, 1).unwrap();
        store.unlock(0, session).unwrap();
    }

    {
        let store = open_store(temp_dir.path()).unwrap();
        assert_eq!(store.create(row("Lodge", 100)).unwrap(), 0);
        assert_eq!(store.read(0).unwrap().version(), 3);
    }

    let store = open_store(temp_dir.path()).unwrap();
    let lodge = store.read(0).unwrap();
    assert_eq!(lodge.fields()[0], FieldValue::Text("Lodge".into()));
    assert_eq!(lodge.version(), 3);
}

#[test]
fn test_fresh_directory_opens_empty() {
    let temp_dir = create_temp_data_dir();
    let store = open_store(temp_dir.path()).unwrap();
    assert_eq!(store.slot_count(), 0);
    assert!(slot_file_path(temp_dir.path()).exists());
}

#[test]
fn test_text_whitespace_survives_reopen() {
    let temp_dir = create_temp_data_dir();
    let padded = vec![
        FieldValue::Text("  Alpha ".into()),
        FieldValue::Currency(100),
        FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2026, 11, 1).unwrap()),
    ];

    {
        let store = open_store(temp_dir.path()).unwrap();
        store.create(padded.clone()).unwrap();
    }

    let store = open_store(temp_dir.path()).unwrap();
    let record = store.read(0).unwrap();
    assert_eq!(record.fields(), padded.as_slice());
    assert_eq!(record.version(), 1);
}

// =============================================================================
// Corruption
// =============================================================================

#[test]
fn test_flipped_byte_fails_open() {
    let temp_dir = create_temp_data_dir();
    {
        let store = open_store(temp_dir.path()).unwrap();
        store.create(row("Palace", 15000)).unwrap();
        store.create(row("Castle", 9900)).unwrap();
    }

    let path = slot_file_path(temp_dir.path());
    let mut contents = fs::read(&path).unwrap();
    let target = HEADER_SIZE + 20;
    contents[target] ^= 0xFF;
    fs::write(&path, contents).unwrap();

    match open_store(temp_dir.path()) {
        Err(StoreError::PersistenceFailure(e)) => {
            assert!(e.is_fatal(), "corruption must be fatal: {}", e);
            assert_eq!(e.code().code(), "STORAGE_DATA_CORRUPTION");
        }
        Err(other) => panic!("Expected persistence failure, got {:?}", other),
        Ok(_) => panic!("Corrupt slot file must not open"),
    }
}

#[test]
fn test_truncated_tail_fails_open() {
    let temp_dir = create_temp_data_dir();
    {
        let store = open_store(temp_dir.path()).unwrap();
        store.create(row("Palace", 15000)).unwrap();
    }

    let path = slot_file_path(temp_dir.path());
    let contents = fs::read(&path).unwrap();
    fs::write(&path, &contents[..contents.len() - 3]).unwrap();

    let err = open_store(temp_dir.path()).err().expect("truncated file must not open");
    assert!(matches!(err, StoreError::PersistenceFailure(ref e) if e.is_fatal()));
}

#[test]
fn test_schema_with_other_field_count_is_rejected() {
    let temp_dir = create_temp_data_dir();
    {
        let store = open_store(temp_dir.path()).unwrap();
        store.create(row("Palace", 15000)).unwrap();
    }

    let narrower = Schema::new("rooms", vec![FieldDef::new("name", FieldType::Text)]);
    let err = FilePersistence::open(temp_dir.path(), &narrower).err().expect("header must not match");
    assert_eq!(err.code().code(), "STORAGE_SCHEMA_MISMATCH");
    assert!(err.is_fatal());
}
