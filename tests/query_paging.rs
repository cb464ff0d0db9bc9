//! Query and Paging Tests
//!
//! - Text criteria match by case-insensitive prefix, others exactly
//! - find + verify never returns a record that does not match now
//! - Paging hands out every match once, then empty pages

use std::collections::HashSet;
use std::sync::Arc;

use slotdb::policy::Unrestricted;
use slotdb::query::{Criteria, FieldMatcher, QueryEngine};
use slotdb::record::FieldValue;
use slotdb::schema::{FieldDef, FieldType, Schema};
use slotdb::session::{SessionCoordinator, SessionId, DEFAULT_PAGE_SIZE};
use slotdb::store::{MemoryPersistence, RecordStore, StoreError};

// =============================================================================
// Test Utilities
// =============================================================================

fn names_schema() -> Schema {
    Schema::new("names", vec![FieldDef::new("name", FieldType::Text)])
}

fn rooms_schema() -> Schema {
    Schema::new(
        "rooms",
        vec![
            FieldDef::new("name", FieldType::Text),
            FieldDef::new("size", FieldType::Integer),
        ],
    )
}

fn open(schema: Schema) -> Arc<RecordStore> {
    let store = RecordStore::open(schema, Arc::new(MemoryPersistence::new()), Arc::new(Unrestricted))
        .expect("store opens");
    Arc::new(store)
}

fn room(name: &str, size: i64) -> Vec<FieldValue> {
    vec![FieldValue::Text(name.into()), FieldValue::Integer(size)]
}

fn coordinator_with_session(store: Arc<RecordStore>) -> (SessionCoordinator, SessionId) {
    let coordinator = SessionCoordinator::new(store);
    let session = SessionId::new();
    coordinator.register(session);
    (coordinator, session)
}

// =============================================================================
// Matching
// =============================================================================

#[test]
fn test_prefix_match_is_case_insensitive() {
    let store = open(names_schema());
    let alpha = store.create(vec![FieldValue::Text("Alpha".into())]).unwrap();
    store.create(vec![FieldValue::Text("Beta".into())]).unwrap();

    let criteria = Criteria::new(store.schema(), vec![Some(FieldMatcher::prefix("Al"))]).unwrap();
    assert_eq!(QueryEngine::new(&store).find(&criteria).unwrap(), vec![alpha]);

    let criteria = Criteria::new(store.schema(), vec![Some(FieldMatcher::prefix("aL"))]).unwrap();
    assert_eq!(QueryEngine::new(&store).find(&criteria).unwrap(), vec![alpha]);
}

#[test]
fn test_unconstrained_criteria_match_every_live_record() {
    let store = open(rooms_schema());
    for i in 0..4 {
        store.create(room("r", i)).unwrap();
    }
    let session = SessionId::new();
    store.lock(2, session).unwrap();
    store.delete(2, session, 1).unwrap();
    store.unlock(2, session).unwrap();

    let found = QueryEngine::new(&store).find(&Criteria::any(store.schema())).unwrap();
    assert_eq!(found, vec![0, 1, 3]);
}

#[test]
fn test_all_criteria_must_hold() {
    let store = open(rooms_schema());
    store.create(room("Palace", 2)).unwrap();
    let wanted = store.create(room("Palace", 4)).unwrap();
    store.create(room("Castle", 4)).unwrap();

    let criteria = Criteria::by_name(store.schema(), &[("name", "pal"), ("size", "4")]).unwrap();
    assert_eq!(QueryEngine::new(&store).find(&criteria).unwrap(), vec![wanted]);
}

#[test]
fn test_criteria_arity_mismatch_rejected() {
    let store = open(rooms_schema());
    let other = Criteria::any(&names_schema());
    let err = QueryEngine::new(&store).find(&other).unwrap_err();
    assert!(matches!(err, StoreError::InvalidRecord(_)));
}

#[test]
fn test_verify_rejects_record_changed_after_find() {
    let store = open(rooms_schema());
    let slot = store.create(room("Palace", 2)).unwrap();
    let criteria = Criteria::by_name(store.schema(), &[("name", "pal")]).unwrap();
    let engine = QueryEngine::new(&store);

    let candidates = engine.find(&criteria).unwrap();
    assert_eq!(candidates, vec![slot]);

    let session = SessionId::new();
    store.lock(slot, session).unwrap();
    store.update(slot, session, room("Castle", 2), 1).unwrap();
    store.unlock(slot, session).unwrap();

    assert!(engine.verify(slot, &criteria).is_none());
}

// =============================================================================
// Paging
// =============================================================================

#[test]
fn test_pages_cover_every_match_exactly_once() {
    let store = open(rooms_schema());
    for i in 0..130 {
        let name = if i % 3 == 0 { "Castle" } else { "Palace" };
        store.create(room(name, i)).unwrap();
    }
    let (coordinator, session) = coordinator_with_session(store.clone());

    let criteria = Criteria::by_name(store.schema(), &[("name", "PAL")]).unwrap();
    let count = coordinator.query(session, criteria, false).unwrap();
    assert_eq!(count, 86);

    let mut seen = HashSet::new();
    let mut pages = Vec::new();
    loop {
        let page = coordinator.next_page(session).unwrap();
        if page.is_empty() {
            break;
        }
        assert!(page.len() <= DEFAULT_PAGE_SIZE);
        pages.push(page.len());
        for record in page {
            assert_eq!(record.fields()[0], FieldValue::Text("Palace".into()));
            assert!(seen.insert(record.slot()), "slot {} served twice", record.slot());
        }
    }

    assert_eq!(seen.len(), count);
    assert_eq!(pages, vec![50, 36]);
    assert!(coordinator.next_page(session).unwrap().is_empty());
    assert_eq!(coordinator.result_remaining(session).unwrap(), 0);
}

#[test]
fn test_new_query_replaces_result_set() {
    let store = open(rooms_schema());
    for i in 0..60 {
        store.create(room("Palace", i)).unwrap();
    }
    let (coordinator, session) = coordinator_with_session(store.clone());

    coordinator.query(session, Criteria::any(store.schema()), false).unwrap();
    assert_eq!(coordinator.next_page(session).unwrap().len(), 50);

    let criteria = Criteria::by_name(store.schema(), &[("size", "7")]).unwrap();
    assert_eq!(coordinator.query(session, criteria, false).unwrap(), 1);
    let page = coordinator.next_page(session).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].slot(), 7);
}

#[test]
fn test_page_skips_records_deleted_after_query() {
    let store = open(rooms_schema());
    for i in 0..5 {
        store.create(room("Palace", i)).unwrap();
    }
    let (coordinator, session) = coordinator_with_session(store.clone());
    assert_eq!(coordinator.query(session, Criteria::any(store.schema()), false).unwrap(), 5);

    let other = SessionId::new();
    coordinator.register(other);
    coordinator.remove(other, 1).unwrap();
    coordinator.remove(other, 3).unwrap();

    let page = coordinator.next_page(session).unwrap();
    let slots: Vec<u32> = page.iter().map(|r| r.slot()).collect();
    assert_eq!(slots, vec![0, 2, 4]);
    assert_eq!(store.metrics().snapshot().candidates_dropped, 2);
}

#[test]
fn test_next_page_without_query_is_empty() {
    let store = open(rooms_schema());
    store.create(room("Palace", 1)).unwrap();
    let (coordinator, session) = coordinator_with_session(store);
    assert!(coordinator.next_page(session).unwrap().is_empty());
}

#[test]
fn test_unknown_session_cannot_query() {
    let store = open(rooms_schema());
    let coordinator = SessionCoordinator::new(store.clone());
    let err = coordinator
        .query(SessionId::new(), Criteria::any(store.schema()), false)
        .unwrap_err();
    assert_eq!(err.code(), "SLOT_UNKNOWN_SESSION");
}
