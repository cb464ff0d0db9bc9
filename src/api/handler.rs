//! Per-session request handler
//!
//! One handler per connected client. Creating it registers a session;
//! dropping it unregisters the session and releases any lock it holds.
//! `handle` may block (on `lock`/`modify`/`remove`) and must run on a
//! thread that is allowed to.

use std::sync::Arc;

use serde_json::{json, Value};

use super::errors::{ApiError, ApiResult};
use super::request::Request;
use super::response::{RecordView, Response};
use crate::query::Criteria;
use crate::record::FieldValue;
use crate::session::{SessionCoordinator, SessionId};

pub struct SessionHandler {
    coordinator: Arc<SessionCoordinator>,
    session: SessionId,
}

impl SessionHandler {
    pub fn new(coordinator: Arc<SessionCoordinator>) -> Self {
        let session = SessionId::new();
        coordinator.register(session);
        Self { coordinator, session }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Handle one raw JSON request line
    pub fn handle(&self, json_request: &str) -> Response {
        let result = Request::parse(json_request).and_then(|request| self.dispatch(request));
        match result {
            Ok(data) => Response::success(data),
            Err(e) => Response::error(&e),
        }
    }

    /// Execute a parsed request
    pub fn dispatch(&self, request: Request) -> ApiResult<Value> {
        let coordinator = &self.coordinator;
        let store = coordinator.store();
        let session = self.session;

        let data = match request {
            Request::Schema => serde_json::to_value(store.schema())
                .map_err(|e| ApiError::invalid_request(format!("Failed to encode schema: {}", e)))?,
            Request::Policy => serde_json::to_value(store.policy_config())
                .map_err(|e| ApiError::invalid_request(format!("Failed to encode policy: {}", e)))?,
            Request::Create { fields } => {
                let slot = coordinator.create(session, self.parse_fields(&fields)?)?;
                json!({ "slot": slot })
            }
            Request::Read { slot } => json!(RecordView::from(coordinator.read(session, slot)?.as_ref())),
            Request::Lock { slot } => {
                coordinator.lock(session, slot)?;
                json!({ "slot": slot })
            }
            Request::Unlock { slot } => {
                coordinator.unlock(session, slot)?;
                json!({ "slot": slot })
            }
            Request::Update { slot, fields } => {
                let version = coordinator.update(session, slot, self.parse_fields(&fields)?)?;
                json!({ "slot": slot, "version": version })
            }
            Request::Delete { slot } => {
                let version = coordinator.delete(session, slot)?;
                json!({ "slot": slot, "version": version })
            }
            Request::Modify { slot, fields } => {
                let version = coordinator.modify(session, slot, self.parse_fields(&fields)?)?;
                json!({ "slot": slot, "version": version })
            }
            Request::Remove { slot } => {
                let version = coordinator.remove(session, slot)?;
                json!({ "slot": slot, "version": version })
            }
            Request::Query {
                criteria,
                only_modifiable,
            } => {
                let pairs: Vec<(&str, &str)> = criteria.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                let criteria = Criteria::by_name(store.schema(), &pairs)?;
                let count = coordinator.query(session, criteria, only_modifiable)?;
                json!({ "count": count })
            }
            Request::NextPage => {
                let records: Vec<RecordView> = coordinator
                    .next_page(session)?
                    .iter()
                    .map(|record| RecordView::from(record.as_ref()))
                    .collect();
                let remaining = coordinator.result_remaining(session)?;
                json!({ "records": records, "remaining": remaining })
            }
            Request::Stats => {
                let info = coordinator.session_info(session)?;
                json!({
                    "session": info,
                    "sessions": coordinator.session_count(),
                    "slots": store.slot_count(),
                    "live_records": store.live_count(),
                    "metrics": store.metrics().snapshot(),
                })
            }
        };
        Ok(data)
    }

    fn parse_fields(&self, raw: &[String]) -> ApiResult<Vec<FieldValue>> {
        let schema = self.coordinator.store().schema();
        Ok(FieldValue::parse_row(&schema.fields, raw)?)
    }
}

impl Drop for SessionHandler {
    fn drop(&mut self) {
        self.coordinator.unregister(self.session);
    }
}
