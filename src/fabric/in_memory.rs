//! In-process implementations of the version context, transport and notifier.
//!
//! Every remote-facing call lands in a shared [`CallJournal`] in the order it
//! was made, and each capability can be told to fail, which makes session
//! bracketing and payloads observable without a server.

use crate::connection::FabricTransport;
use crate::core::{FabricError, ObjectIdReservation, RequestParams, Result, SessionId};
use crate::notify::{Notice, Notifier};
use crate::version::{SessionMode, VersionContext};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    StartSession { mode: SessionMode },
    StopSession { mode: SessionMode },
    ReserveObjectIds { target_url: String, count: u32 },
    GenerateUniqueId,
    Post { url: String, params: RequestParams },
}

impl RecordedCall {
    /// Short label used to compare call sequences.
    pub fn label(&self) -> String {
        match self {
            Self::StartSession { .. } => "start".to_string(),
            Self::StopSession { .. } => "stop".to_string(),
            Self::ReserveObjectIds { .. } => "reserve".to_string(),
            Self::GenerateUniqueId => "uuid".to_string(),
            Self::Post { url, .. } => {
                let endpoint = url.rsplit('/').next().unwrap_or(url);
                format!("post:{}", endpoint)
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered log of calls shared between in-memory capabilities.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: RecordedCall) {
        lock(&self.calls).push(call);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn labels(&self) -> Vec<String> {
        lock(&self.calls).iter().map(RecordedCall::label).collect()
    }

    /// Posted requests whose URL ends with `suffix`.
    pub fn posts_to(&self, suffix: &str) -> Vec<RequestParams> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Post { url, params } if url.ends_with(suffix) => {
                    Some(params.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, label: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.label() == label)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.calls).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}

#[derive(Default)]
struct ContextState {
    open_session: Option<SessionId>,
    sessions_started: u64,
    sessions_stopped: u64,
    next_object_id: i64,
    unique_ids: VecDeque<String>,
    fail_start: Option<FabricError>,
    fail_stop: Option<FabricError>,
    fail_reserve: Option<FabricError>,
}

/// Version context that hands out numbered sessions and sequential object ids.
///
/// At most one session is open at a time; a second start fails. A failed stop
/// leaves the session open, as a leaked lock would on a real version.
pub struct InMemoryVersionContext {
    version_name: String,
    journal: CallJournal,
    state: Mutex<ContextState>,
}

impl InMemoryVersionContext {
    pub fn new(version_name: impl Into<String>, journal: CallJournal) -> Self {
        Self {
            version_name: version_name.into(),
            journal,
            state: Mutex::new(ContextState {
                next_object_id: 1,
                ..ContextState::default()
            }),
        }
    }

    /// First object id handed out by `reserve_object_ids`.
    pub fn with_first_object_id(self, first_object_id: i64) -> Self {
        lock(&self.state).next_object_id = first_object_id;
        self
    }

    /// Unique ids returned by `generate_unique_id`, in order, before falling
    /// back to random v4 UUIDs.
    pub fn with_unique_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.state)
            .unique_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn fail_start_with(&self, err: FabricError) {
        lock(&self.state).fail_start = Some(err);
    }

    pub fn fail_stop_with(&self, err: FabricError) {
        lock(&self.state).fail_stop = Some(err);
    }

    pub fn fail_reserve_with(&self, err: FabricError) {
        lock(&self.state).fail_reserve = Some(err);
    }

    pub fn clear_faults(&self) {
        let mut state = lock(&self.state);
        state.fail_start = None;
        state.fail_stop = None;
        state.fail_reserve = None;
    }

    pub fn is_session_open(&self) -> bool {
        lock(&self.state).open_session.is_some()
    }

    pub fn sessions_started(&self) -> u64 {
        lock(&self.state).sessions_started
    }

    pub fn sessions_stopped(&self) -> u64 {
        lock(&self.state).sessions_stopped
    }
}

#[async_trait]
impl VersionContext for InMemoryVersionContext {
    fn version_name(&self) -> String {
        self.version_name.clone()
    }

    fn current_session_id(&self) -> Option<SessionId> {
        lock(&self.state).open_session.clone()
    }

    async fn start_session(&self, mode: SessionMode) -> Result<SessionId> {
        self.journal.record(RecordedCall::StartSession { mode });
        let mut state = lock(&self.state);
        if let Some(err) = state.fail_start.clone() {
            return Err(err);
        }
        if let Some(open) = &state.open_session {
            return Err(FabricError::SessionStart(format!(
                "session {} is already open on '{}'",
                open, self.version_name
            )));
        }
        state.sessions_started += 1;
        let session_id = SessionId::new(format!("session-{}", state.sessions_started));
        state.open_session = Some(session_id.clone());
        Ok(session_id)
    }

    async fn stop_session(&self, mode: SessionMode) -> Result<()> {
        self.journal.record(RecordedCall::StopSession { mode });
        let mut state = lock(&self.state);
        if let Some(err) = state.fail_stop.clone() {
            return Err(err);
        }
        if state.open_session.take().is_none() {
            return Err(FabricError::SessionStop(format!(
                "no open session on '{}'",
                self.version_name
            )));
        }
        state.sessions_stopped += 1;
        Ok(())
    }

    async fn reserve_object_ids(
        &self,
        target_url: &str,
        count: u32,
    ) -> Result<ObjectIdReservation> {
        self.journal.record(RecordedCall::ReserveObjectIds {
            target_url: target_url.to_string(),
            count,
        });
        let mut state = lock(&self.state);
        if let Some(err) = state.fail_reserve.clone() {
            return Err(err);
        }
        let first_object_id = state.next_object_id;
        state.next_object_id += i64::from(count);
        Ok(ObjectIdReservation {
            first_object_id,
            count,
        })
    }

    fn generate_unique_id(&self) -> String {
        self.journal.record(RecordedCall::GenerateUniqueId);
        lock(&self.state)
            .unique_ids
            .pop_front()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

struct Route {
    suffix: String,
    responses: VecDeque<Result<Value>>,
}

/// Transport answering from scripted responses keyed by URL suffix.
///
/// Responses queued on a route are consumed in order; the last one is repeated.
/// A request that matches no route fails with a transport error.
pub struct InMemoryTransport {
    journal: CallJournal,
    routes: Mutex<Vec<Route>>,
}

impl InMemoryTransport {
    pub fn new(journal: CallJournal) -> Self {
        Self {
            journal,
            routes: Mutex::new(Vec::new()),
        }
    }

    /// Queues a JSON body for requests whose URL ends with `suffix`.
    pub fn respond(&self, suffix: &str, body: Value) {
        self.enqueue(suffix, Ok(body));
    }

    /// Queues a failure for requests whose URL ends with `suffix`.
    pub fn fail(&self, suffix: &str, err: FabricError) {
        self.enqueue(suffix, Err(err));
    }

    fn enqueue(&self, suffix: &str, response: Result<Value>) {
        let mut routes = lock(&self.routes);
        match routes.iter_mut().find(|route| route.suffix == suffix) {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                suffix: suffix.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
    }
}

#[async_trait]
impl FabricTransport for InMemoryTransport {
    async fn post(&self, url: &str, params: &RequestParams) -> Result<Value> {
        self.journal.record(RecordedCall::Post {
            url: url.to_string(),
            params: params.clone(),
        });

        let mut routes = lock(&self.routes);
        let route = routes
            .iter_mut()
            .find(|route| url.ends_with(&route.suffix))
            .ok_or_else(|| FabricError::Transport(format!("no route for {}", url)))?;

        let response = if route.responses.len() > 1 {
            route.responses.pop_front()
        } else {
            route.responses.front().cloned()
        };
        response.unwrap_or_else(|| Err(FabricError::Transport(format!("no response for {}", url))))
    }
}

/// Notifier that keeps every notice for inspection.
#[derive(Default)]
pub struct InMemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }
}

impl Notifier for InMemoryNotifier {
    fn notify(&self, notice: &Notice) {
        lock(&self.notices).push(notice.clone());
    }
}

/// Record query body listing `(name, global id)` pairs.
pub fn record_query_response(records: &[(&str, &str)]) -> Value {
    let features: Vec<Value> = records
        .iter()
        .enumerate()
        .map(|(index, (name, global_id))| {
            json!({"attributes": {"OBJECTID": index + 1, "Name": name, "GlobalID": global_id}})
        })
        .collect();
    json!({
        "objectIdFieldName": "OBJECTID",
        "globalIdFieldName": "GlobalID",
        "features": features
    })
}

/// `applyEdits` body for an accepted single add.
pub fn add_success_response(layer_id: u32, object_id: i64, global_id: &str) -> Value {
    json!([{
        "id": layer_id,
        "addResults": [{"objectId": object_id, "globalId": global_id, "success": true}]
    }])
}

/// `applyEdits` body for a refused single add.
pub fn add_failure_response(layer_id: u32, description: &str) -> Value {
    json!([{
        "id": layer_id,
        "addResults": [{"success": false, "error": {"code": 1000, "description": description}}]
    }])
}

/// Parcel fabric body reporting success with `service_edits`.
pub fn operation_success_response(service_edits: Value) -> Value {
    json!({"success": true, "serviceEdits": service_edits})
}

/// Parcel fabric body reporting `success: false`.
pub fn operation_rejected_response() -> Value {
    json!({"success": false})
}
