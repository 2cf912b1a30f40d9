use crate::backends::Backend;
use crate::error::BackendError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-process ground station double.
///
/// `GET` answers with the value last set for the endpoint. `POST` answers with
/// a queued reply when one exists, otherwise echoes the body back the way a
/// backend that stored it verbatim would. Every request is recorded.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<String, Value>,
    get_failures: HashMap<String, VecDeque<BackendError>>,
    post_replies: HashMap<String, VecDeque<Result<Value, BackendError>>>,
    requests: Vec<Request>,
}

/// A request seen by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Get { endpoint: String },
    Post { endpoint: String, body: Value },
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the document served by `GET endpoint`.
    pub fn set_document(&self, endpoint: &str, value: Value) {
        self.state().documents.insert(endpoint.to_string(), value);
    }

    /// Makes the next `GET endpoint` fail with `error`.
    pub fn fail_next_get(&self, endpoint: &str, error: BackendError) {
        self.state()
            .get_failures
            .entry(endpoint.to_string())
            .or_default()
            .push_back(error);
    }

    /// Queues the reply for the next `POST endpoint`.
    pub fn queue_post_reply(&self, endpoint: &str, reply: Result<Value, BackendError>) {
        self.state()
            .post_replies
            .entry(endpoint.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state().requests.clone()
    }

    /// Bodies posted to `endpoint`, oldest first.
    pub fn posts(&self, endpoint: &str) -> Vec<Value> {
        self.state()
            .requests
            .iter()
            .filter_map(|r| match r {
                Request::Post { endpoint: e, body } if e == endpoint => Some(body.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_json(&self, endpoint: &str) -> Result<Value, BackendError> {
        let mut state = self.state();
        state.requests.push(Request::Get {
            endpoint: endpoint.to_string(),
        });

        if let Some(error) = state
            .get_failures
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        state
            .documents
            .get(endpoint)
            .cloned()
            .ok_or_else(|| BackendError::Status {
                code: 404,
                reason: "Not Found".to_string(),
            })
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, BackendError> {
        let mut state = self.state();
        state.requests.push(Request::Post {
            endpoint: endpoint.to_string(),
            body: body.clone(),
        });

        match state
            .post_replies
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front)
        {
            Some(reply) => reply,
            None => Ok(body.clone()),
        }
    }
}
