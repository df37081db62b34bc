use std::sync::Mutex;

use serde_json::{Value, json};

use crate::backend::{Backend, BackendError, BackendRequest};

/// In-memory `Backend` that records every request and replays one response.
#[derive(Default)]
pub(crate) struct FakeBackend {
    response: Option<Value>,
    failure: Option<(u16, String)>,
    requests: Mutex<Vec<BackendRequest>>,
}

impl FakeBackend {
    pub fn returning(response: Value) -> Self {
        Self {
            response: Some(response),
            ..Self::default()
        }
    }

    pub fn failing(status: u16, reason: &str) -> Self {
        Self {
            failure: Some((status, reason.to_string())),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn only_request(&self) -> BackendRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one backend request");
        requests.into_iter().next().unwrap()
    }
}

/// Value of the first query pair named `key`.
pub(crate) fn query_value<'a>(request: &'a BackendRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

impl Backend for FakeBackend {
    fn send(&self, request: &BackendRequest) -> Result<Value, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some((status, reason)) = &self.failure {
            return Err(BackendError::Status {
                status: *status,
                reason: reason.clone(),
                body: String::new(),
            });
        }
        Ok(self.response.clone().unwrap_or_else(|| json!({})))
    }
}
