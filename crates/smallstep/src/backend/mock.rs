//! In-memory backend for tests.

use crate::backend::{ApiRequest, ApiResponse, Backend, Method};
use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

type RouteKey = (Method, String);

/// Mock backend for testing without network access.
///
/// Responses are queued per method and path. The last queued response for
/// a route is sticky so repeated reads keep seeing it.
///
/// ```
/// use smallstep::backend::{ApiRequest, Backend, Method, MockBackend};
///
/// let mock = MockBackend::new();
/// mock.respond(Method::Get, "/authorities/a1", 200, r#"{"id":"a1"}"#);
///
/// let resp = mock.send(ApiRequest::new(Method::Get, ["authorities", "a1"])).unwrap();
/// assert_eq!(resp.status, 200);
/// assert_eq!(mock.requests().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    routes: Arc<Mutex<HashMap<RouteKey, VecDeque<ApiResponse>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with a JSON body.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: &str) {
        self.respond_with(method, path, ApiResponse::new(status, body));
    }

    /// Queue an arbitrary response.
    pub fn respond_with(&self, method: Method, path: &str, response: ApiResponse) {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Drop every queued response for a route, then queue `status` and
    /// `body` in their place.
    pub fn replace(&self, method: Method, path: &str, status: u16, body: &str) {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = routes.entry((method, path.to_string())).or_default();
        queue.clear();
        queue.push_back(ApiResponse::new(status, body));
    }

    /// Every request sent so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests sent to one route, oldest first.
    #[must_use]
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path() == path)
            .collect()
    }
}

impl Backend for MockBackend {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let key = (request.method, request.path());
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let missing = || Error::http(format!("mock: no response for {} {}", key.0, key.1), None);
        let queue = routes.get_mut(&key).ok_or_else(missing)?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.ok_or_else(missing)
    }
}
