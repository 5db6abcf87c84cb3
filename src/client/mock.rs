//! In-memory transport for unit tests
//!
//! Routes are matched on method and path (query strings ignored) and may be
//! hit any number of times. Every request is recorded so tests can assert on
//! call counts and payloads.

use super::{ApiRequest, ApiResponse, Auth, Method, Transport};
use crate::{Result, ToolsError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

struct Route {
    method: Method,
    path: String,
    status: u16,
    body: String,
}

#[derive(Default)]
pub struct MockTransport {
    routes: Vec<Route>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, method: Method, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            status,
            body: body.into(),
        });
        self
    }

    pub fn on_json(self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.on(method, path, status, body.to_string())
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    /// Body of the most recent request to `method path`
    pub fn last_body(&self, method: Method, path: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|call| call.method == method && call.path == path)
            .and_then(|call| call.body.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &ApiRequest, _auth: &Auth) -> Result<ApiResponse> {
        self.calls.lock().unwrap().push(request.clone());

        let route = self
            .routes
            .iter()
            .find(|route| route.method == request.method && route.path == request.path)
            .ok_or_else(|| {
                ToolsError::Network(format!("no mock route for {} {}", request.method, request.path))
            })?;

        Ok(ApiResponse {
            status: route.status,
            body: route.body.clone(),
        })
    }
}
