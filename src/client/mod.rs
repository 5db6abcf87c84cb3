//! Service client
//!
//! A [`ServiceClient`] owns the base URL and authentication of one platform and
//! executes single HTTP calls through a [`Transport`]. Every call declares the
//! statuses that count as success; anything else comes back as
//! [`ToolsError::Remote`] carrying the raw response body. Calls are never
//! retried, and a timeout surfaces as a network failure.

#[cfg(test)]
pub mod mock;

use crate::config::Service;
use crate::{Result, ToolsError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use reqwest::Method;

/// Per-request timeout applied to every call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Most reads
pub const EXPECT_OK: &[u16] = &[200];
/// Most writes
pub const EXPECT_WRITE: &[u16] = &[200, 201];
/// State-only mutations
pub const EXPECT_NO_CONTENT: &[u16] = &[204];

/// Outcome of a single call: the decoded payload or a typed failure
pub type OperationResult = Result<Value>;

/// Authentication scheme of a platform
#[derive(Clone)]
pub enum Auth {
    /// HTTP basic auth (Atlassian email + API token)
    Basic { username: String, password: String },
    /// GitLab `PRIVATE-TOKEN` header
    PrivateToken(String),
    /// `Authorization: Bearer` (Slack bot token)
    Bearer(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Basic { username, .. } => write!(f, "Basic({username}, <redacted>)"),
            Auth::PrivateToken(_) => f.write_str("PrivateToken(<redacted>)"),
            Auth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

/// Fully-built request handed to a transport
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Raw response as seen by the transport
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Executes one HTTP exchange
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &ApiRequest, auth: &Auth) -> Result<ApiResponse>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("etools/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest, auth: &Auth) -> Result<ApiResponse> {
        let mut builder = self.client.request(request.method.clone(), &request.url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        builder = match auth {
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::PrivateToken(token) => builder.header("PRIVATE-TOKEN", token),
            Auth::Bearer(token) => builder.bearer_auth(token),
        };

        let response = builder.send().await.map_err(classify_send_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_send_error)?;

        Ok(ApiResponse { status, body })
    }
}

fn classify_send_error(err: reqwest::Error) -> ToolsError {
    if err.is_timeout() {
        ToolsError::Network(format!(
            "request timed out after {}s",
            REQUEST_TIMEOUT.as_secs()
        ))
    } else if err.is_connect() {
        ToolsError::Network(format!("connection failed: {err}"))
    } else {
        ToolsError::Http(err)
    }
}

/// Description of one call: method, path, query, body and accepted statuses
#[derive(Debug, Clone)]
pub struct Call {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    expect: &'static [u16],
}

impl Call {
    /// Defaults: GET expects 200, POST 200/201, PUT and DELETE 204.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let expect = match method {
            Method::GET => EXPECT_OK,
            Method::POST => EXPECT_WRITE,
            _ => EXPECT_NO_CONTENT,
        };
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            expect,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn expect(mut self, statuses: &'static [u16]) -> Self {
        self.expect = statuses;
        self
    }
}

/// HTTP client bound to one platform's base URL and credentials
pub struct ServiceClient {
    service: Service,
    base_url: String,
    auth: Auth,
    transport: Arc<dyn Transport>,
}

impl ServiceClient {
    pub fn new(
        service: Service,
        base_url: impl Into<String>,
        auth: Auth,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            service,
            base_url,
            auth,
            transport,
        }
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute a call and decode its JSON payload (`Null` for empty bodies)
    pub async fn call(&self, call: Call) -> OperationResult {
        let request = ApiRequest {
            url: format!("{}{}", self.base_url, call.path),
            method: call.method,
            path: call.path,
            query: call.query,
            body: call.body,
        };

        debug!(
            service = %self.service,
            method = %request.method,
            path = %request.path,
            "Calling remote API"
        );

        let response = self.transport.execute(&request, &self.auth).await?;

        if !call.expect.contains(&response.status) {
            debug!(
                service = %self.service,
                status = response.status,
                expected = ?call.expect,
                "Remote call failed"
            );
            return Err(ToolsError::Remote {
                status: response.status,
                body: response.body,
            });
        }

        decode_body(&response.body)
    }

    /// Execute a call and deserialize the payload into `T`
    pub async fn call_as<T: DeserializeOwned>(&self, call: Call) -> Result<T> {
        let value = self.call(call).await?;
        Ok(serde_json::from_value(value)?)
    }
}

fn decode_body(body: &str) -> OperationResult {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}
