use std::time::Duration;

use log::{debug, warn};
use serde_json::{Map, Value};

/// Address used when no backend URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of an error body kept in a `BackendError`.
const BODY_PREVIEW_CHARS: usize = 200;

/// Any failure talking to the presentation backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend returned HTTP {status} {reason}{}", format_body(.body))]
    Status {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend returned an unreadable response: {0}")]
    Decode(String),
}

fn format_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// One HTTP exchange with the backend, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl BackendRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: vec![],
            body: None,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(path)
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The interface tools use to reach the presentation backend.
///
/// `BackendClient` implements this over HTTP; tests substitute an in-memory
/// fake so handlers can be exercised without a server.
pub trait Backend: Send + Sync {
    /// Perform a single request and return the decoded JSON body.
    fn send(&self, request: &BackendRequest) -> Result<Value, BackendError>;
}

/// Connection settings for `BackendClient`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Blocking HTTP client for the presentation backend. Holds configuration and
/// a connection pool only, so one instance can serve concurrent calls.
pub struct BackendClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("deckgen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Backend for BackendClient {
    fn send(&self, request: &BackendRequest) -> Result<Value, BackendError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("[backend] {} {} query={:?}", request.method, url, request.query);

        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            // `json` also sets `content-type: application/json`.
            builder = builder.json(body);
        }

        let resp = builder.send().map_err(|e| {
            warn!("[backend] {} {} failed: {}", request.method, url, e);
            BackendError::Transport(describe_transport(&e))
        })?;

        let status = resp.status();
        debug!("[backend] response status={}", status);

        let text = resp
            .text()
            .map_err(|e| BackendError::Transport(describe_transport(&e)))?;

        if !status.is_success() {
            warn!("[backend] {} {} returned {}", request.method, url, status);
            return Err(BackendError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body: preview(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        serde_json::from_str(&text).map_err(|e| {
            warn!("[backend] non-JSON body from {}: {}", url, preview(&text));
            BackendError::Decode(e.to_string())
        })
    }
}

fn describe_transport(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("could not connect: {err}")
    } else {
        err.to_string()
    }
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let mut short: String = trimmed.chars().take(BODY_PREVIEW_CHARS).collect();
    short.push('…');
    short
}
