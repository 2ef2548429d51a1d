//! Request executor for the backend under test

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::expect::StatusPolicy;

/// Which credentials a request carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// Whatever token the session currently holds
    #[default]
    Session,
    /// An explicit bearer token for this request only
    Bearer(String),
    /// No Authorization header at all
    Anonymous,
}

/// A single call against the backend
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
    auth: Auth,
    at_root: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            segments: Vec::new(),
            query: Vec::new(),
            body: None,
            auth: Auth::Session,
            at_root: false,
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

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append one path segment, percent-encoded as a single segment.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer(token.into());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = Auth::Anonymous;
        self
    }

    /// Resolve against the server root instead of the API prefix.
    pub fn at_root(mut self) -> Self {
        self.at_root = true;
        self
    }
}

/// Parsed response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

/// What came back from one call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
    pub elapsed: Duration,
}

impl ApiResponse {
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// Declared as JSON and parsed as JSON.
    pub fn is_json(&self) -> bool {
        self.content_type().contains("application/json") && matches!(self.body, ResponseBody::Json(_))
    }

    pub fn looks_like_html(&self) -> bool {
        self.content_type().contains("text/html")
            || matches!(&self.body, ResponseBody::Text(text) if text.to_ascii_lowercase().contains("<html"))
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Body as a JSON value for result details, whatever its format.
    pub fn body_value(&self) -> Value {
        match &self.body {
            ResponseBody::Json(value) => value.clone(),
            ResponseBody::Text(text) => Value::String(text.clone()),
            ResponseBody::Empty => Value::Null,
        }
    }

    pub fn expect_status(&self, policy: StatusPolicy) -> HarnessResult<()> {
        if policy.accepts(self.status_code()) {
            Ok(())
        } else {
            Err(HarnessError::UnexpectedStatus {
                expected: policy.to_string(),
                actual: self.status_code(),
                body: self.body_value(),
            })
        }
    }

    pub fn json_body(&self) -> HarnessResult<&Value> {
        self.json().ok_or_else(|| HarnessError::MissingField {
            field: "<body>".to_string(),
            expected: "a JSON document",
            body: self.body_value(),
        })
    }

    pub fn json_list(&self) -> HarnessResult<&[Value]> {
        match self.json() {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(HarnessError::MissingField {
                field: "<body>".to_string(),
                expected: "a JSON list",
                body: self.body_value(),
            }),
        }
    }
}

/// HTTP client plus the session state it authenticates with
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_prefix: String,
    timeout: Duration,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HarnessError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_prefix: config.api_prefix.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Replace the session token, returning the previous one.
    pub fn set_token(&mut self, token: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.token, token)
    }

    /// Use `token` as the session identity until the guard drops.
    pub fn acting_as(&mut self, token: &str) -> IdentityGuard<'_> {
        let previous = self.set_token(Some(token.to_string()));
        IdentityGuard {
            client: self,
            previous: Some(previous),
        }
    }

    pub fn url_for(&self, request: &ApiRequest) -> HarnessResult<Url> {
        let prefix = if request.at_root { "" } else { self.api_prefix.as_str() };
        let raw = format!("{}{}{}", self.base_url, prefix, request.path);
        let mut url = Url::parse(&raw).map_err(|e| HarnessError::Config(format!("bad URL {}: {}", raw, e)))?;

        if !request.segments.is_empty() {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| HarnessError::Config(format!("URL cannot take path segments: {}", raw)))?;
            segments.pop_if_empty();
            for segment in &request.segments {
                segments.push(segment);
            }
        }

        Ok(url)
    }

    /// Send a request and hand back whatever status the backend answered with.
    pub async fn send(&self, request: ApiRequest) -> HarnessResult<ApiResponse> {
        let url = self.url_for(&request)?;
        let method = request.method.clone();

        let mut builder = self.http.request(method.clone(), url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let token = match &request.auth {
            Auth::Session => self.token.as_deref(),
            Auth::Bearer(token) => Some(token.as_str()),
            Auth::Anonymous => None,
        };
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            builder = builder.bearer_auth(token);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| self.transport_error(&method, &url, e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(|e| self.transport_error(&method, &url, e))?;
        let elapsed = started.elapsed();

        debug!("{} {} -> {} ({} ms)", method, url, status, elapsed.as_millis());

        Ok(ApiResponse {
            status,
            body: parse_body(&headers, text),
            headers,
            elapsed,
        })
    }

    /// Send, check the status, and return the JSON body.
    pub async fn call(&self, request: ApiRequest, policy: StatusPolicy) -> HarnessResult<Value> {
        let response = self.send(request).await?;
        response.expect_status(policy)?;
        response.json_body().cloned()
    }

    fn transport_error(&self, method: &Method, url: &Url, source: reqwest::Error) -> HarnessError {
        if source.is_timeout() {
            HarnessError::Timeout {
                method: method.to_string(),
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            HarnessError::Transport {
                method: method.to_string(),
                url: url.to_string(),
                source,
            }
        }
    }
}

fn parse_body(headers: &HeaderMap, text: String) -> ResponseBody {
    if text.is_empty() {
        return ResponseBody::Empty;
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let maybe_json = content_type.contains("json") || content_type.is_empty();
    if maybe_json {
        if let Ok(value) = serde_json::from_str(&text) {
            return ResponseBody::Json(value);
        }
    }

    ResponseBody::Text(text)
}

/// Scoped identity switch; the previous token is restored on drop.
pub struct IdentityGuard<'a> {
    client: &'a mut ApiClient,
    previous: Option<Option<String>>,
}

impl Deref for IdentityGuard<'_> {
    type Target = ApiClient;

    fn deref(&self) -> &ApiClient {
        &*self.client
    }
}

impl DerefMut for IdentityGuard<'_> {
    fn deref_mut(&mut self) -> &mut ApiClient {
        &mut *self.client
    }
}

impl Drop for IdentityGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.client.token = previous;
        }
    }
}
