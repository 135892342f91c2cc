//! Request description
//!
//! A `RequestSpec` is fixed once built; the executor may send it several
//! times while retrying.

use crate::types::{JsonValue, Method, StringMap};
use std::time::Duration;

/// Default timeout applied when neither the call nor the client sets one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One logical API call
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    method: Method,
    path: String,
    query: StringMap,
    body: Option<JsonValue>,
    timeout: Duration,
}

impl RequestSpec {
    /// A GET request for `path` (relative to the API root)
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// A POST request for `path` carrying an optional JSON body
    pub fn post(path: impl Into<String>, body: Option<JsonValue>) -> Self {
        let mut spec = Self::new(Method::Post, path);
        spec.body = body;
        spec
    }

    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into().trim_start_matches('/').to_string(),
            query: StringMap::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the query parameters
    #[must_use]
    pub fn with_query(mut self, query: StringMap) -> Self {
        self.query = query;
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Endpoint path with any leading slash removed
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &StringMap {
        &self.query
    }

    pub fn body(&self) -> Option<&JsonValue> {
        self.body.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Per-call options accepted by the client façade
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query parameters
    pub query: StringMap,
    /// Override the client's default timeout
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Replace all query parameters
    #[must_use]
    pub fn params(mut self, params: StringMap) -> Self {
        self.query = params;
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
