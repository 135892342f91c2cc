//! DHIS2 API client
//!
//! `Client` is the public entry point. It owns one session: the pooled
//! transport, the credentials and the rate limiter. Calls may run concurrently
//! from any number of tasks sharing a `&Client` (or an `Arc<Client>`).
//!
//! After [`Client::close`] the next request reopens the connection pool, so a
//! closed client stays usable.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{
    HttpTransport, RateLimiter, RequestExecutor, RequestOptions, RequestSpec, ResponseStream,
    RetryPolicy, Transport,
};
use crate::types::{JsonValue, StringMap};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Asynchronous DHIS2 API client
pub struct Client {
    executor: RequestExecutor,
    base_url: String,
    default_timeout: Duration,
}

impl Client {
    /// Create a client with default settings (200 requests/second, 30s timeout)
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(ClientConfig::new(base_url, username, password))
    }

    /// Create a client from a full configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::from_config(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client on top of a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let limiter = RateLimiter::new(config.rate_limit_per_second)?;
        let policy = RetryPolicy::from_config(&config.retry);

        Ok(Self {
            executor: RequestExecutor::new(transport, limiter, policy),
            base_url: config.normalized_base_url()?,
            default_timeout: config.timeout(),
        })
    }

    /// Normalized API root, ending in `/api/`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests admitted per second
    pub fn rate_limit(&self) -> u32 {
        self.executor.rate_limiter().limit()
    }

    // ------------------------------------------------------------------------
    // Buffered requests
    // ------------------------------------------------------------------------

    /// GET an endpoint and decode the JSON body
    pub async fn get(&self, endpoint: &str) -> Result<JsonValue> {
        self.get_with_options(endpoint, RequestOptions::default())
            .await
    }

    /// GET an endpoint with query parameters
    pub async fn get_with_params(&self, endpoint: &str, params: StringMap) -> Result<JsonValue> {
        self.get_with_options(endpoint, RequestOptions::new().params(params))
            .await
    }

    /// GET an endpoint with query parameters and a timeout override
    pub async fn get_with_options(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<JsonValue> {
        let spec = self.spec(RequestSpec::get(endpoint), options);
        debug!(endpoint = spec.path(), "GET");
        self.executor.execute_json(&spec).await
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post(&self, endpoint: &str, data: JsonValue) -> Result<JsonValue> {
        self.post_with_options(endpoint, Some(data), RequestOptions::default())
            .await
    }

    /// POST with an optional body and a timeout override
    pub async fn post_with_options(
        &self,
        endpoint: &str,
        data: Option<JsonValue>,
        options: RequestOptions,
    ) -> Result<JsonValue> {
        let spec = self.spec(RequestSpec::post(endpoint, data), options);
        debug!(endpoint = spec.path(), "POST");
        self.executor.execute_json(&spec).await
    }

    // ------------------------------------------------------------------------
    // Streaming requests
    // ------------------------------------------------------------------------

    /// GET an endpoint and read the body as a stream of text chunks.
    ///
    /// Retries apply until the response headers arrive. A fault after that
    /// ends the stream with an error instead of being retried.
    pub async fn get_streamed(&self, endpoint: &str) -> Result<ResponseStream> {
        self.get_streamed_with_options(endpoint, RequestOptions::default())
            .await
    }

    /// Streaming GET with query parameters and a timeout override
    pub async fn get_streamed_with_options(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ResponseStream> {
        let spec = self.spec(RequestSpec::get(endpoint), options);
        debug!(endpoint = spec.path(), "GET (streamed)");
        self.executor.execute_stream(&spec).await
    }

    // ------------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------------

    /// Open the session now and return a guard that closes it when dropped
    pub fn open(&self) -> Result<SessionGuard<'_>> {
        self.executor.transport().open()?;
        Ok(SessionGuard { client: self })
    }

    /// Release pooled connections. Safe to call any number of times.
    pub fn close(&self) {
        self.executor.transport().close();
    }

    /// Whether a connection pool is currently held
    pub fn is_open(&self) -> bool {
        self.executor.transport().is_open()
    }

    fn spec(&self, spec: RequestSpec, options: RequestOptions) -> RequestSpec {
        spec.with_query(options.query)
            .with_timeout(options.timeout.unwrap_or(self.default_timeout))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("default_timeout", &self.default_timeout)
            .field("executor", &self.executor)
            .finish()
    }
}

/// Scoped session: derefs to the client and closes it on every exit path
#[derive(Debug)]
pub struct SessionGuard<'a> {
    client: &'a Client,
}

impl Deref for SessionGuard<'_> {
    type Target = Client;

    fn deref(&self) -> &Client {
        self.client
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.client.close();
    }
}
