//! Transport session
//!
//! `HttpTransport` owns the pooled `reqwest::Client`, the API root and the
//! credentials. The pool is built lazily on first use and dropped by
//! `close()`; a later request builds a fresh one.

use super::request::RequestSpec;
use crate::auth::Credentials;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::BodyMode;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, StatusCode};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Response body, either fully read or still arriving
pub enum ResponseBody {
    Buffered(Bytes),
    Streaming(BoxStream<'static, Result<Bytes>>),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Buffered(bytes) => f
                .debug_tuple("Buffered")
                .field(&format_args!("{} bytes", bytes.len()))
                .finish(),
            ResponseBody::Streaming(_) => f.write_str("Streaming"),
        }
    }
}

/// Status, headers and body of one HTTP exchange
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl RawResponse {
    /// A response with a fully buffered body
    pub fn buffered(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Buffered(body.into()),
        }
    }

    /// A response whose body arrives as a stream of chunks
    pub fn streaming(status: StatusCode, body: BoxStream<'static, Result<Bytes>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Streaming(body),
        }
    }

    /// Read the rest of the body into memory
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self.body {
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Streaming(stream) => {
                let buf = stream
                    .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                        acc.extend_from_slice(&chunk);
                        Ok::<_, Error>(acc)
                    })
                    .await?;
                Ok(buf.freeze())
            }
        }
    }

    /// Read the body as lossy UTF-8 text, for error reporting
    pub async fn into_text(self) -> String {
        let status = self.status.as_u16();
        match self.into_bytes().await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!(status, error = %e, "Failed to read error response body");
                String::new()
            }
        }
    }

    /// The body as a chunk stream, whatever mode it was read in
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes>> {
        match self.body {
            ResponseBody::Buffered(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            ResponseBody::Streaming(stream) => stream,
        }
    }
}

/// A single HTTP exchange with the remote API.
///
/// Implementations return `Err` only for transport-level faults; any status,
/// including 4xx and 5xx, comes back as a `RawResponse`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request
    async fn send(&self, request: &RequestSpec, mode: BodyMode) -> Result<RawResponse>;

    /// Acquire the connection pool ahead of the first request
    fn open(&self) -> Result<()>;

    /// Release pooled connections; safe to call repeatedly
    fn close(&self);

    /// Whether a connection pool is currently held
    fn is_open(&self) -> bool;
}

/// Pool and timeout settings for `HttpTransport`
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub max_idle_connections: usize,
    pub user_agent: String,
}

impl From<&ClientConfig> for TransportSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            max_idle_connections: config.max_idle_connections,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    base_url: String,
    credentials: Credentials,
    settings: TransportSettings,
    handle: Mutex<Option<Client>>,
}

impl HttpTransport {
    /// Create a transport for an already normalized API root
    pub fn new(base_url: impl Into<String>, credentials: Credentials, settings: TransportSettings) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            settings,
            handle: Mutex::new(None),
        }
    }

    /// Create a transport from a validated client config
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(
            config.normalized_base_url()?,
            config.credentials(),
            TransportSettings::from(config),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an endpoint path
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn lock(&self) -> MutexGuard<'_, Option<Client>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current pooled client, building it if none is held
    fn client(&self) -> Result<Client> {
        let mut handle = self.lock();
        if let Some(client) = handle.as_ref() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .pool_max_idle_per_host(self.settings.max_idle_connections)
            .user_agent(&self.settings.user_agent)
            .build()?;
        debug!(base_url = %self.base_url, "Opened connection pool");
        *handle = Some(client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestSpec, mode: BodyMode) -> Result<RawResponse> {
        let client = self.client()?;
        let url = self.endpoint_url(request.path());
        let timeout = request.timeout();

        let mut req = client
            .request(request.method().into(), &url)
            .header(ACCEPT, "application/json")
            .timeout(timeout);

        if !request.query().is_empty() {
            req = req.query(request.query());
        }

        if let Some(body) = request.body() {
            req = req.json(body);
        }

        req = self.credentials.apply(req);

        let response = req.send().await.map_err(|e| transport_error(e, timeout))?;
        let status = response.status();
        let headers = response.headers().clone();

        let body = match mode {
            BodyMode::Buffered => ResponseBody::Buffered(
                response
                    .bytes()
                    .await
                    .map_err(|e| transport_error(e, timeout))?,
            ),
            BodyMode::Streaming => ResponseBody::Streaming(
                response
                    .bytes_stream()
                    .map_err(move |e| transport_error(e, timeout))
                    .boxed(),
            ),
        };

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    fn open(&self) -> Result<()> {
        self.client().map(|_| ())
    }

    fn close(&self) {
        if self.lock().take().is_some() {
            debug!(base_url = %self.base_url, "Closed connection pool");
        }
    }

    fn is_open(&self) -> bool {
        self.lock().is_some()
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("settings", &self.settings)
            .field("is_open", &self.is_open())
            .finish()
    }
}

fn transport_error(error: reqwest::Error, timeout: Duration) -> Error {
    if error.is_timeout() {
        Error::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        Error::Http(error)
    }
}
