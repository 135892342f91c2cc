//! HTTP request pipeline
//!
//! Every call goes through the same pipeline:
//!
//! ```text
//! RequestSpec → RateLimiter::acquire → Transport::send ─┬─ 2xx → JSON / TextStream
//!                      ▲                                 └─ failure → RetryPolicy
//!                      └──────────── backoff ◄──── retry ───────┘
//! ```
//!
//! # Features
//!
//! - **Rate Limiting**: fixed one-second window shared by all callers
//! - **Automatic Retries**: network faults and 5xx, exponential backoff
//! - **Streaming**: UTF-8 text chunks from an open response body

mod executor;
mod rate_limit;
mod request;
mod retry;
mod stream;
mod transport;

pub use executor::RequestExecutor;
pub use rate_limit::RateLimiter;
pub use request::{RequestOptions, RequestSpec, DEFAULT_TIMEOUT};
pub use retry::{classify_status, RetryDecision, RetryPolicy};
pub use stream::{ResponseStream, TextStream};
pub use transport::{HttpTransport, RawResponse, ResponseBody, Transport, TransportSettings};
