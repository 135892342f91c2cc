// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # DHIS2 Client
//!
//! An asynchronous client for the DHIS2 web API.
//!
//! ## Features
//!
//! - **Basic Auth**: credentials attached to every request, never logged
//! - **Rate Limiting**: fixed one-second window shared by all concurrent calls
//! - **Automatic Retries**: network faults and 5xx responses, exponential backoff
//! - **Streaming**: large exports read as UTF-8 text chunks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dhis2_client::{Client, Result};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new("admin", "district", "https://play.dhis2.org/40")?;
//!     let session = client.open()?;
//!
//!     let me = session.get("me").await?;
//!     println!("{}", me["displayName"]);
//!
//!     let mut events = session.get_streamed("events.csv").await?;
//!     while let Some(chunk) = events.next().await {
//!         print!("{}", chunk?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  Client   get() / post() / get_streamed() / open() close()│
//! └─────────────────────────────┬─────────────────────────────┘
//!                               │
//! ┌─────────────┬───────────────┴─────┬───────────────────────┐
//! │ RateLimiter │  RequestExecutor    │   HttpTransport       │
//! ├─────────────┼─────────────────────┼───────────────────────┤
//! │ Fixed window│  Retry / Backoff    │   Pooled reqwest      │
//! │ 200 req/s   │  JSON / TextStream  │   Basic auth          │
//! └─────────────┴─────────────────────┴───────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Client configuration
pub mod config;

/// Basic authentication
pub mod auth;

/// Rate limiting, retry, transport and streaming
pub mod http;

/// Public client façade
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{Client, SessionGuard};
pub use config::{ClientConfig, RetryConfig};
pub use error::{Error, Result};
pub use http::{RequestOptions, ResponseStream};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
