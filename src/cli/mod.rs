//! CLI module
//!
//! Command-line interface over the client.
//!
//! # Commands
//!
//! - `get` - GET an endpoint and print the JSON response
//! - `post` - POST a JSON body and print the JSON response
//! - `stream` - GET an endpoint and copy the body to stdout as it arrives

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
