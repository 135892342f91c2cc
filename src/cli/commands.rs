//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DHIS2 API command-line client
#[derive(Parser, Debug)]
#[command(name = "dhis2")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// DHIS2 instance URL
    #[arg(long, global = true, env = "DHIS2_URL")]
    pub url: Option<String>,

    /// Username
    #[arg(short, long, global = true, env = "DHIS2_USERNAME")]
    pub username: Option<String>,

    /// Password
    #[arg(long, global = true, env = "DHIS2_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Maximum requests per second
    #[arg(long, global = true)]
    pub rate_limit: Option<u32>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// GET an endpoint and print the JSON response
    Get {
        /// Endpoint path relative to /api/ (e.g. dataElements)
        endpoint: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// POST a JSON body and print the JSON response
    Post {
        /// Endpoint path relative to /api/
        endpoint: String,

        /// Inline JSON body
        #[arg(long, conflicts_with = "data_file")]
        data: Option<String>,

        /// File containing the JSON body
        #[arg(long)]
        data_file: Option<PathBuf>,
    },

    /// Stream an endpoint's body to stdout
    Stream {
        /// Endpoint path relative to /api/ (e.g. events.csv)
        endpoint: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },
}

/// Parse a `key=value` argument
fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{arg}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{arg}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
