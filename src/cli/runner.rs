//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::{Error, Result, ResultExt};
use crate::http::RequestOptions;
use crate::types::{JsonValue, StringMap};
use futures::StreamExt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command inside one client session
    pub async fn run(&self) -> Result<()> {
        let client = Client::with_config(self.client_config()?)?;
        let session = client.open()?;

        match &self.cli.command {
            Commands::Get { endpoint, params } => {
                let value = session
                    .get_with_params(endpoint, to_map(params))
                    .await?;
                self.print_json(&value)
            }
            Commands::Post {
                endpoint,
                data,
                data_file,
            } => {
                let body = read_body(data.as_deref(), data_file.as_deref())?;
                let value = session
                    .post_with_options(endpoint, body, RequestOptions::default())
                    .await?;
                self.print_json(&value)
            }
            Commands::Stream { endpoint, params } => {
                let options = RequestOptions::new().params(to_map(params));
                let mut stream = session.get_streamed_with_options(endpoint, options).await?;

                let mut stdout = tokio::io::stdout();
                while let Some(chunk) = stream.next().await {
                    stdout.write_all(chunk?.as_bytes()).await?;
                }
                stdout.flush().await?;
                Ok(())
            }
        }
    }

    /// Build the client config from a config file and/or flags; flags win
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.cli.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => {
                let url = self
                    .cli
                    .url
                    .clone()
                    .ok_or_else(|| Error::config("DHIS2 URL not specified (use --url or DHIS2_URL)"))?;
                let username = self.cli.username.clone().ok_or_else(|| {
                    Error::config("Username not specified (use --username or DHIS2_USERNAME)")
                })?;
                let password = self.cli.password.clone().unwrap_or_default();
                ClientConfig::new(url, username, password)
            }
        };

        if self.cli.config.is_some() {
            if let Some(url) = &self.cli.url {
                config.base_url.clone_from(url);
            }
            if let Some(username) = &self.cli.username {
                config.username.clone_from(username);
            }
            if let Some(password) = &self.cli.password {
                config.password.clone_from(password);
            }
        }
        if let Some(timeout) = self.cli.timeout {
            config = config.with_timeout(Duration::from_secs(timeout));
        }
        if let Some(rate_limit) = self.cli.rate_limit {
            config = config.with_rate_limit(rate_limit);
        }

        config.validate()?;
        Ok(config)
    }

    fn print_json(&self, value: &JsonValue) -> Result<()> {
        let output = if self.cli.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{output}");
        Ok(())
    }
}

fn to_map(params: &[(String, String)]) -> StringMap {
    params.iter().cloned().collect()
}

fn read_body(data: Option<&str>, data_file: Option<&Path>) -> Result<Option<JsonValue>> {
    let raw = match (data, data_file) {
        (Some(inline), _) => inline.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read body file '{}'", path.display()))?,
        (None, None) => return Ok(None),
    };
    let body: JsonValue = serde_json::from_str(&raw).context("Request body is not valid JSON")?;
    Ok(Some(body))
}
