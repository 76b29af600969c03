//! `roundtripper ping` command implementation.

use std::path::Path;

use clap::Args;
use rt_config::{CliSettings, Config};
use rt_confluence::ContentStore;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the ping command.
#[derive(Args)]
pub(crate) struct PingArgs {
    /// Confluence base URL (overrides config).
    #[arg(short, long, env = "CONFLUENCE_URL")]
    url: Option<String>,
}

impl PingArgs {
    /// Execute the ping command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete or Confluence
    /// rejects the request.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        let settings = CliSettings {
            url: self.url,
            ..CliSettings::default()
        };
        let config = Config::load(config_path, Some(&settings))?;
        let client = super::connect(&config, &output)?;

        output.info(&format!("Connecting to {}...", client.base_url()));
        output.info(&format!("Authentication: {}", client.auth_method()));
        client.check_connection()?;
        output.success("Connection OK");
        Ok(())
    }
}
