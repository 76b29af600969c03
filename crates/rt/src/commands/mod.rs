//! CLI command implementations.

mod config;
mod diff;
mod ping;
mod pull;
mod push;

pub(crate) use config::ConfigCommand;
pub(crate) use diff::DiffArgs;
pub(crate) use ping::PingArgs;
pub(crate) use pull::PullArgs;
pub(crate) use push::PushArgs;

use std::path::{Path, PathBuf};

use rt_config::{CliSettings, Config};
use rt_confluence::ConfluenceClient;
use rt_sync::find_page_dir;
use tracing::debug;

use crate::error::CliError;
use crate::output::Output;

/// Create a client from validated Confluence settings.
fn connect(config: &Config, output: &Output) -> Result<ConfluenceClient, CliError> {
    let confluence = config.require_confluence().inspect_err(|_| {
        output.info("\nAdd the following to roundtripper.toml:");
        output.info("\n[confluence]");
        output.info(r#"url = "https://example.atlassian.net/wiki""#);
        output.info(r#"username = "user@example.com""#);
        output.info(r#"api_token = "${CONFLUENCE_API_TOKEN}""#);
    })?;
    Ok(ConfluenceClient::from_config(confluence, &config.connection)?)
}

/// Load configuration, optionally overriding the workspace directory.
fn load_config(
    config_path: Option<&Path>,
    output_dir: Option<PathBuf>,
) -> Result<Config, CliError> {
    let settings = CliSettings {
        output_dir,
        ..CliSettings::default()
    };
    let config = Config::load(config_path, Some(&settings))?;
    debug!(
        path = ?config.config_path,
        workspace = %config.workspace.output_dir.display(),
        "Loaded configuration"
    );
    Ok(config)
}

/// Resolve the directory a command works on: an explicit path, the page
/// directory of `page_id` in the workspace, or the workspace itself.
fn resolve_target(
    config: &Config,
    page_id: Option<&str>,
    path: Option<PathBuf>,
) -> Result<PathBuf, CliError> {
    if let Some(path) = path {
        return Ok(path);
    }
    let root = &config.workspace.output_dir;
    match page_id {
        Some(id) => Ok(find_page_dir(root, id)?),
        None => Ok(root.clone()),
    }
}

/// Print collected per-page errors and turn them into a failure.
fn finish(output: &Output, errors: &[String]) -> Result<(), CliError> {
    if errors.is_empty() {
        return Ok(());
    }
    output.error(&format!("\n{} error(s):", errors.len()));
    for error in errors {
        output.error(&format!("  {error}"));
    }
    Err(CliError::Incomplete(format!("{} page(s) failed", errors.len())))
}
