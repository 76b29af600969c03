//! `roundtripper config` subcommand group.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use rt_config::{Config, ConfigStore};

use crate::error::CliError;
use crate::output::Output;

/// Configuration commands.
#[derive(Subcommand)]
pub(crate) enum ConfigCommand {
    /// Print the effective configuration (secrets masked).
    Show,
    /// Print the path of the configuration file in use.
    Path,
    /// Set a value by dotted key, e.g. `connection.verify_ssl false`.
    Set(SetArgs),
    /// Reset a key, a section, or the whole file to defaults.
    Reset(ResetArgs),
}

#[derive(Args)]
pub(crate) struct SetArgs {
    /// Dotted key, e.g. `confluence.url`.
    key: String,
    /// New value. Strings are taken literally, other settings parse as TOML.
    value: String,
}

#[derive(Args)]
pub(crate) struct ResetArgs {
    /// Dotted key or section. Resets everything when omitted.
    key: Option<String>,
}

impl ConfigCommand {
    /// Execute the config subcommand.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        match self {
            Self::Show => {
                let config = Config::load(config_path, None)?;
                match &config.config_path {
                    Some(path) => output.info(&format!("# {}", path.display())),
                    None => output.info("# No configuration file found, showing defaults"),
                }
                output.print(&config.redacted().to_toml()?);
            }
            Self::Path => match Config::locate(config_path) {
                Some(path) => output.print(&path.display().to_string()),
                None => {
                    output.warning("No configuration file found.");
                    if let Some(path) = Config::target_path(config_path) {
                        output.info(&format!("`config set` would create {}", path.display()));
                    }
                }
            },
            Self::Set(args) => {
                let store = ConfigStore::new(target_path(config_path)?);
                store.set(&args.key, &args.value)?;
                output.success(&format!(
                    "Set {} in {}",
                    args.key,
                    store.path().display()
                ));
            }
            Self::Reset(args) => {
                let store = ConfigStore::new(target_path(config_path)?);
                store.reset(args.key.as_deref())?;
                match args.key {
                    Some(key) => output.success(&format!(
                        "Reset {key} in {}",
                        store.path().display()
                    )),
                    None => output.success(&format!("Reset {}", store.path().display())),
                }
            }
        }
        Ok(())
    }
}

fn target_path(config_path: Option<&Path>) -> Result<PathBuf, CliError> {
    Config::target_path(config_path).ok_or_else(|| {
        CliError::Validation(
            "cannot determine a configuration file location; pass --config".to_owned(),
        )
    })
}
