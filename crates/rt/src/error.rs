//! CLI error types.

use rt_config::ConfigError;
use rt_confluence::ConfluenceError;
use rt_sync::SyncError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Confluence(#[from] ConfluenceError),

    #[error("{0}")]
    Sync(#[from] SyncError),

    #[error("{0}")]
    Validation(String),

    /// The command ran to the end but some pages failed; details were
    /// already printed.
    #[error("{0}")]
    Incomplete(String),
}
