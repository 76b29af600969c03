//! Error types for synchronization.

use std::path::PathBuf;

use rt_confluence::ConfluenceError;

use crate::xml::XmlError;

/// Error from a pull, diff, or push operation.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Remote store failed: connection, authentication, not found, HTTP.
    #[error(transparent)]
    Remote(#[from] ConfluenceError),

    /// Storage-format body could not be repaired.
    #[error("cannot parse page content: {0}")]
    Parse(#[from] XmlError),

    /// Input rejected before any remote call.
    #[error("{0}")]
    Validation(String),

    /// Path is not a pulled page directory.
    #[error("not a pulled page directory (no page.json): {}", .0.display())]
    NotTracked(PathBuf),

    /// No pulled page with this ID under the workspace.
    #[error("page {page_id} has not been pulled into {}", workspace.display())]
    PageNotPulled {
        /// Page ID searched for.
        page_id: String,
        /// Workspace directory searched.
        workspace: PathBuf,
    },

    /// Local page would be overwritten by a pull.
    #[error(
        "local changes in {} would be overwritten by version {remote_version} (use --force)",
        path.display()
    )]
    LocalChanges {
        /// Page directory.
        path: PathBuf,
        /// Remote version that was not pulled.
        remote_version: u32,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata sidecar could not be read or written.
    #[error("invalid page metadata: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Shorthand for a validation failure.
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
