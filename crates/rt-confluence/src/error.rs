//! Error types for Confluence integration.

/// Error from Confluence API operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfluenceError {
    /// Transport failure: DNS, connect, TLS, timeout.
    #[error("connection to Confluence failed: {0}")]
    Connection(#[from] ureq::Error),

    /// Credentials were rejected (401) or lack permission (403).
    #[error("authentication failed (HTTP {status}): {body}")]
    Auth {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// The requested page, space, or attachment does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// HTTP response error (server returned any other error status).
    #[error("HTTP error: {status} - {body}")]
    HttpResponse {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// Client could not be built from configuration.
    #[error("invalid client configuration: {0}")]
    Config(#[from] rt_config::ConfigError),

    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response was well-formed but missing something we need.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ConfluenceError {
    /// Map an HTTP error status to the matching error kind.
    pub(crate) fn from_status(status: u16, body: String, resource: &str) -> Self {
        match status {
            401 | 403 => Self::Auth { status, body },
            404 => Self::NotFound(resource.to_owned()),
            _ => Self::HttpResponse { status, body },
        }
    }

    /// Whether the error means the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
