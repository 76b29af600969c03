//! Confluence REST API client.
//!
//! Sync HTTP client for the Confluence REST API (`/rest/api`), using either
//! a personal access token or username + API token basic auth.

mod attachments;
mod pages;

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rt_config::{ConfluenceConfig, ConnectionConfig, Credentials};
use serde::de::DeserializeOwned;
use ureq::http::Response;
use ureq::typestate::WithoutBody;
use ureq::{Agent, Body, RequestBuilder};

use crate::error::ConfluenceError;

/// Confluence REST API client.
pub struct ConfluenceClient {
    agent: Agent,
    base_url: String,
    auth_header: String,
    auth_method: &'static str,
}

impl ConfluenceClient {
    /// Create client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError::Config`] if the URL or credentials are
    /// missing or invalid.
    pub fn from_config(
        confluence: &ConfluenceConfig,
        connection: &ConnectionConfig,
    ) -> Result<Self, ConfluenceError> {
        confluence.validate()?;
        let credentials = confluence.credentials()?;

        let mut builder = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(connection.timeout_secs)))
            .http_status_as_error(false);
        if !connection.verify_ssl {
            builder = builder.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }

        Ok(Self {
            agent: builder.build().into(),
            base_url: confluence.url.trim_end_matches('/').to_owned(),
            auth_header: auth_header(&credentials),
            auth_method: credentials.method(),
        })
    }

    /// Base URL of the Confluence site.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Human-readable name of the authentication method in use.
    #[must_use]
    pub fn auth_method(&self) -> &'static str {
        self.auth_method
    }

    /// Get the API base URL.
    fn api_url(&self) -> String {
        format!("{}/rest/api", self.base_url)
    }

    /// Resolve a link from a `_links` object against the site URL.
    fn resolve_link(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_owned()
        } else {
            format!("{}{}", self.base_url, link)
        }
    }

    /// Authenticated GET request.
    fn get(&self, url: &str) -> RequestBuilder<WithoutBody> {
        self.agent
            .get(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
    }
}

fn auth_header(credentials: &Credentials) -> String {
    match credentials {
        Credentials::Pat(token) => format!("Bearer {token}"),
        Credentials::Basic {
            username,
            api_token,
        } => format!("Basic {}", STANDARD.encode(format!("{username}:{api_token}"))),
    }
}

/// Read a response body as text, mapping error statuses.
fn read_text(response: Response<Body>, resource: &str) -> Result<String, ConfluenceError> {
    let status = response.status().as_u16();
    let mut body = response.into_body();

    if status >= 400 {
        let error_body = body
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_owned());
        return Err(ConfluenceError::from_status(status, error_body, resource));
    }

    Ok(body.read_to_string()?)
}

/// Read a response body as JSON, mapping error statuses.
fn read_json<T: DeserializeOwned>(
    response: Response<Body>,
    resource: &str,
) -> Result<T, ConfluenceError> {
    let text = read_text(response, resource)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn confluence(pat: &str) -> ConfluenceConfig {
        ConfluenceConfig {
            url: "https://example.atlassian.net/wiki/".to_owned(),
            username: "user@example.com".to_owned(),
            api_token: "secret".to_owned(),
            pat: pat.to_owned(),
        }
    }

    #[test]
    fn test_auth_header_pat() {
        let header = auth_header(&Credentials::Pat("abc123".to_owned()));
        assert_eq!(header, "Bearer abc123");
    }

    #[test]
    fn test_auth_header_basic() {
        let header = auth_header(&Credentials::Basic {
            username: "user".to_owned(),
            api_token: "pass".to_owned(),
        });
        assert_eq!(header, "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_from_config_trims_trailing_slash() {
        let client =
            ConfluenceClient::from_config(&confluence(""), &ConnectionConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://example.atlassian.net/wiki");
        assert_eq!(client.api_url(), "https://example.atlassian.net/wiki/rest/api");
        assert_eq!(client.auth_method(), "Basic Auth (username + API token)");
    }

    #[test]
    fn test_from_config_prefers_pat() {
        let client =
            ConfluenceClient::from_config(&confluence("token"), &ConnectionConfig::default())
                .unwrap();
        assert_eq!(client.auth_method(), "Personal Access Token (PAT)");
        assert_eq!(client.auth_header, "Bearer token");
    }

    #[test]
    fn test_from_config_without_credentials() {
        let config = ConfluenceConfig {
            url: "https://example.atlassian.net/wiki".to_owned(),
            ..ConfluenceConfig::default()
        };
        let result = ConfluenceClient::from_config(&config, &ConnectionConfig::default());
        assert!(matches!(result, Err(ConfluenceError::Config(_))));
    }

    #[test]
    fn test_from_config_insecure() {
        let connection = ConnectionConfig {
            verify_ssl: false,
            ..ConnectionConfig::default()
        };
        assert!(ConfluenceClient::from_config(&confluence(""), &connection).is_ok());
    }

    #[test]
    fn test_resolve_link() {
        let client =
            ConfluenceClient::from_config(&confluence(""), &ConnectionConfig::default()).unwrap();
        assert_eq!(
            client.resolve_link("/download/attachments/1/a.png"),
            "https://example.atlassian.net/wiki/download/attachments/1/a.png"
        );
        assert_eq!(
            client.resolve_link("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }
}
