//! Configuration management for roundtripper.
//!
//! Parses `roundtripper.toml` configuration files with serde. The file is
//! located, in order of precedence, from:
//!
//! 1. an explicit path (the `--config` CLI flag)
//! 2. the `ROUNDTRIPPER_CONFIG_PATH` environment variable
//! 3. `roundtripper.toml` in the current directory or one of its parents
//! 4. the user file `$XDG_CONFIG_HOME/roundtripper/config.toml`
//!
//! When no file exists, defaults are used. CLI settings can be applied during
//! load via [`CliSettings`], and [`ConfigStore`] edits a file by dotted key.
//!
//! ## Environment Variable Expansion
//!
//! String values in the `[confluence]` section support environment variable
//! expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

mod expand;
mod store;

pub use store::{ConfigStore, default_value};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration filename to search for.
pub const CONFIG_FILENAME: &str = "roundtripper.toml";

/// Environment variable that points at a configuration file.
pub const CONFIG_PATH_ENV: &str = "ROUNDTRIPPER_CONFIG_PATH";

/// Placeholder shown instead of secret values.
const REDACTED: &str = "********";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the local workspace directory.
    pub output_dir: Option<PathBuf>,
    /// Override the Confluence URL.
    pub url: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Confluence connection and credentials.
    pub confluence: ConfluenceConfig,
    /// HTTP connection settings.
    pub connection: ConnectionConfig,
    /// Local workspace settings.
    pub workspace: WorkspaceConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Confluence configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// Confluence base URL (e.g. `https://example.atlassian.net/wiki`).
    pub url: String,
    /// Username for basic authentication.
    pub username: String,
    /// API token for basic authentication.
    pub api_token: String,
    /// Personal access token. Takes precedence over basic authentication.
    pub pat: String,
}

/// Credentials resolved from [`ConfluenceConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access token, sent as a bearer token.
    Pat(String),
    /// Username and API token, sent as HTTP basic auth.
    Basic {
        /// Account username (usually an email address).
        username: String,
        /// API token used as the password.
        api_token: String,
    },
}

impl Credentials {
    /// Human-readable name of the authentication method.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Pat(_) => "Personal Access Token (PAT)",
            Self::Basic { .. } => "Basic Auth (username + API token)",
        }
    }
}

impl ConfluenceConfig {
    /// Validate that the URL and credentials are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the URL is missing or malformed,
    /// or if no credentials are configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.url, "confluence.url")?;
        require_http_url(&self.url, "confluence.url")?;
        self.credentials()?;
        Ok(())
    }

    /// Resolve the configured credentials.
    ///
    /// A personal access token wins over username + API token.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if neither a PAT nor a complete
    /// username/API token pair is set.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if !self.pat.is_empty() {
            return Ok(Credentials::Pat(self.pat.clone()));
        }
        if !self.username.is_empty() && !self.api_token.is_empty() {
            return Ok(Credentials::Basic {
                username: self.username.clone(),
                api_token: self.api_token.clone(),
            });
        }
        Err(ConfigError::Validation(
            "no Confluence credentials configured (set confluence.pat, or confluence.username and confluence.api_token)"
                .to_owned(),
        ))
    }

    /// Copy with secrets replaced by a placeholder.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |value: &str| {
            if value.is_empty() {
                String::new()
            } else {
                REDACTED.to_owned()
            }
        };
        Self {
            url: self.url.clone(),
            username: self.username.clone(),
            api_token: mask(&self.api_token),
            pat: mask(&self.pat),
        }
    }
}

/// HTTP connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Global request timeout in seconds.
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates.
    pub verify_ssl: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            verify_ssl: true,
        }
    }
}

/// Local workspace configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory pulled pages are written to. Relative paths are resolved
    /// against the current working directory.
    pub output_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("confluence-export"),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Unknown dotted configuration key.
    #[error("Invalid config path: {0}")]
    InvalidPath(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`confluence.api_token`").
        field: String,
        /// Error message (e.g., "${`CONFLUENCE_TOKEN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = config_path
            && !path.exists()
        {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let mut config = match Self::locate(config_path) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Find an existing configuration file, following the precedence order.
    #[must_use]
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = env_config_path() {
            return path.exists().then_some(path);
        }
        Self::discover_config().or_else(|| user_config_path().filter(|p| p.exists()))
    }

    /// Path that configuration edits should be written to.
    ///
    /// Same precedence as [`Config::locate`], except that the user config
    /// path is returned even when the file does not exist yet.
    #[must_use]
    pub fn target_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = env_config_path() {
            return Some(path);
        }
        Self::discover_config().or_else(user_config_path)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(output_dir) = &settings.output_dir {
            self.workspace.output_dir.clone_from(output_dir);
        }
        if let Some(url) = &settings.url {
            self.confluence.url.clone_from(url);
        }
    }

    /// Get validated Confluence configuration.
    ///
    /// Use this instead of accessing the `confluence` field directly when the
    /// command talks to Confluence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the URL or credentials are invalid.
    pub fn require_confluence(&self) -> Result<&ConfluenceConfig, ConfigError> {
        self.confluence.validate()?;
        Ok(&self.confluence)
    }

    /// Copy of this configuration with secrets masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            confluence: self.confluence.redacted(),
            ..self.clone()
        }
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Serialize` if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Confluence credentials are not validated here, since commands such as
    /// `config show` must work without them. See [`Config::require_confluence`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "connection.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        if self.workspace.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "workspace.output_dir cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let confluence = &mut self.confluence;
        confluence.url = expand::expand_env(&confluence.url, "confluence.url")?;
        confluence.username = expand::expand_env(&confluence.username, "confluence.username")?;
        confluence.api_token = expand::expand_env(&confluence.api_token, "confluence.api_token")?;
        confluence.pat = expand::expand_env(&confluence.pat, "confluence.pat")?;
        Ok(())
    }
}

/// Config path from the `ROUNDTRIPPER_CONFIG_PATH` environment variable.
fn env_config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// User-level config file: `$XDG_CONFIG_HOME/roundtripper/config.toml`,
/// falling back to `~/.config/roundtripper/config.toml`.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
    Some(base.join("roundtripper").join("config.toml"))
}
