//! Editing configuration files by dotted key.
//!
//! [`ConfigStore`] works on the raw TOML table so that keys the user did not
//! touch are written back as they were. Every edit is validated by
//! deserializing the resulting table into [`Config`] before it is saved.

use std::fs;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::{Config, ConfigError};

/// A configuration file that can be edited key by key.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store for the file at `path`. The file does not need to exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw table. A missing file reads as an empty table.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load_table(&self) -> Result<Table, ConfigError> {
        if !self.path.exists() {
            return Ok(Table::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Set `key` (e.g. `connection.verify_ssl`) to `raw_value`.
    ///
    /// The value is parsed as TOML unless the setting is a string, in which
    /// case it is taken literally. Intermediate tables are created, replacing
    /// any non-table value in the way.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPath` for unknown keys and
    /// `ConfigError::Validation` if the value has the wrong type.
    pub fn set(&self, key: &str, raw_value: &str) -> Result<(), ConfigError> {
        let default = default_value(Some(key))?;
        if default.is_table() {
            return Err(ConfigError::Validation(format!(
                "{key} is a section, set one of its keys instead"
            )));
        }

        let mut table = self.load_table()?;
        insert_at(&mut table, key, parse_value(raw_value, &default));
        validate_table(&table, key)?;
        self.save(&table)
    }

    /// Reset `key` to its default, or the whole file when `key` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPath` for unknown keys, or an I/O error
    /// if the file cannot be written.
    pub fn reset(&self, key: Option<&str>) -> Result<(), ConfigError> {
        let Some(key) = key else {
            return self.save(&default_table()?);
        };

        let default = default_value(Some(key))?;
        let mut table = self.load_table()?;
        insert_at(&mut table, key, default);
        self.save(&table)
    }

    fn save(&self, table: &Table) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string_pretty(table)?)?;
        Ok(())
    }
}

/// Default value at a dotted `key`, or the whole default table for `None`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidPath` if the key does not name a setting or
/// section.
pub fn default_value(key: Option<&str>) -> Result<Value, ConfigError> {
    let mut value = Value::Table(default_table()?);
    let Some(key) = key else {
        return Ok(value);
    };

    for part in key.split('.') {
        value = match value {
            Value::Table(mut table) => table
                .remove(part)
                .ok_or_else(|| ConfigError::InvalidPath(key.to_owned()))?,
            _ => return Err(ConfigError::InvalidPath(key.to_owned())),
        };
    }
    Ok(value)
}

fn default_table() -> Result<Table, ConfigError> {
    match Value::try_from(Config::default())? {
        Value::Table(table) => Ok(table),
        other => Err(ConfigError::Validation(format!(
            "default configuration serialized as {}",
            other.type_str()
        ))),
    }
}

/// Parse a CLI-supplied value, guided by the type of the default.
fn parse_value(raw: &str, default: &Value) -> Value {
    if default.is_str() {
        return Value::String(raw.to_owned());
    }
    toml::from_str::<Table>(&format!("value = {raw}"))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| Value::String(raw.to_owned()))
}

/// Insert `value` at a dotted path, creating intermediate tables.
fn insert_at(table: &mut Table, key: &str, value: Value) {
    let mut parts: Vec<&str> = key.split('.').collect();
    let Some(last) = parts.pop() else {
        return;
    };

    let mut current = table;
    for part in parts {
        let entry = current
            .entry(part.to_owned())
            .or_insert_with(|| Value::Table(Table::new()));
        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }
        let Value::Table(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.to_owned(), value);
}

fn validate_table(table: &Table, key: &str) -> Result<(), ConfigError> {
    let config: Config = Value::Table(table.clone())
        .try_into()
        .map_err(|e| ConfigError::Validation(format!("invalid value for {key}: {e}")))?;
    config.validate()
}
