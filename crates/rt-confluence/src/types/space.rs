//! Confluence space types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Confluence space.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Space {
    /// Space key.
    pub key: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Home page reference, if the space has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<Homepage>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Space home page reference.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Homepage {
    /// Home page ID.
    pub id: String,
}

/// Space list response.
///
/// Only used to check that the API answers, so just the count is kept.
#[derive(Debug, Clone, Deserialize)]
pub struct SpacesResponse {
    /// Number of spaces returned.
    #[serde(default)]
    pub size: usize,
}
