//! Confluence page types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Confluence page.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Page {
    /// Page ID.
    pub id: String,
    /// Content type (always "page" for pages).
    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Space the page lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<SpaceRef>,
    /// Version information.
    #[serde(default)]
    pub version: Version,
    /// Page body content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    /// Ancestors from the space root down to the direct parent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<Ancestor>,
    /// Hypermedia links.
    #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_content_type() -> String {
    "page".to_owned()
}

impl Page {
    /// Storage-format body, or an empty string if the body was not expanded.
    #[must_use]
    pub fn storage_value(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|b| b.storage.as_ref())
            .map_or("", |s| s.value.as_str())
    }

    /// Space key, falling back to the `_expandable.space` link
    /// (`/rest/api/space/KEY`) when the space was not expanded.
    #[must_use]
    pub fn space_key(&self) -> Option<&str> {
        if let Some(space) = &self.space {
            return Some(space.key.as_str());
        }
        self.extra
            .get("_expandable")
            .and_then(|e| e.get("space"))
            .and_then(Value::as_str)
            .and_then(|link| link.rsplit('/').next())
            .filter(|key| !key.is_empty())
    }
}

/// Page version.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Version {
    /// Version number.
    #[serde(default)]
    pub number: u32,
    /// Version message/comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Timestamp of the version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    /// Fields not modelled above (`by`, `minorEdit`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Page body content.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Body {
    /// Storage format content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,
    /// Other representations (`view`, `export_view`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Storage format representation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Storage {
    /// XHTML content in Confluence storage format.
    pub value: String,
    /// Content representation (always "storage").
    #[serde(default = "default_representation")]
    pub representation: String,
}

fn default_representation() -> String {
    "storage".to_owned()
}

/// Space reference embedded in a page.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpaceRef {
    /// Space key.
    pub key: String,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ancestor page reference.
///
/// The title is present when ancestors are expanded, but may be missing
/// from minimal responses.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ancestor {
    /// Ancestor page ID.
    pub id: String,
    /// Ancestor title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Hypermedia links.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Links {
    /// Web UI link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webui: Option<String>,
    /// API self link.
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Download link (attachments).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<String>,
    /// Next result page (paginated endpoints).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Site base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Minimal content reference returned by searches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentRef {
    /// Content ID.
    pub id: String,
}

/// Content search (CQL) response page.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// Matching content on this page of results.
    pub results: Vec<ContentRef>,
    /// Pagination links.
    #[serde(rename = "_links", default)]
    pub links: Links,
}
