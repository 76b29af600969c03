//! Confluence attachment types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Links, Version};

/// Confluence attachment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Attachment {
    /// Attachment ID.
    pub id: String,
    /// Attachment title/filename.
    pub title: String,
    /// Attachment version.
    #[serde(default)]
    pub version: Version,
    /// File size and media type.
    #[serde(default)]
    pub extensions: AttachmentExtensions,
    /// Hypermedia links, including the download link.
    #[serde(rename = "_links", default)]
    pub links: Links,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Attachment extensions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AttachmentExtensions {
    /// File size in bytes.
    #[serde(rename = "fileSize", default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// MIME type.
    #[serde(rename = "mediaType", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Attachments API response (one page of results).
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentsResponse {
    /// List of attachments.
    pub results: Vec<Attachment>,
    /// Number of results on this page.
    #[serde(default)]
    pub size: Option<usize>,
}
