//! Page and space operations for Confluence API.

use serde_json::json;
use tracing::{debug, info};

use super::{ConfluenceClient, read_json};
use crate::error::ConfluenceError;
use crate::types::{Page, SearchResponse, Space, SpacesResponse};

/// Fields expanded when fetching a page for sync.
pub(crate) const PAGE_EXPAND: &str = "body.storage,version,space,ancestors";

/// Page size for descendant searches.
const SEARCH_LIMIT: &str = "100";

impl ConfluenceClient {
    /// Get page by ID with body, version, space and ancestors expanded.
    pub(crate) fn fetch_page(&self, page_id: &str) -> Result<Page, ConfluenceError> {
        let url = format!("{}/content/{}", self.api_url(), page_id);

        debug!(page_id, "Getting page");

        let response = self.get(&url).query("expand", PAGE_EXPAND).call()?;
        read_json(response, &format!("page {page_id}"))
    }

    /// Update existing page to `current_version + 1`.
    pub(crate) fn put_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        current_version: u32,
        message: Option<&str>,
    ) -> Result<Page, ConfluenceError> {
        let url = format!("{}/content/{}", self.api_url(), page_id);

        let mut payload = json!({
            "id": page_id,
            "type": "page",
            "title": title,
            "body": {
                "storage": {
                    "value": body,
                    "representation": "storage"
                }
            },
            "version": {"number": current_version + 1}
        });

        if let Some(msg) = message {
            payload["version"]["message"] = json!(msg);
        }

        info!(
            "Updating page {} from version {} to {}",
            page_id,
            current_version,
            current_version + 1
        );

        let payload_bytes = serde_json::to_vec(&payload)?;

        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;

        let page: Page = read_json(response, &format!("page {page_id}"))?;
        info!("Updated page {} to version {}", page_id, page.version.number);
        Ok(page)
    }

    /// IDs of every page below `page_id`, following search pagination.
    pub(crate) fn search_descendant_ids(
        &self,
        page_id: &str,
    ) -> Result<Vec<String>, ConfluenceError> {
        let cql = format!("ancestor={page_id} and type=page");
        let resource = format!("descendants of page {page_id}");

        let first = format!("{}/content/search", self.api_url());
        let response = self
            .get(&first)
            .query("cql", &cql)
            .query("limit", SEARCH_LIMIT)
            .call()?;
        let mut batch: SearchResponse = read_json(response, &resource)?;

        let mut ids = Vec::new();
        loop {
            ids.extend(batch.results.into_iter().map(|r| r.id));
            let Some(next) = batch.links.next else {
                break;
            };
            debug!(page_id, found = ids.len(), "Following search pagination");
            let response = self.get(&self.resolve_link(&next)).call()?;
            batch = read_json(response, &resource)?;
        }

        info!("Found {} descendants of page {}", ids.len(), page_id);
        Ok(ids)
    }

    /// Get space by key with its home page expanded.
    pub(crate) fn fetch_space(&self, space_key: &str) -> Result<Space, ConfluenceError> {
        let url = format!("{}/space/{}", self.api_url(), space_key);
        let response = self.get(&url).query("expand", "homepage").call()?;
        read_json(response, &format!("space {space_key}"))
    }

    /// Make the cheapest authenticated call available.
    pub(crate) fn ping(&self) -> Result<(), ConfluenceError> {
        let url = format!("{}/space", self.api_url());
        let response = self.get(&url).query("limit", "1").call()?;
        let spaces: SpacesResponse = read_json(response, "space list")?;
        debug!(spaces = spaces.size, "Connection check succeeded");
        Ok(())
    }
}
