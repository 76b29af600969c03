//! Content store abstraction.
//!
//! Sync code talks to Confluence through [`ContentStore`], so it can be
//! tested against [`MockContentStore`](crate::MockContentStore) without a
//! network.

use crate::client::ConfluenceClient;
use crate::error::ConfluenceError;
use crate::types::{Attachment, Page, Space};

/// Remote page and attachment operations needed for sync.
pub trait ContentStore: Send + Sync {
    /// Get a page with storage body, version, space and ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError::NotFound`] if the page does not exist.
    fn get_page(&self, page_id: &str) -> Result<Page, ConfluenceError>;

    /// Replace a page body, bumping the version to `current_version + 1`.
    ///
    /// `message` becomes the version comment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError::HttpResponse`] with status 409 if
    /// `current_version` is stale.
    fn update_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        current_version: u32,
        message: Option<&str>,
    ) -> Result<Page, ConfluenceError>;

    /// IDs of every page below `page_id` in the hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError`] if the search fails.
    fn get_descendant_ids(&self, page_id: &str) -> Result<Vec<String>, ConfluenceError>;

    /// Get a space by key, with its home page.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError::NotFound`] if the space does not exist.
    fn get_space(&self, space_key: &str) -> Result<Space, ConfluenceError>;

    /// List all attachments on a page.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError`] if listing fails.
    fn get_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, ConfluenceError>;

    /// Download attachment content.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError`] if the download fails.
    fn download_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, ConfluenceError>;

    /// Create or replace an attachment by filename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError`] if the upload fails.
    fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<Attachment, ConfluenceError>;

    /// Check that the server is reachable and accepts the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError::Auth`] for rejected credentials and
    /// [`ConfluenceError::Connection`] if the server cannot be reached.
    fn check_connection(&self) -> Result<(), ConfluenceError>;
}

impl ContentStore for ConfluenceClient {
    fn get_page(&self, page_id: &str) -> Result<Page, ConfluenceError> {
        self.fetch_page(page_id)
    }

    fn update_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        current_version: u32,
        message: Option<&str>,
    ) -> Result<Page, ConfluenceError> {
        self.put_page(page_id, title, body, current_version, message)
    }

    fn get_descendant_ids(&self, page_id: &str) -> Result<Vec<String>, ConfluenceError> {
        self.search_descendant_ids(page_id)
    }

    fn get_space(&self, space_key: &str) -> Result<Space, ConfluenceError> {
        self.fetch_space(space_key)
    }

    fn get_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, ConfluenceError> {
        self.list_attachments(page_id)
    }

    fn download_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, ConfluenceError> {
        self.download(attachment)
    }

    fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<Attachment, ConfluenceError> {
        self.upload(page_id, filename, data, content_type)
    }

    fn check_connection(&self) -> Result<(), ConfluenceError> {
        self.ping()
    }
}
