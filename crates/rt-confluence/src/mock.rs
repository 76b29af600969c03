//! Mock content store for testing.
//!
//! Provides [`MockContentStore`] for testing sync code without a Confluence
//! server.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use serde_json::Map;

use crate::error::ConfluenceError;
use crate::store::ContentStore;
use crate::types::{
    Ancestor, Attachment, AttachmentExtensions, Body, Homepage, Links, Page, Space, SpaceRef,
    Storage, Version,
};

/// A page update recorded by [`MockContentStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpdate {
    /// Updated page ID.
    pub page_id: String,
    /// Body sent.
    pub body: String,
    /// Version the page was updated to.
    pub version: u32,
    /// Version comment.
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredAttachment {
    attachment: Attachment,
    data: Vec<u8>,
}

/// In-memory Confluence for tests.
///
/// Pages are kept in insertion order. Use the builder methods to set up
/// spaces, page trees, and attachments, then inspect recorded updates and
/// uploads after running sync code.
///
/// # Example
///
/// ```ignore
/// use rt_confluence::{ContentStore, MockContentStore};
///
/// let store = MockContentStore::new()
///     .with_space("DOCS", Some("1"))
///     .with_page(MockContentStore::page("1", "Home", "DOCS", 1, "<p>Hi</p>"))
///     .with_child("1", MockContentStore::page("2", "Guide", "DOCS", 3, "<p>Guide</p>"));
///
/// assert_eq!(store.get_descendant_ids("1").unwrap(), vec!["2"]);
/// ```
#[derive(Debug, Default)]
pub struct MockContentStore {
    pages: RwLock<BTreeMap<usize, Page>>,
    order: RwLock<HashMap<String, usize>>,
    spaces: RwLock<HashMap<String, Space>>,
    attachments: RwLock<HashMap<String, Vec<StoredAttachment>>>,
    failures: RwLock<HashMap<String, u16>>,
    auth_rejected: RwLock<bool>,
    updates: RwLock<Vec<RecordedUpdate>>,
    uploads: RwLock<Vec<(String, String)>>,
    downloads: RwLock<Vec<String>>,
}

impl MockContentStore {
    /// Create a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a page with an expanded storage body.
    #[must_use]
    pub fn page(id: &str, title: &str, space_key: &str, version: u32, body: &str) -> Page {
        Page {
            id: id.to_owned(),
            content_type: "page".to_owned(),
            title: title.to_owned(),
            space: Some(SpaceRef {
                key: space_key.to_owned(),
                extra: Map::new(),
            }),
            version: Version {
                number: version,
                ..Version::default()
            },
            body: Some(Body {
                storage: Some(Storage {
                    value: body.to_owned(),
                    representation: "storage".to_owned(),
                }),
                extra: Map::new(),
            }),
            ancestors: Vec::new(),
            links: Some(Links {
                webui: Some(format!("/spaces/{space_key}/pages/{id}")),
                ..Links::default()
            }),
            extra: Map::new(),
        }
    }

    /// Add a space, optionally with a home page ID.
    #[must_use]
    pub fn with_space(self, key: &str, homepage_id: Option<&str>) -> Self {
        write(&self.spaces).insert(
            key.to_owned(),
            Space {
                key: key.to_owned(),
                name: format!("{key} space"),
                homepage: homepage_id.map(|id| Homepage { id: id.to_owned() }),
                extra: Map::new(),
            },
        );
        self
    }

    /// Add a page as is.
    #[must_use]
    pub fn with_page(self, page: Page) -> Self {
        self.insert_page(page);
        self
    }

    /// Add a page below `parent_id`, inheriting the parent's ancestors.
    #[must_use]
    pub fn with_child(self, parent_id: &str, mut page: Page) -> Self {
        if let Some(parent) = self.find(parent_id) {
            page.ancestors.clone_from(&parent.ancestors);
            page.ancestors.push(Ancestor {
                id: parent.id.clone(),
                title: Some(parent.title.clone()),
                extra: Map::new(),
            });
        }
        self.insert_page(page);
        self
    }

    /// Add an attachment to a page.
    #[must_use]
    pub fn with_attachment(self, page_id: &str, filename: &str, data: &[u8]) -> Self {
        self.store_attachment(page_id, filename, data, None);
        self
    }

    /// Make every request for `page_id` fail with an HTTP `status`.
    #[must_use]
    pub fn with_failure(self, page_id: &str, status: u16) -> Self {
        write(&self.failures).insert(page_id.to_owned(), status);
        self
    }

    /// Reject every request as unauthorized.
    #[must_use]
    pub fn with_rejected_credentials(self) -> Self {
        *write(&self.auth_rejected) = true;
        self
    }

    /// Simulate someone else editing a page: replace its body and bump the
    /// version.
    pub fn edit_remote(&self, page_id: &str, body: &str) {
        let Some(index) = read(&self.order).get(page_id).copied() else {
            return;
        };
        if let Some(page) = write(&self.pages).get_mut(&index) {
            set_body(page, body);
            page.version.number += 1;
        }
    }

    /// Page updates made so far.
    #[must_use]
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        read(&self.updates).clone()
    }

    /// `(page_id, filename)` of every upload made so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<(String, String)> {
        read(&self.uploads).clone()
    }

    /// Titles of every attachment downloaded so far.
    #[must_use]
    pub fn downloads(&self) -> Vec<String> {
        read(&self.downloads).clone()
    }

    /// Current remote state of a page.
    #[must_use]
    pub fn find(&self, page_id: &str) -> Option<Page> {
        let index = read(&self.order).get(page_id).copied()?;
        read(&self.pages).get(&index).cloned()
    }

    fn insert_page(&self, page: Page) {
        let mut order = write(&self.order);
        let next = order.len();
        let index = *order.entry(page.id.clone()).or_insert(next);
        write(&self.pages).insert(index, page);
    }

    fn store_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Attachment {
        let mut attachments = write(&self.attachments);
        let list = attachments.entry(page_id.to_owned()).or_default();

        if let Some(stored) = list.iter_mut().find(|s| s.attachment.title == filename) {
            stored.attachment.version.number += 1;
            stored.attachment.extensions.file_size = Some(data.len() as u64);
            stored.data = data.to_vec();
            return stored.attachment.clone();
        }

        let id = format!("att{page_id}{}", list.len() + 1);
        let attachment = Attachment {
            id: id.clone(),
            title: filename.to_owned(),
            version: Version {
                number: 1,
                ..Version::default()
            },
            extensions: AttachmentExtensions {
                file_size: Some(data.len() as u64),
                media_type: Some(content_type.unwrap_or("application/octet-stream").to_owned()),
                extra: Map::new(),
            },
            links: Links {
                download: Some(format!("/download/attachments/{page_id}/{filename}")),
                ..Links::default()
            },
            extra: Map::new(),
        };
        list.push(StoredAttachment {
            attachment: attachment.clone(),
            data: data.to_vec(),
        });
        attachment
    }

    fn check(&self, page_id: &str) -> Result<(), ConfluenceError> {
        if *read(&self.auth_rejected) {
            return Err(ConfluenceError::Auth {
                status: 401,
                body: "Unauthorized".to_owned(),
            });
        }
        if let Some(&status) = read(&self.failures).get(page_id) {
            return Err(ConfluenceError::HttpResponse {
                status,
                body: "injected failure".to_owned(),
            });
        }
        Ok(())
    }
}

impl ContentStore for MockContentStore {
    fn get_page(&self, page_id: &str) -> Result<Page, ConfluenceError> {
        self.check(page_id)?;
        self.find(page_id)
            .ok_or_else(|| ConfluenceError::NotFound(format!("page {page_id}")))
    }

    fn update_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        current_version: u32,
        message: Option<&str>,
    ) -> Result<Page, ConfluenceError> {
        self.check(page_id)?;
        let index = read(&self.order)
            .get(page_id)
            .copied()
            .ok_or_else(|| ConfluenceError::NotFound(format!("page {page_id}")))?;

        let mut pages = write(&self.pages);
        let page = pages
            .get_mut(&index)
            .ok_or_else(|| ConfluenceError::NotFound(format!("page {page_id}")))?;

        if page.version.number != current_version {
            return Err(ConfluenceError::HttpResponse {
                status: 409,
                body: format!(
                    "Version must be incremented on update. Current version is: {}",
                    page.version.number
                ),
            });
        }

        title.clone_into(&mut page.title);
        set_body(page, body);
        page.version.number = current_version + 1;
        page.version.message = message.map(str::to_owned);

        write(&self.updates).push(RecordedUpdate {
            page_id: page_id.to_owned(),
            body: body.to_owned(),
            version: page.version.number,
            message: message.map(str::to_owned),
        });
        Ok(page.clone())
    }

    fn get_descendant_ids(&self, page_id: &str) -> Result<Vec<String>, ConfluenceError> {
        self.check(page_id)?;
        Ok(read(&self.pages)
            .values()
            .filter(|p| p.ancestors.iter().any(|a| a.id == page_id))
            .map(|p| p.id.clone())
            .collect())
    }

    fn get_space(&self, space_key: &str) -> Result<Space, ConfluenceError> {
        self.check(space_key)?;
        read(&self.spaces)
            .get(space_key)
            .cloned()
            .ok_or_else(|| ConfluenceError::NotFound(format!("space {space_key}")))
    }

    fn get_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, ConfluenceError> {
        self.check(page_id)?;
        Ok(read(&self.attachments)
            .get(page_id)
            .map(|list| list.iter().map(|s| s.attachment.clone()).collect())
            .unwrap_or_default())
    }

    fn download_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, ConfluenceError> {
        self.check(&attachment.id)?;
        write(&self.downloads).push(attachment.title.clone());
        read(&self.attachments)
            .values()
            .flatten()
            .find(|s| s.attachment.id == attachment.id)
            .map(|s| s.data.clone())
            .ok_or_else(|| ConfluenceError::NotFound(format!("attachment {}", attachment.title)))
    }

    fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<Attachment, ConfluenceError> {
        self.check(page_id)?;
        write(&self.uploads).push((page_id.to_owned(), filename.to_owned()));
        Ok(self.store_attachment(page_id, filename, data, Some(content_type)))
    }

    fn check_connection(&self) -> Result<(), ConfluenceError> {
        self.check("")
    }
}

fn set_body(page: &mut Page, body: &str) {
    page.body = Some(Body {
        storage: Some(Storage {
            value: body.to_owned(),
            representation: "storage".to_owned(),
        }),
        extra: Map::new(),
    });
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
