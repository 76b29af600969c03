//! Pulling pages from Confluence into the local workspace.

use std::path::{Path, PathBuf};

use rt_confluence::types::Page;
use rt_confluence::{ConfluenceError, ContentStore};
use tracing::{debug, info, warn};

use crate::attachments::pull_attachments;
use crate::error::SyncError;
use crate::workspace::{DocumentState, LocalPage, build_page_path, save_page};
use crate::xml::format_storage;

/// Pull behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct PullOptions {
    /// Also pull every descendant page.
    pub recursive: bool,
    /// Report what would be downloaded without writing anything.
    pub dry_run: bool,
    /// Overwrite local modifications.
    pub force: bool,
}

/// Summary of a pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullResult {
    /// Pages written (or that would be written, in a dry run).
    pub pages_downloaded: usize,
    /// Pages already at the remote version.
    pub pages_skipped: usize,
    /// Attachments written (or that would be written).
    pub attachments_downloaded: usize,
    /// Attachments already at the remote version.
    pub attachments_skipped: usize,
    /// Failures that did not stop the pull.
    pub errors: Vec<String>,
}

/// Pulls pages from a [`ContentStore`] into an output directory.
pub struct Puller<'a> {
    store: &'a dyn ContentStore,
    output_dir: PathBuf,
    options: PullOptions,
}

impl<'a> Puller<'a> {
    /// Create a puller writing below `output_dir`.
    pub fn new(
        store: &'a dyn ContentStore,
        output_dir: impl Into<PathBuf>,
        options: PullOptions,
    ) -> Self {
        Self {
            store,
            output_dir: output_dir.into(),
            options,
        }
    }

    /// Pull one page, and its descendants if `recursive` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the page itself cannot be pulled. Failures on
    /// descendants and attachments are collected in [`PullResult::errors`].
    pub fn pull_page(&self, page_id: &str) -> Result<PullResult, SyncError> {
        let mut result = PullResult::default();
        self.pull_one(page_id, &mut result)?;

        if self.options.recursive {
            match self.store.get_descendant_ids(page_id) {
                Ok(ids) => {
                    info!("Pulling {} descendants of page {}", ids.len(), page_id);
                    for id in ids {
                        if let Err(e) = self.pull_one(&id, &mut result) {
                            warn!(page_id = %id, error = %e, "Failed to pull page");
                            result.errors.push(format!("page {id}: {e}"));
                        }
                    }
                }
                Err(e) => {
                    warn!(page_id, error = %e, "Failed to list descendants");
                    result
                        .errors
                        .push(format!("listing descendants of page {page_id}: {e}"));
                }
            }
        }

        Ok(result)
    }

    /// Pull a whole space, starting from its home page.
    ///
    /// A space without a home page pulls nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the space or its home page cannot be pulled.
    pub fn pull_space(&self, space_key: &str) -> Result<PullResult, SyncError> {
        let space = self.store.get_space(space_key)?;
        let Some(homepage) = space.homepage else {
            warn!("Space {} has no home page, nothing to pull", space_key);
            return Ok(PullResult::default());
        };

        info!("Pulling space {} from home page {}", space_key, homepage.id);
        let puller = Puller {
            store: self.store,
            output_dir: self.output_dir.clone(),
            options: PullOptions {
                recursive: true,
                ..self.options
            },
        };
        puller.pull_page(&homepage.id)
    }

    /// Re-pull a page into an existing directory, overwriting the working
    /// copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched, parsed, or written.
    pub fn refresh(&self, page_id: &str, dir: &Path) -> Result<(), SyncError> {
        let page = self.store.get_page(page_id)?;
        let formatted = format_storage(page.storage_value())?;
        save_page(dir, &page, &formatted)?;
        debug!(page_id, version = page.version.number, dir = %dir.display(), "Refreshed page");
        Ok(())
    }

    fn pull_one(&self, page_id: &str, result: &mut PullResult) -> Result<(), SyncError> {
        let page = self.store.get_page(page_id)?;
        let formatted = format_storage(page.storage_value())?;
        let dir = self.page_dir(&page)?;
        let remote_version = page.version.number;

        if let Ok(local) = LocalPage::load(&dir) {
            let state = local.state()?;
            if local.version() == remote_version && state != DocumentState::Unsynced {
                debug!(page_id, version = remote_version, "Page up to date");
                result.pages_skipped += 1;
                pull_attachments(self.store, page_id, &dir, self.options.dry_run, result);
                return Ok(());
            }
            if state == DocumentState::Modified && !self.options.force {
                return Err(SyncError::LocalChanges {
                    path: dir,
                    remote_version,
                });
            }
        }

        if self.options.dry_run {
            info!("Would download: {} (v{})", page.title, remote_version);
        } else {
            save_page(&dir, &page, &formatted)?;
            info!("Downloaded: {} (v{})", page.title, remote_version);
        }
        result.pages_downloaded += 1;

        pull_attachments(self.store, page_id, &dir, self.options.dry_run, result);
        Ok(())
    }

    /// Directory for a page, resolving ancestor titles the API left out.
    fn page_dir(&self, page: &Page) -> Result<PathBuf, SyncError> {
        let space_key = page.space_key().ok_or_else(|| {
            ConfluenceError::UnexpectedResponse(format!("page {} has no space", page.id))
        })?;

        let mut titles = Vec::with_capacity(page.ancestors.len());
        for ancestor in &page.ancestors {
            let title = match &ancestor.title {
                Some(title) => title.clone(),
                None => self.store.get_page(&ancestor.id)?.title,
            };
            titles.push(title);
        }

        Ok(build_page_path(
            &self.output_dir,
            space_key,
            &titles,
            &page.title,
        ))
    }
}
