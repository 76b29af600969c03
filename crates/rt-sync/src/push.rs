//! Pushing local edits back to Confluence.
//!
//! Push runs in two phases. [`Pusher::plan`] compares every working copy
//! with the current remote body and sorts pages into changed, unchanged, and
//! conflicting. [`Pusher::apply`] then updates the changed pages, asking the
//! caller to approve each one.

use std::path::{Path, PathBuf};

use rt_confluence::ContentStore;
use tracing::{debug, info, warn};

use crate::attachments::push_attachments;
use crate::changeset::ChangeSet;
use crate::error::SyncError;
use crate::pull::{PullOptions, Puller};
use crate::workspace::{LocalPage, find_page_dirs};

/// Push behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct PushOptions {
    /// Report what would be updated without writing anything.
    pub dry_run: bool,
    /// Push even when the remote page changed since the last pull.
    pub force: bool,
}

/// Summary of a push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushResult {
    /// Pages updated (or that would be, in a dry run).
    pub pages_updated: usize,
    /// Pages left alone: unchanged, or declined.
    pub pages_skipped: usize,
    /// Attachments uploaded (or that would be).
    pub attachments_uploaded: usize,
    /// Attachments whose content matches the last pull.
    pub attachments_skipped: usize,
    /// Pages not pushed because the remote version moved on.
    pub conflicts: Vec<String>,
    /// Failures that did not stop the push.
    pub errors: Vec<String>,
}

impl PushResult {
    /// Whether every page was either pushed or deliberately skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.errors.is_empty()
    }
}

/// Answer to a per-page confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Update this page.
    Push,
    /// Leave this page alone and continue.
    Skip,
    /// Stop without touching this or any later page.
    Quit,
}

/// A page with local changes that is ready to push.
#[derive(Debug, Clone)]
pub struct PagePlan {
    /// Page directory.
    pub dir: PathBuf,
    /// Page ID.
    pub page_id: String,
    /// Current remote title.
    pub title: String,
    /// Version recorded at pull time.
    pub local_version: u32,
    /// Current remote version.
    pub remote_version: u32,
    /// Difference from the remote body to the working copy.
    pub changes: ChangeSet,
}

impl PagePlan {
    /// Whether the page changed remotely since it was pulled.
    #[must_use]
    pub fn is_forced(&self) -> bool {
        self.remote_version > self.local_version
    }
}

/// Outcome of [`Pusher::plan`].
#[derive(Debug, Clone, Default)]
pub struct PushPlan {
    /// Pages to update, in directory order.
    pub pages: Vec<PagePlan>,
    /// Directories whose attachments should be synced after the update.
    attachment_dirs: Vec<(String, PathBuf)>,
    /// Result so far: unchanged pages, conflicts, errors.
    result: PushResult,
}

impl PushPlan {
    /// Counters and failures collected while planning.
    #[must_use]
    pub fn result(&self) -> &PushResult {
        &self.result
    }
}

/// Pushes working copies to a [`ContentStore`].
pub struct Pusher<'a> {
    store: &'a dyn ContentStore,
    options: PushOptions,
}

impl<'a> Pusher<'a> {
    /// Create a pusher.
    pub fn new(store: &'a dyn ContentStore, options: PushOptions) -> Self {
        Self { store, options }
    }

    /// Page directories to push: `path` itself, or with `recursive` every
    /// page directory below it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotTracked`] if no page directory was found.
    pub fn collect(path: &Path, recursive: bool) -> Result<Vec<PathBuf>, SyncError> {
        if !recursive {
            LocalPage::load(path)?;
            return Ok(vec![path.to_path_buf()]);
        }
        let dirs = find_page_dirs(path);
        if dirs.is_empty() {
            return Err(SyncError::NotTracked(path.to_path_buf()));
        }
        Ok(dirs)
    }

    /// Compare each page directory with the remote and decide what to push.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] if `message` is blank. This is
    /// checked before any remote call. Per-page failures are collected in
    /// the plan's result.
    pub fn plan(&self, dirs: &[PathBuf], message: &str) -> Result<PushPlan, SyncError> {
        validate_message(message)?;

        let mut plan = PushPlan::default();
        for dir in dirs {
            match self.plan_page(dir) {
                Ok(Planned::Changed(page)) => {
                    plan.attachment_dirs
                        .push((page.page_id.clone(), page.dir.clone()));
                    plan.pages.push(page);
                }
                Ok(Planned::Unchanged(page_id)) => {
                    plan.result.pages_skipped += 1;
                    plan.attachment_dirs.push((page_id, dir.clone()));
                }
                Ok(Planned::Conflict(message)) => {
                    warn!("{message}");
                    plan.result.conflicts.push(message);
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Failed to prepare push");
                    plan.result
                        .errors
                        .push(format!("{}: {e}", dir.display()));
                }
            }
        }
        Ok(plan)
    }

    fn plan_page(&self, dir: &Path) -> Result<Planned, SyncError> {
        let local = LocalPage::load(dir)?;
        let working = local.working_copy()?;
        let remote = self.store.get_page(local.id())?;

        let changes = ChangeSet::compute(remote.storage_value(), &working)?;
        if changes.is_empty() {
            debug!(page_id = local.id(), "Content unchanged");
            return Ok(Planned::Unchanged(local.id().to_owned()));
        }

        let remote_version = remote.version.number;
        if remote_version > local.version() && !self.options.force {
            return Ok(Planned::Conflict(format!(
                "Conflict: {} - local version {}, server version {}",
                local.title(),
                local.version(),
                remote_version
            )));
        }

        Ok(Planned::Changed(PagePlan {
            dir: dir.to_path_buf(),
            page_id: local.id().to_owned(),
            title: remote.title,
            local_version: local.version(),
            remote_version,
            changes,
        }))
    }

    /// Update the planned pages, then sync attachments.
    ///
    /// `approve` is asked once per page. In a dry run nothing is written and
    /// `approve` is not called.
    pub fn apply(
        &self,
        plan: PushPlan,
        message: &str,
        mut approve: impl FnMut(&PagePlan) -> Decision,
    ) -> PushResult {
        let PushPlan {
            pages,
            mut attachment_dirs,
            mut result,
        } = plan;

        for page in &pages {
            if self.options.dry_run {
                info!(
                    "Would update: {} (v{} -> v{})",
                    page.title,
                    page.remote_version,
                    page.remote_version + 1
                );
                result.pages_updated += 1;
                continue;
            }

            match approve(page) {
                Decision::Push => {}
                Decision::Skip => {
                    info!("Skipped: {}", page.title);
                    result.pages_skipped += 1;
                    attachment_dirs.retain(|(id, _)| id != &page.page_id);
                    continue;
                }
                Decision::Quit => {
                    info!("Push stopped at {}", page.title);
                    return result;
                }
            }

            match self.update(page, message) {
                Ok(()) => result.pages_updated += 1,
                Err(e) => {
                    warn!(page_id = %page.page_id, error = %e, "Failed to update page");
                    result.errors.push(format!("{}: {e}", page.dir.display()));
                    attachment_dirs.retain(|(id, _)| id != &page.page_id);
                }
            }
        }

        for (page_id, dir) in &attachment_dirs {
            push_attachments(self.store, page_id, dir, self.options.dry_run, &mut result);
        }
        result
    }

    /// Plan and apply without confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] if `message` is blank.
    pub fn push(&self, dirs: &[PathBuf], message: &str) -> Result<PushResult, SyncError> {
        let plan = self.plan(dirs, message)?;
        Ok(self.apply(plan, message, |_| Decision::Push))
    }

    fn update(&self, page: &PagePlan, message: &str) -> Result<(), SyncError> {
        let updated = self.store.update_page(
            &page.page_id,
            &page.title,
            page.changes.working(),
            page.remote_version,
            Some(message.trim()),
        )?;
        info!(
            "Updated: {} (v{} -> v{})",
            page.title, page.remote_version, updated.version.number
        );

        // Record the new version locally so the next push does not conflict
        let refresher = Puller::new(self.store, &page.dir, PullOptions::default());
        if let Err(e) = refresher.refresh(&page.page_id, &page.dir) {
            warn!(
                page_id = %page.page_id,
                error = %e,
                "Pushed, but refreshing the local copy failed; pull the page again"
            );
        }
        Ok(())
    }
}

enum Planned {
    Changed(PagePlan),
    Unchanged(String),
    Conflict(String),
}

/// Reject blank push messages.
///
/// [`Pusher::plan`] checks this too. Callers can run it earlier to fail
/// before any other work.
///
/// # Errors
///
/// Returns [`SyncError::Validation`] if `message` is empty or whitespace.
pub fn validate_message(message: &str) -> Result<(), SyncError> {
    if message.trim().is_empty() {
        return Err(SyncError::validation("a push message is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use pretty_assertions::assert_eq;
    use rt_confluence::MockContentStore;

    fn store() -> MockContentStore {
        MockContentStore::new()
            .with_page(MockContentStore::page("1", "Home", "S", 1, "<p>Home</p>"))
            .with_child("1", MockContentStore::page("2", "Child", "S", 1, "<p>Child</p>"))
    }

    fn pulled(store: &MockContentStore, root: &Path) -> PathBuf {
        Puller::new(
            store,
            root,
            PullOptions {
                recursive: true,
                ..PullOptions::default()
            },
        )
        .pull_page("1")
        .unwrap();
        root.join("S/Home")
    }

    fn edit(dir: &Path, body: &str) {
        fs::write(dir.join("page.xml"), body).unwrap();
    }

    #[test]
    fn test_push_without_changes_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();
        let dir = pulled(&store, tmp.path());

        let result = Pusher::new(&store, PushOptions::default())
            .push(&[dir], "nothing")
            .unwrap();

        assert_eq!(result.pages_updated, 0);
        assert_eq!(result.pages_skipped, 1);
        assert!(store.updates().is_empty());
    }

    #[test]
    fn test_push_rejects_blank_message() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();
        let dir = pulled(&store, tmp.path());
        edit(&dir, "<p>Edited</p>\n");

        for message in ["", "   ", "\n"] {
            let err = Pusher::new(&store, PushOptions::default())
                .push(&[dir.clone()], message)
                .unwrap_err();
            assert!(matches!(err, SyncError::Validation(_)));
        }
        assert!(store.updates().is_empty());
    }

    #[test]
    fn test_blank_message_rejected_before_remote_calls() {
        let store = MockContentStore::new().with_rejected_credentials();
        let err = Pusher::new(&store, PushOptions::default())
            .plan(&[PathBuf::from("/nonexistent")], " ")
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[test]
    fn test_push_updates_and_refreshes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();
        let dir = pulled(&store, tmp.path());
        edit(&dir, "<p>Edited</p>");

        let result = Pusher::new(&store, PushOptions::default())
            .push(&[dir.clone()], "Fix typo")
            .unwrap();

        assert_eq!(result.pages_updated, 1);
        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].version, 2);
        assert_eq!(updates[0].message.as_deref(), Some("Fix typo"));
        assert_eq!(updates[0].body, "<p>Edited</p>\n");

        let local = LocalPage::load(&dir).unwrap();
        assert_eq!(local.version(), 2);
        assert_eq!(local.working_copy().unwrap(), "<p>Edited</p>\n");
    }

    #[test]
    fn test_push_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();
        let dir = pulled(&store, tmp.path());
        edit(&dir, "<p>Mine</p>");
        store.edit_remote("1", "<p>Theirs</p>");

        let result = Pusher::new(&store, PushOptions::default())
            .push(&[dir.clone()], "mine")
            .unwrap();

        assert_eq!(result.pages_updated, 0);
        assert_eq!(result.conflicts.len(), 1);
        assert!(result.conflicts[0].contains("local version 1, server version 2"));
        assert!(!result.is_clean());
        assert!(store.updates().is_empty());

        let forced = Pusher::new(
            &store,
            PushOptions {
                force: true,
                ..PushOptions::default()
            },
        )
        .push(&[dir], "mine")
        .unwrap();
        assert_eq!(forced.pages_updated, 1);
        assert_eq!(store.updates()[0].version, 3);
    }

    #[test]
    fn test_push_dry_run() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();
        let dir = pulled(&store, tmp.path());
        edit(&dir, "<p>Edited</p>");

        let result = Pusher::new(
            &store,
            PushOptions {
                dry_run: true,
                ..PushOptions::default()
            },
        )
        .push(&[dir], "msg")
        .unwrap();

        assert_eq!(result.pages_updated, 1);
        assert!(store.updates().is_empty());
    }

    #[test]
    fn test_apply_decisions() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();
        let dir = pulled(&store, tmp.path());
        edit(&dir, "<p>A</p>");
        edit(&dir.join("Child"), "<p>B</p>");

        let pusher = Pusher::new(&store, PushOptions::default());
        let dirs = Pusher::collect(&dir, true).unwrap();
        assert_eq!(dirs.len(), 2);

        let plan = pusher.plan(&dirs, "msg").unwrap();
        assert_eq!(plan.pages.len(), 2);
        let result = pusher.apply(plan, "msg", |page| {
            if page.page_id == "1" {
                Decision::Skip
            } else {
                Decision::Push
            }
        });
        assert_eq!(result.pages_skipped, 1);
        assert_eq!(result.pages_updated, 1);
        assert_eq!(store.updates()[0].page_id, "2");

        edit(&dir.join("Child"), "<p>C</p>");
        let plan = pusher.plan(&dirs, "msg").unwrap();
        let result = pusher.apply(plan, "msg", |_| Decision::Quit);
        assert_eq!(result.pages_updated, 0);
        assert_eq!(store.updates().len(), 1);
    }

    #[test]
    fn test_push_uploads_attachments_of_unchanged_page() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();
        let dir = pulled(&store, tmp.path());
        fs::create_dir_all(dir.join("attachments")).unwrap();
        fs::write(dir.join("attachments/notes.txt"), "hi").unwrap();

        let result = Pusher::new(&store, PushOptions::default())
            .push(&[dir], "add notes")
            .unwrap();

        assert_eq!(result.pages_skipped, 1);
        assert_eq!(result.attachments_uploaded, 1);
    }

    #[test]
    fn test_collect_untracked() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            Pusher::collect(tmp.path(), false),
            Err(SyncError::NotTracked(_))
        ));
        assert!(matches!(
            Pusher::collect(tmp.path(), true),
            Err(SyncError::NotTracked(_))
        ));
    }

    #[test]
    fn test_update_failure_is_collected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();
        let dir = pulled(&store, tmp.path());
        edit(&dir, "<p>Edited</p>");
        let pusher = Pusher::new(&store, PushOptions::default());
        let plan = pusher.plan(&[dir.clone()], "msg").unwrap();

        // Someone else saves between plan and apply
        store.edit_remote("1", "<p>Race</p>");
        let result = pusher.apply(plan, "msg", |_| Decision::Push);

        assert_eq!(result.pages_updated, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("409"));
    }
}
