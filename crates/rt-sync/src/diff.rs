//! Comparing working copies with a base version.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rt_confluence::ContentStore;
use tracing::{debug, warn};

use crate::changeset::ChangeSet;
use crate::error::SyncError;
use crate::workspace::{LocalPage, find_page_dirs};

/// What a working copy is compared against.
#[derive(Clone, Copy)]
pub enum DiffBase<'a> {
    /// The body recorded in `page.json` at pull time. Works offline.
    Snapshot,
    /// The current body on the server.
    Remote(&'a dyn ContentStore),
}

/// Change set of one page directory.
#[derive(Debug, Clone)]
pub struct PageDiff {
    /// Page directory.
    pub dir: PathBuf,
    /// Page ID.
    pub page_id: String,
    /// Page title.
    pub title: String,
    /// Difference from the base to the working copy.
    pub changes: ChangeSet,
}

/// Remote page under a diffed tree with no local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOnly {
    /// Page ID.
    pub page_id: String,
    /// Page title, empty if it could not be fetched.
    pub title: String,
}

/// Summary of a diff.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    /// Every compared page, changed or not.
    pub pages: Vec<PageDiff>,
    /// Remote descendants missing locally (remote recursive diffs only).
    pub remote_only: Vec<RemoteOnly>,
    /// Pages that could not be compared.
    pub errors: Vec<String>,
}

impl DiffResult {
    /// Pages with a non-empty change set.
    pub fn changed(&self) -> impl Iterator<Item = &PageDiff> {
        self.pages.iter().filter(|p| !p.changes.is_empty())
    }

    /// Whether anything differs.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.changed().next().is_some() || !self.remote_only.is_empty()
    }
}

/// Diff one page directory against `base`.
///
/// # Errors
///
/// Returns an error if the directory is not a pulled page, the working copy
/// cannot be read, the remote page cannot be fetched, or either side cannot
/// be parsed.
pub fn diff_page(dir: &Path, base: DiffBase<'_>) -> Result<PageDiff, SyncError> {
    let local = LocalPage::load(dir)?;
    let working = local.working_copy()?;

    let changes = match base {
        DiffBase::Snapshot => ChangeSet::compute(local.snapshot().storage_value(), &working)?,
        DiffBase::Remote(store) => {
            let remote = store.get_page(local.id())?;
            ChangeSet::compute(remote.storage_value(), &working)?
        }
    };
    debug!(page_id = local.id(), changed = !changes.is_empty(), "Diffed page");

    Ok(PageDiff {
        dir: dir.to_path_buf(),
        page_id: local.id().to_owned(),
        title: local.title().to_owned(),
        changes,
    })
}

/// Diff a page directory, or with `recursive` every page directory below it.
///
/// For a recursive remote diff rooted at a page directory, remote
/// descendants with no local directory are listed as well.
///
/// # Errors
///
/// Returns an error if a single page cannot be diffed, or
/// [`SyncError::NotTracked`] if nothing under `root` was pulled. In a
/// recursive diff, per-page failures are collected in
/// [`DiffResult::errors`] instead.
pub fn diff_tree(
    root: &Path,
    recursive: bool,
    base: DiffBase<'_>,
) -> Result<DiffResult, SyncError> {
    if !recursive {
        return Ok(DiffResult {
            pages: vec![diff_page(root, base)?],
            ..DiffResult::default()
        });
    }

    let dirs = find_page_dirs(root);
    if dirs.is_empty() {
        return Err(SyncError::NotTracked(root.to_path_buf()));
    }

    let mut result = DiffResult::default();
    for dir in &dirs {
        match diff_page(dir, base) {
            Ok(diff) => result.pages.push(diff),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to diff page");
                result.errors.push(format!("{}: {e}", dir.display()));
            }
        }
    }

    if let DiffBase::Remote(store) = base
        && let Ok(top) = LocalPage::load(root)
    {
        match remote_only(store, top.id(), &result.pages) {
            Ok(missing) => result.remote_only = missing,
            Err(e) => {
                warn!(page_id = top.id(), error = %e, "Failed to list remote descendants");
                result
                    .errors
                    .push(format!("listing descendants of page {}: {e}", top.id()));
            }
        }
    }

    Ok(result)
}

/// Remote descendants of `page_id` that have no local directory.
fn remote_only(
    store: &dyn ContentStore,
    page_id: &str,
    pages: &[PageDiff],
) -> Result<Vec<RemoteOnly>, SyncError> {
    let local: HashSet<&str> = pages.iter().map(|p| p.page_id.as_str()).collect();
    let missing = store
        .get_descendant_ids(page_id)?
        .into_iter()
        .filter(|id| !local.contains(id.as_str()))
        .map(|page_id| {
            let title = store
                .get_page(&page_id)
                .map(|p| p.title)
                .unwrap_or_else(|e| {
                    warn!(page_id = %page_id, error = %e, "Failed to fetch title of remote page");
                    String::new()
                });
            RemoteOnly { page_id, title }
        })
        .collect();
    Ok(missing)
}
