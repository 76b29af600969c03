//! Local workspace layout.
//!
//! Each pulled page lives in its own directory:
//!
//! ```text
//! <output>/<SPACE>/<ancestor>/.../<title>/
//!     page.xml                 formatted storage body (working copy)
//!     page.json                page API response at pull time
//!     attachments/<file>       attachment content
//!     attachments/<file>.json  attachment metadata and SHA-256
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use rt_confluence::types::{Attachment, Page};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::changeset::ChangeSet;
use crate::error::SyncError;

/// Working copy file name.
pub const PAGE_XML: &str = "page.xml";
/// Snapshot metadata file name.
pub const PAGE_JSON: &str = "page.json";
/// Attachment directory name.
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Suffix of attachment metadata sidecars.
const SIDECAR_SUFFIX: &str = ".json";

/// Windows device names that cannot be used as file names.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Sync state of one page in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Never pulled, or the working copy is missing.
    Unsynced,
    /// Working copy matches the pulled snapshot.
    Unchanged,
    /// Working copy differs from the pulled snapshot.
    Modified,
}

/// Make a page or space title safe to use as a path component.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced
        .trim_start_matches(' ')
        .trim_end_matches([' ', '.']);
    if trimmed.is_empty() {
        return "_".to_owned();
    }

    let stem = trimmed.split('.').next().unwrap_or(trimmed);
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        return format!("_{trimmed}");
    }
    trimmed.to_owned()
}

/// Directory for a page: `output/SPACE/ancestors.../title`.
#[must_use]
pub fn build_page_path(
    output_dir: &Path,
    space_key: &str,
    ancestor_titles: &[String],
    title: &str,
) -> PathBuf {
    let mut path = output_dir.join(sanitize_filename(space_key));
    for ancestor in ancestor_titles {
        path.push(sanitize_filename(ancestor));
    }
    path.push(sanitize_filename(title));
    path
}

/// A pulled page directory.
#[derive(Debug, Clone)]
pub struct LocalPage {
    dir: PathBuf,
    snapshot: Page,
}

impl LocalPage {
    /// Load the snapshot metadata of a page directory.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotTracked`] if the directory has no `page.json`.
    pub fn load(dir: &Path) -> Result<Self, SyncError> {
        let json = dir.join(PAGE_JSON);
        if !json.is_file() {
            return Err(SyncError::NotTracked(dir.to_path_buf()));
        }
        let snapshot: Page = serde_json::from_str(&fs::read_to_string(&json)?)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            snapshot,
        })
    }

    /// Page directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Page ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.snapshot.id
    }

    /// Page title at pull time.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.snapshot.title
    }

    /// Version pulled.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.snapshot.version.number
    }

    /// Page as returned by the API at pull time.
    #[must_use]
    pub fn snapshot(&self) -> &Page {
        &self.snapshot
    }

    /// Path of the working copy.
    #[must_use]
    pub fn working_copy_path(&self) -> PathBuf {
        self.dir.join(PAGE_XML)
    }

    /// Read the working copy.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `page.xml` is missing or unreadable.
    pub fn working_copy(&self) -> Result<String, SyncError> {
        Ok(fs::read_to_string(self.working_copy_path())?)
    }

    /// Compare the working copy with the pulled snapshot.
    ///
    /// A working copy that no longer parses counts as modified.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `page.xml` exists but cannot be read.
    pub fn state(&self) -> Result<DocumentState, SyncError> {
        if !self.working_copy_path().is_file() {
            return Ok(DocumentState::Unsynced);
        }
        let working = self.working_copy()?;
        match ChangeSet::compute(self.snapshot.storage_value(), &working) {
            Ok(changes) if changes.is_empty() => Ok(DocumentState::Unchanged),
            Ok(_) => Ok(DocumentState::Modified),
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "Working copy does not parse");
                Ok(DocumentState::Modified)
            }
        }
    }
}

/// Write `page.xml` and `page.json` into `dir`, creating it if needed.
///
/// # Errors
///
/// Returns an error if the directory or files cannot be written.
pub fn save_page(dir: &Path, page: &Page, formatted: &str) -> Result<(), SyncError> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(PAGE_XML), formatted)?;
    let mut json = serde_json::to_string_pretty(page)?;
    json.push('\n');
    fs::write(dir.join(PAGE_JSON), json)?;
    Ok(())
}

/// Every page directory at or below `root`, in path order.
///
/// `attachments` directories are not descended into.
#[must_use]
pub fn find_page_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == ATTACHMENTS_DIR))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == PAGE_JSON)
        .filter_map(|e| e.path().parent().map(Path::to_path_buf))
        .collect();
    dirs.sort();
    dirs
}

/// Find the directory holding the pulled page `page_id`.
///
/// # Errors
///
/// Returns [`SyncError::PageNotPulled`] if no page directory has that ID.
pub fn find_page_dir(root: &Path, page_id: &str) -> Result<PathBuf, SyncError> {
    for dir in find_page_dirs(root) {
        match LocalPage::load(&dir) {
            Ok(page) if page.id() == page_id => return Ok(dir),
            Ok(_) => {}
            Err(e) => warn!(dir = %dir.display(), error = %e, "Skipping unreadable page metadata"),
        }
    }
    Err(SyncError::PageNotPulled {
        page_id: page_id.to_owned(),
        workspace: root.to_path_buf(),
    })
}

/// State of page `page_id` in the workspace rooted at `root`.
///
/// # Errors
///
/// Returns an I/O error if the page directory exists but cannot be read.
pub fn document_state(root: &Path, page_id: &str) -> Result<DocumentState, SyncError> {
    match find_page_dir(root, page_id) {
        Ok(dir) => LocalPage::load(&dir)?.state(),
        Err(SyncError::PageNotPulled { .. }) => Ok(DocumentState::Unsynced),
        Err(e) => Err(e),
    }
}

/// Metadata sidecar stored next to each attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentSidecar {
    /// Attachment as returned by the API.
    pub metadata: Attachment,
    /// SHA-256 of the content, hex encoded.
    pub sha256: String,
}

/// Path of the sidecar for an attachment file.
#[must_use]
pub fn sidecar_path(attachment_file: &Path) -> PathBuf {
    let mut name = attachment_file.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Whether a file in `attachments/` is the sidecar of another file there.
#[must_use]
pub fn is_sidecar(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(SIDECAR_SUFFIX))
        .is_some_and(|content| path.with_file_name(content).is_file())
}

/// Read a sidecar, treating a missing or unreadable one as absent.
#[must_use]
pub fn read_sidecar(attachment_file: &Path) -> Option<AttachmentSidecar> {
    let content = fs::read_to_string(sidecar_path(attachment_file)).ok()?;
    match serde_json::from_str(&content) {
        Ok(sidecar) => Some(sidecar),
        Err(e) => {
            warn!(file = %attachment_file.display(), error = %e, "Ignoring invalid attachment sidecar");
            None
        }
    }
}

/// Write attachment content and its sidecar.
///
/// # Errors
///
/// Returns an error if either file cannot be written.
pub fn save_attachment(
    attachments_dir: &Path,
    attachment: &Attachment,
    data: &[u8],
) -> Result<PathBuf, SyncError> {
    fs::create_dir_all(attachments_dir)?;
    let file = attachments_dir.join(sanitize_filename(&attachment.title));
    fs::write(&file, data)?;

    let sidecar = AttachmentSidecar {
        metadata: attachment.clone(),
        sha256: sha256_hex(data),
    };
    let mut json = serde_json::to_string_pretty(&sidecar)?;
    json.push('\n');
    fs::write(sidecar_path(&file), json)?;
    Ok(file)
}

/// SHA-256 of `data`, hex encoded.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
