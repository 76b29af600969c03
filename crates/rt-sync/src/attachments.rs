//! Attachment download and upload.

use std::fs;
use std::path::Path;

use rt_confluence::ContentStore;
use rt_confluence::types::Attachment;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::pull::PullResult;
use crate::push::PushResult;
use crate::workspace::{
    ATTACHMENTS_DIR, is_sidecar, read_sidecar, sanitize_filename, save_attachment, sha256_hex,
};

/// Download new or updated attachments of a page into `page_dir/attachments`.
///
/// Failures are recorded in `result` and never abort the page.
pub(crate) fn pull_attachments(
    store: &dyn ContentStore,
    page_id: &str,
    page_dir: &Path,
    dry_run: bool,
    result: &mut PullResult,
) {
    let attachments = match store.get_attachments(page_id) {
        Ok(attachments) => attachments,
        Err(e) => {
            warn!(page_id, error = %e, "Failed to list attachments");
            result
                .errors
                .push(format!("listing attachments of page {page_id}: {e}"));
            return;
        }
    };

    let dir = page_dir.join(ATTACHMENTS_DIR);
    for attachment in &attachments {
        if is_current(&dir, attachment) {
            debug!(title = %attachment.title, "Attachment unchanged");
            result.attachments_skipped += 1;
            continue;
        }
        if dry_run {
            info!("Would download attachment: {}", attachment.title);
            result.attachments_downloaded += 1;
            continue;
        }
        match download(store, &dir, attachment) {
            Ok(()) => {
                info!("Downloaded attachment: {}", attachment.title);
                result.attachments_downloaded += 1;
            }
            Err(e) => {
                warn!(title = %attachment.title, error = %e, "Failed to download attachment");
                result
                    .errors
                    .push(format!("attachment '{}' of page {page_id}: {e}", attachment.title));
            }
        }
    }
}

/// Whether the local copy has the same attachment version.
fn is_current(dir: &Path, attachment: &Attachment) -> bool {
    let file = dir.join(sanitize_filename(&attachment.title));
    file.is_file()
        && read_sidecar(&file)
            .is_some_and(|s| s.metadata.version.number == attachment.version.number)
}

fn download(store: &dyn ContentStore, dir: &Path, attachment: &Attachment) -> Result<(), SyncError> {
    let data = store.download_attachment(attachment)?;
    save_attachment(dir, attachment, &data)?;
    Ok(())
}

/// Upload attachments whose content differs from the recorded hash.
///
/// Failures are recorded in `result` and never abort the page.
pub(crate) fn push_attachments(
    store: &dyn ContentStore,
    page_id: &str,
    page_dir: &Path,
    dry_run: bool,
    result: &mut PushResult,
) {
    let dir = page_dir.join(ATTACHMENTS_DIR);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(_) => {
            debug!(dir = %dir.display(), "No attachments directory");
            return;
        }
    };

    let mut files: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && !is_sidecar(p))
        .collect();
    files.sort();

    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match upload_if_changed(store, page_id, &dir, &file, dry_run) {
            Ok(true) => {
                if dry_run {
                    info!("Would upload attachment: {name}");
                } else {
                    info!("Uploaded attachment: {name}");
                }
                result.attachments_uploaded += 1;
            }
            Ok(false) => {
                debug!(name, "Attachment unchanged");
                result.attachments_skipped += 1;
            }
            Err(e) => {
                warn!(name, error = %e, "Failed to upload attachment");
                result
                    .errors
                    .push(format!("attachment '{name}' of page {page_id}: {e}"));
            }
        }
    }
}

/// Upload `file` unless its hash matches the sidecar. Returns whether an
/// upload was (or in a dry run, would be) made.
fn upload_if_changed(
    store: &dyn ContentStore,
    page_id: &str,
    dir: &Path,
    file: &Path,
    dry_run: bool,
) -> Result<bool, SyncError> {
    let data = fs::read(file)?;
    let sidecar = read_sidecar(file);
    if sidecar
        .as_ref()
        .is_some_and(|s| s.sha256 == sha256_hex(&data))
    {
        return Ok(false);
    }
    if dry_run {
        return Ok(true);
    }

    let filename = sidecar.as_ref().map_or_else(
        || {
            file.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        },
        |s| s.metadata.title.clone(),
    );
    let content_type = sidecar
        .as_ref()
        .and_then(|s| s.metadata.extensions.media_type.clone())
        .unwrap_or_else(|| content_type_for(file));

    let uploaded = store.upload_attachment(page_id, &filename, &data, &content_type)?;
    save_attachment(dir, &uploaded, &data)?;
    Ok(true)
}

/// Guess a MIME type from the file extension.
fn content_type_for(file: &Path) -> String {
    mime_guess::from_path(file)
        .first_or_octet_stream()
        .essence_str()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rt_confluence::MockContentStore;

    fn store() -> MockContentStore {
        MockContentStore::new()
            .with_attachment("1", "a.png", b"aaa")
            .with_attachment("1", "b.pdf", b"bbb")
    }

    #[test]
    fn test_pull_downloads_then_skips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();

        let mut first = PullResult::default();
        pull_attachments(&store, "1", tmp.path(), false, &mut first);
        assert_eq!(first.attachments_downloaded, 2);
        assert_eq!(
            fs::read(tmp.path().join("attachments/a.png")).unwrap(),
            b"aaa"
        );

        let mut second = PullResult::default();
        pull_attachments(&store, "1", tmp.path(), false, &mut second);
        assert_eq!(second.attachments_downloaded, 0);
        assert_eq!(second.attachments_skipped, 2);
        assert_eq!(store.downloads().len(), 2);
    }

    #[test]
    fn test_pull_dry_run_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut result = PullResult::default();
        pull_attachments(&store(), "1", tmp.path(), true, &mut result);
        assert_eq!(result.attachments_downloaded, 2);
        assert!(!tmp.path().join("attachments").exists());
    }

    #[test]
    fn test_pull_listing_failure_recorded() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store().with_failure("1", 500);
        let mut result = PullResult::default();
        pull_attachments(&store, "1", tmp.path(), false, &mut result);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_push_uploads_only_changed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();
        let mut pulled = PullResult::default();
        pull_attachments(&store, "1", tmp.path(), false, &mut pulled);

        fs::write(tmp.path().join("attachments/a.png"), b"changed").unwrap();
        fs::write(tmp.path().join("attachments/new.txt"), b"new").unwrap();

        let mut result = PushResult::default();
        push_attachments(&store, "1", tmp.path(), false, &mut result);

        assert_eq!(result.attachments_uploaded, 2);
        assert_eq!(result.attachments_skipped, 1);
        assert_eq!(
            store.uploads(),
            vec![
                ("1".to_owned(), "a.png".to_owned()),
                ("1".to_owned(), "new.txt".to_owned()),
            ]
        );

        let mut again = PushResult::default();
        push_attachments(&store, "1", tmp.path(), false, &mut again);
        assert_eq!(again.attachments_uploaded, 0);
        assert_eq!(again.attachments_skipped, 3);
    }

    #[test]
    fn test_push_dry_run_uploads_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("attachments")).unwrap();
        fs::write(tmp.path().join("attachments/new.txt"), b"new").unwrap();
        let store = store();

        let mut result = PushResult::default();
        push_attachments(&store, "1", tmp.path(), true, &mut result);

        assert_eq!(result.attachments_uploaded, 1);
        assert!(store.uploads().is_empty());
    }

    #[test]
    fn test_push_without_attachments_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut result = PushResult::default();
        push_attachments(&store(), "1", tmp.path(), false, &mut result);
        assert_eq!(result, PushResult::default());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("scan.tiff")), "image/tiff");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }
}
