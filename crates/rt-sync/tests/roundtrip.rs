//! Round-trip properties of pull and push against an in-memory Confluence.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use rt_confluence::MockContentStore;
use rt_sync::{
    DiffBase, DocumentState, PullOptions, Puller, PushOptions, Pusher, SyncError, diff_page,
    document_state,
};

const BODY: &str = r#"<h1>Runbook</h1><p>Restart with <code>systemctl restart app</code>&nbsp;&mdash; then check R&D logs.</p><ac:structured-macro ac:name="info"><ac:rich-text-body><p>Paged on-call only.</p></ac:rich-text-body></ac:structured-macro><ul><li>one</li><li>two</li></ul>"#;

fn store() -> MockContentStore {
    MockContentStore::new()
        .with_space("OPS", Some("100"))
        .with_page(MockContentStore::page("100", "Operations", "OPS", 7, BODY))
        .with_child(
            "100",
            MockContentStore::page("123", "Hello", "OPS", 1, "<p>Hello"),
        )
}

fn pull(store: &MockContentStore, root: &Path, page_id: &str) {
    Puller::new(store, root, PullOptions::default())
        .pull_page(page_id)
        .unwrap();
}

fn page_dir(root: &Path) -> PathBuf {
    root.join("OPS").join("Operations")
}

fn snapshot_files(dir: &Path) -> (String, String) {
    (
        fs::read_to_string(dir.join("page.xml")).unwrap(),
        fs::read_to_string(dir.join("page.json")).unwrap(),
    )
}

#[test]
fn pulling_partial_xml_closes_open_elements() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store();

    pull(&store, tmp.path(), "123");

    let xml = fs::read_to_string(tmp.path().join("OPS/Operations/Hello/page.xml")).unwrap();
    assert_eq!(xml, "<p>Hello</p>\n");
}

#[test]
fn push_after_pull_without_edits_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store();
    pull(&store, tmp.path(), "100");

    let result = Pusher::new(&store, PushOptions::default())
        .push(&[page_dir(tmp.path())], "no-op")
        .unwrap();

    assert_eq!(result.pages_updated, 0);
    assert_eq!(result.pages_skipped, 1);
    assert!(store.updates().is_empty());
}

#[test]
fn push_with_edit_requires_message() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store();
    pull(&store, tmp.path(), "100");
    let dir = page_dir(tmp.path());
    let xml = fs::read_to_string(dir.join("page.xml")).unwrap();
    fs::write(dir.join("page.xml"), xml.replace("one", "uno")).unwrap();

    let err = Pusher::new(&store, PushOptions::default())
        .push(&[dir.clone()], "  ")
        .unwrap_err();

    assert!(matches!(err, SyncError::Validation(_)));
    assert!(store.updates().is_empty());

    let result = Pusher::new(&store, PushOptions::default())
        .push(&[dir], "Translate list")
        .unwrap();
    assert_eq!(result.pages_updated, 1);
    assert_eq!(store.updates()[0].version, 8);
}

#[test]
fn pull_push_pull_is_byte_identical() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store();
    let dir = page_dir(tmp.path());

    pull(&store, tmp.path(), "100");
    let first = snapshot_files(&dir);

    Pusher::new(&store, PushOptions::default())
        .push(&[dir.clone()], "no-op")
        .unwrap();
    pull(&store, tmp.path(), "100");

    assert_eq!(snapshot_files(&dir), first);
}

#[test]
fn pushed_edit_survives_the_next_pull() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store();
    let dir = page_dir(tmp.path());
    pull(&store, tmp.path(), "100");

    let edited = fs::read_to_string(dir.join("page.xml"))
        .unwrap()
        .replace("Paged on-call only.", "Paged on-call and team lead.");
    fs::write(dir.join("page.xml"), &edited).unwrap();
    assert_eq!(document_state(tmp.path(), "100").unwrap(), DocumentState::Modified);

    Pusher::new(&store, PushOptions::default())
        .push(&[dir.clone()], "Widen paging")
        .unwrap();
    pull(&store, tmp.path(), "100");

    assert_eq!(fs::read_to_string(dir.join("page.xml")).unwrap(), edited);
    assert_eq!(document_state(tmp.path(), "100").unwrap(), DocumentState::Unchanged);
    assert!(
        diff_page(&dir, DiffBase::Remote(&store))
            .unwrap()
            .changes
            .is_empty()
    );
}

#[test]
fn formatted_snapshot_has_expected_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store();
    pull(&store, tmp.path(), "100");

    let xml = fs::read_to_string(page_dir(tmp.path()).join("page.xml")).unwrap();
    let expected = "\
<h1>Runbook</h1>
<p>Restart with <code>systemctl restart app</code>\u{a0}\u{2014} then check R&amp;D logs.</p>
<ac:structured-macro ac:name=\"info\">
  <ac:rich-text-body>
    <p>Paged on-call only.</p>
  </ac:rich-text-body>
</ac:structured-macro>
<ul>
  <li>one</li>
  <li>two</li>
</ul>
";
    assert_eq!(xml, expected);
}

#[test]
fn unsynced_until_pulled() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store();
    assert_eq!(document_state(tmp.path(), "100").unwrap(), DocumentState::Unsynced);
    pull(&store, tmp.path(), "100");
    assert_eq!(document_state(tmp.path(), "100").unwrap(), DocumentState::Unchanged);
}
