//! Differences between two versions of a page body.

use similar::{ChangeTag, TextDiff};

use crate::xml::{XmlError, format_storage};

/// Lines of context around each hunk in unified diffs.
const CONTEXT_LINES: usize = 3;

/// Normalized difference between a base body and a working copy.
///
/// Both sides are run through [`format_storage`] first, so layout-only
/// differences never produce a non-empty change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    base: String,
    working: String,
}

impl ChangeSet {
    /// Compute the change from `base` to `working`.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] if either side cannot be normalized.
    pub fn compute(base: &str, working: &str) -> Result<Self, XmlError> {
        Ok(Self {
            base: format_storage(base)?,
            working: format_storage(working)?,
        })
    }

    /// Whether there is nothing to push.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base == self.working
    }

    /// Normalized base body.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Normalized working copy, the body that would be pushed.
    #[must_use]
    pub fn working(&self) -> &str {
        &self.working
    }

    /// Number of inserted and deleted lines.
    #[must_use]
    pub fn stats(&self) -> (usize, usize) {
        let diff = TextDiff::from_lines(&self.base, &self.working);
        diff.iter_all_changes()
            .fold((0, 0), |(ins, del), change| match change.tag() {
                ChangeTag::Insert => (ins + 1, del),
                ChangeTag::Delete => (ins, del + 1),
                ChangeTag::Equal => (ins, del),
            })
    }

    /// Unified diff with the given file labels, empty if unchanged.
    #[must_use]
    pub fn unified_diff(&self, base_label: &str, working_label: &str) -> String {
        if self.is_empty() {
            return String::new();
        }
        TextDiff::from_lines(&self.base, &self.working)
            .unified_diff()
            .context_radius(CONTEXT_LINES)
            .header(base_label, working_label)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_layout_only_change_is_empty() {
        let changes =
            ChangeSet::compute("<ul><li>a</li></ul>", "<ul>\n<li>a</li>\n</ul>").unwrap();
        assert!(changes.is_empty());
        assert_eq!(changes.stats(), (0, 0));
        assert_eq!(changes.unified_diff("a", "b"), "");
    }

    #[test]
    fn test_content_change() {
        let changes = ChangeSet::compute("<p>Hello</p>", "<p>Hello world</p>").unwrap();
        assert!(!changes.is_empty());
        assert_eq!(changes.stats(), (1, 1));
        assert_eq!(changes.working(), "<p>Hello world</p>\n");
    }

    #[test]
    fn test_unified_diff_output() {
        let changes =
            ChangeSet::compute("<p>one</p><p>two</p>", "<p>one</p><p>three</p>").unwrap();
        let diff = changes.unified_diff("remote", "local");
        assert!(diff.starts_with("--- remote\n+++ local\n"));
        assert!(diff.contains("-<p>two</p>\n"));
        assert!(diff.contains("+<p>three</p>\n"));
    }

    #[test]
    fn test_unparseable_side() {
        assert!(ChangeSet::compute("<p>x</p></div>", "<p>x</p>").is_err());
    }
}
