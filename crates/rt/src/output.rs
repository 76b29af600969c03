//! Colored terminal output utilities.

use std::io::{self, Write as _};
use std::process::{Command, Stdio};

use console::{Style, Term};
use tracing::warn;

/// Pager used when `$PAGER` is unset.
const DEFAULT_PAGER: &str = "less -R";

/// Terminal output formatter.
///
/// Messages go to stderr. Command results meant for piping (diffs, config
/// dumps) go to stdout.
pub(crate) struct Output {
    term: Term,
    stdout: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan: Style,
    cyan_bold: Style,
    bold: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            stdout: Term::stdout(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan: Style::new().cyan(),
            cyan_bold: Style::new().cyan().bold(),
            bold: Style::new().bold(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a highlighted message (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        let _ = self.term.write_line(&self.highlighted(msg));
    }

    /// Style a message as highlighted (cyan bold).
    pub(crate) fn highlighted(&self, msg: &str) -> String {
        self.cyan_bold.apply_to(msg).to_string()
    }

    /// Print plain text to stdout.
    pub(crate) fn print(&self, text: &str) {
        let _ = self.stdout.write_line(text.trim_end_matches('\n'));
    }

    /// Print a unified diff to stdout, colored by line kind.
    pub(crate) fn diff(&self, diff: &str) {
        self.print(&self.render_diff(diff));
    }

    /// Color a unified diff by line kind.
    pub(crate) fn render_diff(&self, diff: &str) -> String {
        let mut rendered = String::with_capacity(diff.len());
        for (kind, line) in classify_diff(diff) {
            let style = match kind {
                DiffLine::Header => &self.bold,
                DiffLine::Hunk => &self.cyan,
                DiffLine::Added => &self.green,
                DiffLine::Removed => &self.red,
                DiffLine::Context => {
                    rendered.push_str(line);
                    rendered.push('\n');
                    continue;
                }
            };
            rendered.push_str(&style.apply_to(line).to_string());
            rendered.push('\n');
        }
        rendered
    }

    /// Show text on stdout through `$PAGER` (default `less -R`).
    ///
    /// Prints directly when stdout is not a terminal, the pager is empty,
    /// or the pager fails.
    pub(crate) fn page(&self, text: &str) {
        let pager = std::env::var("PAGER").unwrap_or_else(|_| DEFAULT_PAGER.to_owned());
        if !self.stdout.is_term() || pager.trim().is_empty() {
            self.print(text);
            return;
        }
        if let Err(e) = run_pager(&pager, text) {
            warn!(pager = %pager, error = %e, "Pager failed, printing directly");
            self.print(text);
        }
    }

    /// Whether stderr is an interactive terminal that can answer prompts.
    pub(crate) fn is_interactive(&self) -> bool {
        self.term.is_term()
    }

    /// Ask a question and return the trimmed, lowercased answer.
    pub(crate) fn ask(&self, prompt: &str) -> std::io::Result<String> {
        self.term
            .write_str(&self.cyan_bold.apply_to(prompt).to_string())?;
        Ok(self.term.read_line()?.trim().to_lowercase())
    }
}

/// Pipe text into a pager command and wait for it to exit.
fn run_pager(pager: &str, text: &str) -> io::Result<()> {
    let mut words = pager.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty pager command"))?;
    let mut child = Command::new(program)
        .args(words)
        .stdin(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        // Quitting the pager early closes the pipe.
        if let Err(e) = stdin.write_all(text.as_bytes())
            && e.kind() != io::ErrorKind::BrokenPipe
        {
            return Err(e);
        }
    }

    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("pager exited with {status}")))
    }
}

/// Kind of a unified diff line.
#[derive(Debug, PartialEq, Eq)]
enum DiffLine {
    Header,
    Hunk,
    Added,
    Removed,
    Context,
}

/// Classify each line of a unified diff.
///
/// `---`/`+++` are file headers only outside a hunk. Inside a hunk the line
/// counts from the `@@` header decide where the hunk ends, so a removed line
/// starting with `--` stays a removal.
fn classify_diff(diff: &str) -> Vec<(DiffLine, &str)> {
    let mut old_left = 0usize;
    let mut new_left = 0usize;
    let mut lines = Vec::new();

    for line in diff.lines() {
        let kind = if old_left == 0 && new_left == 0 {
            if line.starts_with("---") || line.starts_with("+++") {
                DiffLine::Header
            } else if let Some((old, new)) = hunk_counts(line) {
                old_left = old;
                new_left = new;
                DiffLine::Hunk
            } else {
                DiffLine::Context
            }
        } else if line.starts_with('+') {
            new_left = new_left.saturating_sub(1);
            DiffLine::Added
        } else if line.starts_with('-') {
            old_left = old_left.saturating_sub(1);
            DiffLine::Removed
        } else if line.starts_with('\\') {
            // "\ No newline at end of file"
            DiffLine::Context
        } else {
            old_left = old_left.saturating_sub(1);
            new_left = new_left.saturating_sub(1);
            DiffLine::Context
        };
        lines.push((kind, line));
    }
    lines
}

/// Old and new line counts of a `@@ -a,b +c,d @@` header.
fn hunk_counts(line: &str) -> Option<(usize, usize)> {
    let ranges = line.strip_prefix("@@ ")?.split(" @@").next()?;
    let (old, new) = ranges.split_once(' ')?;
    Some((
        range_len(old.strip_prefix('-')?)?,
        range_len(new.strip_prefix('+')?)?,
    ))
}

/// Length of a `start,len` range; a bare `start` means one line.
fn range_len(range: &str) -> Option<usize> {
    match range.split_once(',') {
        Some((_, len)) => len.parse().ok(),
        None => range.parse::<usize>().ok().map(|_| 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn kinds(diff: &str) -> Vec<DiffLine> {
        classify_diff(diff).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn test_classify_diff_lines() {
        let diff = "--- a/page.xml\n+++ b/page.xml\n@@ -1,2 +1,2 @@\n <p>same</p>\n-<p>old</p>\n+<p>new</p>\n";
        assert_eq!(
            kinds(diff),
            vec![
                DiffLine::Header,
                DiffLine::Header,
                DiffLine::Hunk,
                DiffLine::Context,
                DiffLine::Removed,
                DiffLine::Added,
            ]
        );
    }

    #[test]
    fn test_removed_comment_line_is_not_a_header() {
        let diff = "--- a\n+++ b\n@@ -1,2 +1,1 @@\n--- old note -->\n+++ new note\n <p>x</p>\n";
        assert_eq!(
            kinds(diff),
            vec![
                DiffLine::Header,
                DiffLine::Header,
                DiffLine::Hunk,
                DiffLine::Removed,
                DiffLine::Added,
                DiffLine::Context,
            ]
        );
    }

    #[test]
    fn test_render_diff_keeps_every_line() {
        let diff = "--- a\n+++ b\n@@ -1 +1 @@\n-old\n+new\n";
        let rendered = Output::new().render_diff(diff);
        assert_eq!(console::strip_ansi_codes(&rendered), diff);
    }

    #[test]
    fn test_run_pager_pipes_text() {
        run_pager("cat", "line\n").unwrap();
    }

    #[test]
    fn test_run_pager_failures() {
        assert!(run_pager("", "x").is_err());
        assert!(run_pager("false", "x").is_err());
        assert!(run_pager("roundtripper-no-such-pager", "x").is_err());
    }

    #[test]
    fn test_hunk_counts() {
        assert_eq!(hunk_counts("@@ -1,3 +1,4 @@"), Some((3, 4)));
        assert_eq!(hunk_counts("@@ -5 +5,0 @@ ctx"), Some((1, 0)));
        assert_eq!(hunk_counts("<p>"), None);
    }
}
