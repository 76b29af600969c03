//! `roundtripper diff` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use rt_confluence::ConfluenceClient;
use rt_sync::workspace::PAGE_XML;
use rt_sync::{DiffBase, DiffResult, PageDiff, diff_tree};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the diff command.
#[derive(Args)]
pub(crate) struct DiffArgs {
    /// Page directory or workspace subtree (default: the whole workspace).
    #[arg(conflicts_with = "page_id")]
    path: Option<PathBuf>,

    /// Pulled page to diff.
    #[arg(short, long)]
    page_id: Option<String>,

    /// Compare against the current page on Confluence instead of the
    /// pulled snapshot.
    #[arg(long)]
    remote: bool,

    /// Include every page below the path.
    #[arg(short, long)]
    recursive: bool,

    /// Print the diff directly instead of through `$PAGER`.
    #[arg(long)]
    no_pager: bool,
}

impl DiffArgs {
    /// Execute the diff command.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing was pulled at the path, the page cannot
    /// be compared, or any page in a recursive diff failed.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        let config = super::load_config(config_path, None)?;

        // Without a target the whole workspace is diffed.
        let recursive = self.recursive || (self.path.is_none() && self.page_id.is_none());
        let target = super::resolve_target(&config, self.page_id.as_deref(), self.path)?;

        let client: Option<ConfluenceClient> = if self.remote {
            Some(super::connect(&config, &output)?)
        } else {
            None
        };
        let base = match &client {
            Some(client) => DiffBase::Remote(client),
            None => DiffBase::Snapshot,
        };

        let result = diff_tree(&target, recursive, base)?;
        let base_label = if self.remote { "remote" } else { "snapshot" };
        print_diff_result(&output, &result, base_label, !self.no_pager);
        super::finish(&output, &result.errors)
    }
}

fn print_diff_result(output: &Output, result: &DiffResult, base_label: &str, use_pager: bool) {
    let mut text = String::new();
    let mut changed = 0;
    for page in result.changed() {
        changed += 1;
        text.push_str(&render_page_diff(output, page, base_label));
    }

    if !text.is_empty() {
        if use_pager {
            output.page(&text);
        } else {
            output.print(&text);
        }
    }

    for page in &result.remote_only {
        output.warning(&format!(
            "Not pulled: {} (page {})",
            page.title, page.page_id
        ));
    }

    if changed == 0 && result.remote_only.is_empty() {
        output.success("No changes.");
    } else if changed > 0 {
        output.info(&format!("\n{changed} page(s) changed"));
    }
}

/// Heading and colored unified diff of one page.
fn render_page_diff(output: &Output, page: &PageDiff, base_label: &str) -> String {
    let file = page.dir.join(PAGE_XML);
    let (insertions, deletions) = page.changes.stats();
    let heading = output.highlighted(&format!(
        "{} (page {}): +{insertions} -{deletions}",
        page.title, page.page_id
    ));
    let diff = output.render_diff(&page.changes.unified_diff(
        &format!("{} ({base_label})", file.display()),
        &format!("{} (working copy)", file.display()),
    ));
    format!("\n{heading}\n{diff}")
}
