//! `roundtripper pull` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use rt_sync::{PullOptions, PullResult, Puller};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the pull command.
#[derive(Args)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["page_id", "space"])))]
pub(crate) struct PullArgs {
    /// Page to pull, with its descendants.
    #[arg(short, long)]
    page_id: Option<String>,

    /// Space to pull, starting at its homepage.
    #[arg(short, long)]
    space: Option<String>,

    /// Pull only the page itself, not its descendants.
    #[arg(long, conflicts_with = "space")]
    no_recursive: bool,

    /// Workspace directory (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show what would be downloaded without writing files.
    #[arg(long)]
    dry_run: bool,

    /// Overwrite working copies with local edits.
    #[arg(long)]
    force: bool,
}

impl PullArgs {
    /// Execute the pull command.
    ///
    /// # Errors
    ///
    /// Returns an error if the root page or space cannot be pulled, or if
    /// any page failed.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        let config = super::load_config(config_path, self.output)?;
        let client = super::connect(&config, &output)?;

        let options = PullOptions {
            recursive: !self.no_recursive,
            dry_run: self.dry_run,
            force: self.force,
        };
        let root = &config.workspace.output_dir;
        let puller = Puller::new(&client, root, options);

        let result = if let Some(space) = &self.space {
            output.info(&format!("Pulling space {space} into {}...", root.display()));
            puller.pull_space(space)?
        } else if let Some(page_id) = &self.page_id {
            output.info(&format!("Pulling page {page_id} into {}...", root.display()));
            puller.pull_page(page_id)?
        } else {
            return Err(CliError::Validation(
                "either --page-id or --space is required".to_owned(),
            ));
        };

        print_pull_result(&output, &result, self.dry_run);
        super::finish(&output, &result.errors)
    }
}

fn print_pull_result(output: &Output, result: &PullResult, dry_run: bool) {
    if dry_run {
        output.highlight("\n[DRY RUN] No files written.");
    }
    let verb = if dry_run { "would be downloaded" } else { "downloaded" };
    output.success(&format!(
        "\nPages {verb}: {} ({} up to date)",
        result.pages_downloaded, result.pages_skipped
    ));
    if result.attachments_downloaded > 0 || result.attachments_skipped > 0 {
        output.info(&format!(
            "Attachments {verb}: {} ({} up to date)",
            result.attachments_downloaded, result.attachments_skipped
        ));
    }
}
