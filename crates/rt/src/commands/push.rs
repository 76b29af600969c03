//! `roundtripper push` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use rt_sync::workspace::PAGE_XML;
use rt_sync::{Decision, PagePlan, PushOptions, PushResult, Pusher, validate_message};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the push command.
#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
#[command(group(
    clap::ArgGroup::new("target").required(true).args(["path", "page_id", "space_dir"])
))]
pub(crate) struct PushArgs {
    /// Page directory to push.
    path: Option<PathBuf>,

    /// Pulled page to push, looked up in the workspace.
    #[arg(short, long)]
    page_id: Option<String>,

    /// Push every page below this directory.
    #[arg(long)]
    space_dir: Option<PathBuf>,

    /// Version message recorded on Confluence.
    #[arg(short, long)]
    message: String,

    /// Include every page below the path.
    #[arg(short, long)]
    recursive: bool,

    /// Show what would be pushed without updating Confluence.
    #[arg(long)]
    dry_run: bool,

    /// Push even if the page changed on Confluence since it was pulled.
    #[arg(long)]
    force: bool,

    /// Do not ask for confirmation.
    #[arg(short, long)]
    yes: bool,
}

impl PushArgs {
    /// Execute the push command.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is blank, nothing was pulled at the
    /// target, or any page conflicted or failed.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        validate_message(&self.message)?;
        let config = super::load_config(config_path, None)?;

        let recursive = self.recursive || self.space_dir.is_some();
        let target = super::resolve_target(
            &config,
            self.page_id.as_deref(),
            self.path.or(self.space_dir),
        )?;
        let dirs = Pusher::collect(&target, recursive)?;

        let client = super::connect(&config, &output)?;
        let options = PushOptions {
            dry_run: self.dry_run,
            force: self.force,
        };
        let pusher = Pusher::new(&client, options);

        let plan = pusher.plan(&dirs, &self.message)?;
        if plan.pages.is_empty() {
            output.info("No page content to push.");
        } else if !self.yes && !self.dry_run && !output.is_interactive() {
            return Err(CliError::Validation(
                "confirmation needs an interactive terminal; pass --yes to push without asking"
                    .to_owned(),
            ));
        }

        let result = pusher.apply(plan, &self.message, |page| {
            if self.yes {
                Decision::Push
            } else {
                confirm(&output, page)
            }
        });

        print_push_result(&output, &result, self.dry_run);
        for conflict in &result.conflicts {
            output.warning(conflict);
        }
        if !result.conflicts.is_empty() {
            output.info("Pull the page again to merge, or pass --force to overwrite.");
        }
        super::finish(&output, &result.errors)?;
        if result.is_clean() {
            Ok(())
        } else {
            Err(CliError::Incomplete(format!(
                "{} page(s) changed on Confluence since they were pulled",
                result.conflicts.len()
            )))
        }
    }
}

/// Show the page's diff and ask whether to push it.
fn confirm(output: &Output, page: &PagePlan) -> Decision {
    let file = page.dir.join(PAGE_XML);
    output.highlight(&format!(
        "\n{} (v{} -> v{})",
        page.title,
        page.remote_version,
        page.remote_version + 1
    ));
    if page.is_forced() {
        output.warning(&format!(
            "Changed on Confluence since pull (local v{}), will be overwritten",
            page.local_version
        ));
    }
    output.diff(&page.changes.unified_diff(
        &format!("{} (remote)", file.display()),
        &format!("{} (working copy)", file.display()),
    ));

    loop {
        match output.ask("Push this page? [y/n/q] ") {
            Ok(answer) => {
                if let Some(decision) = parse_decision(&answer) {
                    return decision;
                }
                output.warning("Please answer y, n or q.");
            }
            Err(e) => {
                output.error(&format!("Cannot read answer: {e}"));
                return Decision::Quit;
            }
        }
    }
}

fn parse_decision(answer: &str) -> Option<Decision> {
    match answer {
        "y" | "yes" => Some(Decision::Push),
        "n" | "no" => Some(Decision::Skip),
        "q" | "quit" => Some(Decision::Quit),
        _ => None,
    }
}

fn print_push_result(output: &Output, result: &PushResult, dry_run: bool) {
    if dry_run {
        output.highlight("\n[DRY RUN] No changes made.");
    }
    let verb = if dry_run { "would be updated" } else { "updated" };
    output.success(&format!(
        "\nPages {verb}: {} ({} skipped)",
        result.pages_updated, result.pages_skipped
    ));
    if result.attachments_uploaded > 0 {
        let verb = if dry_run { "would be uploaded" } else { "uploaded" };
        output.info(&format!(
            "Attachments {verb}: {} ({} unchanged)",
            result.attachments_uploaded, result.attachments_skipped
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rt_sync::SyncError;

    fn args(path: PathBuf, message: &str) -> PushArgs {
        PushArgs {
            path: Some(path),
            page_id: None,
            space_dir: None,
            message: message.to_owned(),
            recursive: false,
            dry_run: false,
            force: false,
            yes: true,
        }
    }

    #[test]
    fn test_blank_message_rejected_before_config_and_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("roundtripper.toml");
        std::fs::write(&config_path, "").unwrap();

        let err = args(tmp.path().join("not-pulled"), "  ")
            .execute(Some(&config_path))
            .unwrap_err();

        assert!(matches!(err, CliError::Sync(SyncError::Validation(_))));
    }

    #[test]
    fn test_valid_message_moves_on_to_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("roundtripper.toml");
        std::fs::write(&config_path, "").unwrap();

        let err = args(tmp.path().join("not-pulled"), "Fix typo")
            .execute(Some(&config_path))
            .unwrap_err();

        assert!(matches!(err, CliError::Sync(SyncError::NotTracked(_))));
    }

    #[test]
    fn test_parse_decision() {
        assert_eq!(parse_decision("y"), Some(Decision::Push));
        assert_eq!(parse_decision("yes"), Some(Decision::Push));
        assert_eq!(parse_decision("n"), Some(Decision::Skip));
        assert_eq!(parse_decision("q"), Some(Decision::Quit));
        assert_eq!(parse_decision(""), None);
        assert_eq!(parse_decision("maybe"), None);
    }
}
