use crate::api;
use crate::cli::output::Output;
use crate::errors::Result;
use crate::git::{get_current_repository, Gateway};

/// Show repository overview and the detected restack range.
pub async fn run() -> Result<()> {
    Output::section("Repository");

    let repo = match get_current_repository() {
        Ok(repo) => repo,
        Err(_) => {
            Output::error("Not in a Git repository");
            return Ok(());
        }
    };

    Output::sub_item(format!("Path: {}", repo.path().display()));
    Output::sub_item(format!("Current branch: {}", repo.current_branch()?));
    Output::sub_item(format!("HEAD: {}", &repo.head()?[..12]));

    if repo.is_clean()? {
        Output::success("Working tree: clean");
    } else {
        Output::warning("Working tree: has uncommitted changes (restack will refuse to run)");
    }

    Output::section("Restack range");
    match api::detect_base_branch(&repo) {
        Some(base) => {
            let stack = api::list_commits(&repo, &base, "HEAD")?;
            Output::sub_item(format!("Base branch: {base}"));
            Output::sub_item(format!("Commits above base: {}", stack.len()));
            if stack.is_empty() {
                Output::info("Nothing to restack");
            } else {
                Output::tip("Run 'rk commits --lines' to inspect selectable lines");
            }
        }
        None => {
            Output::warning("No base branch detected (tried origin/main, origin/master, main, master)");
            Output::tip("Pass one explicitly: rk commits --base <ref>");
        }
    }

    Ok(())
}
