use crate::api;
use crate::cli::output::Output;
use crate::errors::{RestackError, Result};
use crate::git::{get_current_repository, Gateway};
use crate::restack::plan::RestackRequest;
use dialoguer::Confirm;
use std::path::PathBuf;

/// Apply a restack request read from a JSON file.
///
/// On success the backup branch is kept until the user confirms its
/// deletion (`--yes` confirms up front). On failure the executor has
/// already rolled back, unless the error says otherwise.
pub async fn run(request_path: PathBuf, yes: bool) -> Result<()> {
    let raw = std::fs::read_to_string(&request_path).map_err(|e| {
        RestackError::config(format!(
            "Could not read request file '{}': {e}",
            request_path.display()
        ))
    })?;
    let request: RestackRequest = serde_json::from_str(&raw).map_err(|e| {
        RestackError::parse(format!(
            "'{}' is not a valid restack request: {e}",
            request_path.display()
        ))
    })?;

    let repo = get_current_repository()?;

    Output::section("Applying restack");
    Output::sub_item(format!("Base: {}", request.base_branch));
    Output::sub_item(format!("New commits: {}", request.new_commits.len()));

    match api::apply_restack(&repo, &request) {
        Ok(response) => {
            Output::success(format!(
                "Restack complete: {} new commits",
                response.new_commit_hashes.len()
            ));
            for hash in &response.new_commit_hashes {
                Output::bullet(&hash[..12.min(hash.len())]);
            }

            cleanup_backup(&repo, &response.backup_branch, yes)?;
            Ok(())
        }
        Err(err @ RestackError::RollbackFailed { .. }) => {
            Output::error(&err);
            Output::warning("Manual recovery required; the backup branch holds the old state");
            Err(err)
        }
        Err(err) => {
            Output::error(&err);
            Err(err)
        }
    }
}

fn cleanup_backup(repo: &impl Gateway, backup_branch: &str, yes: bool) -> Result<()> {
    Output::sub_item(format!("Backup branch: {backup_branch}"));

    let delete = yes
        || Confirm::new()
            .with_prompt("Delete the backup branch?")
            .default(false)
            .interact()
            .unwrap_or(false);

    if delete {
        repo.delete_branch(backup_branch)?;
        Output::success("Backup branch deleted");
    } else {
        Output::tip(format!(
            "Recover the old history anytime with: git reset --hard {backup_branch}"
        ));
    }

    Ok(())
}
