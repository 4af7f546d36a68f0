//! Transport-agnostic request/response boundary consumed by the UI layer.
//!
//! Three operations: list the commit stack with parsed diffs, fetch a
//! file's content at a commit (with parent fallback), and apply a restack
//! request end to end.

use crate::diff::units::{explode_commit, ChangeUnit};
use crate::errors::{RestackError, Result};
use crate::git::history::{list_commits as fetch_history, StackCommit};
use crate::git::repository::GitRepository;
use crate::restack::executor::RestackExecutor;
use crate::restack::plan::{plan, plan_operations, RestackOperation, RestackRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Base branches probed, in order, when the caller does not name one.
const BASE_CANDIDATES: [&str; 4] = ["origin/main", "origin/master", "main", "master"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContentResponse {
    pub content: String,
    /// True when the path was absent at the requested commit and the
    /// returned content is the parent commit's version.
    pub deleted_in_commit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    pub success: bool,
    pub new_commit_hashes: Vec<String>,
    pub backup_branch: String,
}

/// The commit stack for `base..head`, newest first.
pub fn list_commits(repo: &GitRepository, base: &str, head: &str) -> Result<Vec<StackCommit>> {
    fetch_history(repo, base, head)
}

/// All selectable line units of a fetched stack, in the given commit
/// order, then file, hunk and line order.
pub fn list_units(stack: &[StackCommit]) -> Vec<ChangeUnit> {
    stack.iter().flat_map(explode_commit).collect()
}

/// A file's content at a commit. When the path does not exist there (the
/// commit deleted it), falls back to the parent commit's content and flags
/// the fallback.
pub fn get_file_at_commit(
    repo: &GitRepository,
    commit_hash: &str,
    path: &str,
) -> Result<FileContentResponse> {
    let commit = repo.resolve_commit(commit_hash)?;

    if let Some(content) = repo.file_at_commit(&commit, path)? {
        return Ok(FileContentResponse {
            content,
            deleted_in_commit: false,
        });
    }

    if commit.parent_count() > 0 {
        let parent = commit.parent(0)?;
        if let Some(content) = repo.file_at_commit(&parent, path)? {
            return Ok(FileContentResponse {
                content,
                deleted_in_commit: true,
            });
        }
    }

    Err(RestackError::config(format!(
        "'{path}' does not exist at {commit_hash} or its parent"
    )))
}

/// Apply a line-granularity restack request: re-fetch and re-parse the
/// range so unit ids are validated against the current repository state,
/// plan, then execute.
pub fn apply_restack(repo: &GitRepository, request: &RestackRequest) -> Result<ApplyResponse> {
    info!(
        "Restacking {} new commits onto {}",
        request.new_commits.len(),
        request.base_branch
    );

    let mut stack = fetch_history(repo, &request.base_branch, "HEAD")?;
    stack.reverse(); // oldest first, so units replay in the order they landed
    let units = list_units(&stack);
    let build_plan = plan(&units, &request.new_commits)?;

    let outcome = RestackExecutor::new(repo).execute(&build_plan, &request.base_branch)?;
    Ok(ApplyResponse {
        success: true,
        new_commit_hashes: outcome.new_commits,
        backup_branch: outcome.backup_branch,
    })
}

/// Apply hunk-granularity operations. Target index 0 is the first commit
/// above the base; each target keeps its original commit's message.
pub fn apply_operations(
    repo: &GitRepository,
    base: &str,
    operations: &[RestackOperation],
) -> Result<ApplyResponse> {
    info!("Restacking {} hunk operations onto {}", operations.len(), base);

    let mut stack = fetch_history(repo, base, "HEAD")?;
    stack.reverse(); // oldest first, so indices line up with application order
    let build_plan = plan_operations(&stack, operations)?;

    let outcome = RestackExecutor::new(repo).execute(&build_plan, base)?;
    Ok(ApplyResponse {
        success: true,
        new_commit_hashes: outcome.new_commits,
        backup_branch: outcome.backup_branch,
    })
}

/// Probe the usual base branch names and return the first that resolves.
pub fn detect_base_branch(repo: &GitRepository) -> Option<String> {
    BASE_CANDIDATES
        .iter()
        .find(|name| repo.reference_exists(name))
        .map(|name| name.to_string())
}
