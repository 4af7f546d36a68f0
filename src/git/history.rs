use crate::diff::{parse, FileChange};
use crate::errors::Result;
use crate::git::repository::GitRepository;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Immutable snapshot of one existing commit. Created by querying history,
/// never mutated, discarded when a new fetch supersedes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    pub hash: String,
    pub short_hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
    pub files_changed: Vec<String>,
}

/// One commit of the range being restacked, with its full diff against its
/// parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackCommit {
    pub commit: CommitRef,
    pub changes: Vec<FileChange>,
}

/// Fetch the commit stack for `base..head`, newest first, each commit
/// carrying its parsed diff.
pub fn list_commits(repo: &GitRepository, base: &str, head: &str) -> Result<Vec<StackCommit>> {
    let commits = repo.commits_in_range(base, head)?;
    debug!("Walking {} commits in {}..{}", commits.len(), base, head);

    let mut stack = Vec::with_capacity(commits.len());
    for commit in &commits {
        let diff_text = repo.diff_text(commit)?;
        let changes = parse(&diff_text);

        stack.push(StackCommit {
            commit: commit_ref(commit, &changes),
            changes,
        });
    }

    Ok(stack)
}

fn commit_ref(commit: &git2::Commit, changes: &[FileChange]) -> CommitRef {
    let hash = commit.id().to_string();
    let date = DateTime::from_timestamp(commit.time().seconds(), 0)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    CommitRef {
        short_hash: hash.chars().take(7).collect(),
        hash,
        author: commit.author().name().unwrap_or("unknown").to_string(),
        date,
        message: commit.summary().unwrap_or("").to_string(),
        files_changed: changes.iter().map(|c| c.file_name.clone()).collect(),
    }
}
