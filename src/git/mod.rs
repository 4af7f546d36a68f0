pub mod gateway;
pub mod history;
pub mod repository;

pub use gateway::Gateway;
pub use history::{list_commits, CommitRef, StackCommit};
pub use repository::GitRepository;

use crate::errors::{RestackError, Result};
use std::path::Path;

/// Find the root of the Git repository
pub fn find_repository_root(start_path: &Path) -> Result<std::path::PathBuf> {
    let repo = git2::Repository::discover(start_path).map_err(RestackError::Git)?;

    let workdir = repo
        .workdir()
        .ok_or_else(|| RestackError::config("Repository has no working directory (bare repo?)"))?;

    Ok(workdir.to_path_buf())
}

/// Get the current working directory as a Git repository
pub fn get_current_repository() -> Result<GitRepository> {
    let current_dir = std::env::current_dir()
        .map_err(|e| RestackError::config(format!("Could not get current directory: {e}")))?;

    let repo_root = find_repository_root(&current_dir)?;
    GitRepository::open(&repo_root)
}
