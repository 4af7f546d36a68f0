use crate::errors::{RestackError, Result};
use crate::git::gateway::Gateway;
use git2::{DiffFindOptions, DiffFormat, DiffOptions, Oid, Repository, Signature};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Wrapper around git2::Repository with safe operations.
///
/// Implements [`Gateway`] for the restack executor and additionally
/// exposes the read-only history surface (commit walk, diff text, file at
/// revision) used to build the commit stack.
pub struct GitRepository {
    repo: Repository,
    path: PathBuf,
}

impl GitRepository {
    /// Open a Git repository at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| RestackError::config(format!("Not a git repository: {e}")))?;

        let workdir = repo
            .workdir()
            .ok_or_else(|| RestackError::config("Repository has no working directory"))?
            .to_path_buf();

        Ok(Self {
            repo,
            path: workdir,
        })
    }

    /// Get repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a reference (branch name, tag, or commit hash) to a commit
    pub fn resolve_commit(&self, reference: &str) -> Result<git2::Commit<'_>> {
        if let Ok(oid) = Oid::from_str(reference) {
            if let Ok(commit) = self.repo.find_commit(oid) {
                return Ok(commit);
            }
        }

        let obj = self.repo.revparse_single(reference).map_err(|e| {
            RestackError::config(format!("Could not resolve reference '{reference}': {e}"))
        })?;

        obj.peel_to_commit().map_err(|e| {
            RestackError::config(format!(
                "Reference '{reference}' does not point to a commit: {e}"
            ))
        })
    }

    /// Check whether a reference resolves at all (used for base detection)
    pub fn reference_exists(&self, reference: &str) -> bool {
        self.resolve_commit(reference).is_ok()
    }

    /// Commits in `base..head`, newest first
    pub fn commits_in_range(&self, base: &str, head: &str) -> Result<Vec<git2::Commit<'_>>> {
        let base_oid = self.resolve_commit(base)?.id();
        let head_oid = self.resolve_commit(head)?.id();

        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(head_oid)?;
        revwalk.hide(base_oid)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let oid = oid?;
            commits.push(self.repo.find_commit(oid)?);
        }

        Ok(commits)
    }

    /// Unified diff text of a commit against its first parent, with rename
    /// detection and 3 context lines, byte-for-byte what the diff parser
    /// expects.
    pub fn diff_text(&self, commit: &git2::Commit) -> Result<String> {
        let tree = commit.tree()?;
        let parent_tree = match commit.parent_count() {
            0 => None,
            _ => Some(commit.parent(0)?.tree()?),
        };

        let mut opts = DiffOptions::new();
        opts.context_lines(3);
        let mut diff =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let mut text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            match line.origin() {
                '+' | '-' | ' ' => text.push(line.origin()),
                _ => {}
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;

        Ok(text)
    }

    /// File content at a specific commit, `None` when the path is absent
    pub fn file_at_commit(&self, commit: &git2::Commit, path: &str) -> Result<Option<String>> {
        let tree = commit.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(RestackError::Git(e)),
        };

        let blob = self.repo.find_blob(entry.id())?;
        Ok(Some(String::from_utf8_lossy(blob.content()).into_owned()))
    }

    /// Get a signature for commits
    fn get_signature(&self) -> Result<Signature<'_>> {
        if let Ok(config) = self.repo.config() {
            if let (Ok(name), Ok(email)) = (
                config.get_string("user.name"),
                config.get_string("user.email"),
            ) {
                return Signature::now(&name, &email).map_err(RestackError::Git);
            }
        }

        // Fallback identity for repositories without user config
        Signature::now("Restack CLI", "restack@example.com").map_err(RestackError::Git)
    }
}

impl Gateway for GitRepository {
    fn head(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| RestackError::gateway(format!("Could not get HEAD: {e}")))?;
        let commit = head
            .peel_to_commit()
            .map_err(|e| RestackError::gateway(format!("Could not get HEAD commit: {e}")))?;
        Ok(commit.id().to_string())
    }

    fn current_branch(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| RestackError::gateway(format!("Could not get HEAD: {e}")))?;

        if let Some(name) = head.shorthand() {
            Ok(name.to_string())
        } else {
            // Detached HEAD - return commit hash
            let commit = head
                .peel_to_commit()
                .map_err(|e| RestackError::gateway(format!("Could not get HEAD commit: {e}")))?;
            Ok(format!("HEAD@{}", commit.id()))
        }
    }

    fn is_clean(&self) -> Result<bool> {
        let statuses = self.repo.statuses(None).map_err(RestackError::Git)?;

        for status in statuses.iter() {
            if status.status().intersects(
                git2::Status::INDEX_MODIFIED
                    | git2::Status::INDEX_NEW
                    | git2::Status::INDEX_DELETED
                    | git2::Status::INDEX_RENAMED
                    | git2::Status::INDEX_TYPECHANGE
                    | git2::Status::WT_MODIFIED
                    | git2::Status::WT_NEW
                    | git2::Status::WT_DELETED
                    | git2::Status::WT_RENAMED
                    | git2::Status::WT_TYPECHANGE
                    | git2::Status::CONFLICTED,
            ) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn create_branch(&self, name: &str, target: &str) -> Result<()> {
        let target_commit = self.resolve_commit(target)?;
        self.repo
            .branch(name, &target_commit, false)
            .map_err(|e| RestackError::gateway(format!("Could not create branch '{name}': {e}")))?;
        debug!("Created branch '{}'", name);
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .map_err(|e| RestackError::gateway(format!("Could not find branch '{name}': {e}")))?;
        branch
            .delete()
            .map_err(|e| RestackError::gateway(format!("Could not delete branch '{name}': {e}")))?;
        debug!("Deleted branch '{}'", name);
        Ok(())
    }

    fn reset_hard(&self, reference: &str) -> Result<()> {
        let target = self.resolve_commit(reference)?;
        let target_object = target.as_object();

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        self.repo
            .reset(target_object, git2::ResetType::Hard, Some(&mut checkout))
            .map_err(RestackError::Git)?;

        debug!("Hard reset to {}", reference);
        Ok(())
    }

    fn file_at(&self, reference: &str, path: &str) -> Result<Option<String>> {
        let commit = self.resolve_commit(reference)?;
        self.file_at_commit(&commit, path)
    }

    fn write_working_file(&self, path: &str, content: &str) -> Result<()> {
        let full_path = self.path.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full_path, content)?;
        debug!("Wrote {}", path);
        Ok(())
    }

    fn stage_all(&self) -> Result<()> {
        let mut index = self.repo.index().map_err(RestackError::Git)?;
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .map_err(RestackError::Git)?;
        // add_all does not pick up deletions; update_all does.
        index
            .update_all(["*"].iter(), None)
            .map_err(RestackError::Git)?;
        index.write().map_err(RestackError::Git)?;
        debug!("Staged all changes");
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String> {
        let signature = self.get_signature()?;

        let mut index = self.repo.index().map_err(RestackError::Git)?;
        let tree_id = index.write_tree().map_err(RestackError::Git)?;
        let tree = self.repo.find_tree(tree_id).map_err(RestackError::Git)?;

        let head = self.repo.head().map_err(RestackError::Git)?;
        let parent_commit = head.peel_to_commit().map_err(RestackError::Git)?;

        let commit_id = self
            .repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &[&parent_commit],
            )
            .map_err(RestackError::Git)?;

        debug!("Created commit: {} - {}", commit_id, message);
        Ok(commit_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path().to_path_buf();

        Command::new("git")
            .args(["init"])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.name", "Test"])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.email", "test@test.com"])
            .current_dir(&repo_path)
            .output()
            .unwrap();

        std::fs::write(repo_path.join("README.md"), "# Test\n").unwrap();
        Command::new("git")
            .args(["add", "."])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        Command::new("git")
            .args(["commit", "-m", "Initial commit"])
            .current_dir(&repo_path)
            .output()
            .unwrap();

        (temp_dir, repo_path)
    }

    fn create_commit(repo_path: &PathBuf, message: &str, filename: &str, content: &str) {
        std::fs::write(repo_path.join(filename), content).unwrap();
        Command::new("git")
            .args(["add", filename])
            .current_dir(repo_path)
            .output()
            .unwrap();
        Command::new("git")
            .args(["commit", "-m", message])
            .current_dir(repo_path)
            .output()
            .unwrap();
    }

    #[test]
    fn test_head_and_branch() {
        let (_temp_dir, repo_path) = create_test_repo();
        let repo = GitRepository::open(&repo_path).unwrap();

        let head = repo.head().unwrap();
        assert_eq!(head.len(), 40);

        let branch = repo.current_branch().unwrap();
        assert!(
            branch == "master" || branch == "main",
            "Expected default branch, got '{branch}'"
        );
    }

    #[test]
    fn test_is_clean_tracks_working_tree() {
        let (_temp_dir, repo_path) = create_test_repo();
        let repo = GitRepository::open(&repo_path).unwrap();

        assert!(repo.is_clean().unwrap());

        std::fs::write(repo_path.join("dirty.txt"), "x\n").unwrap();
        assert!(!repo.is_clean().unwrap());
    }

    #[test]
    fn test_is_clean_false_during_merge_conflict() {
        let (_temp_dir, repo_path) = create_test_repo();
        let repo = GitRepository::open(&repo_path).unwrap();
        let default_branch = repo.current_branch().unwrap();

        Command::new("git")
            .args(["checkout", "-b", "side"])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        create_commit(&repo_path, "Side edit", "README.md", "# Side\n");

        Command::new("git")
            .args(["checkout", &default_branch])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        create_commit(&repo_path, "Main edit", "README.md", "# Main\n");

        // Conflicting merge leaves CONFLICTED entries behind.
        Command::new("git")
            .args(["merge", "side"])
            .current_dir(&repo_path)
            .output()
            .unwrap();

        assert!(!repo.is_clean().unwrap());
    }

    #[test]
    fn test_commit_and_reset_hard() {
        let (_temp_dir, repo_path) = create_test_repo();
        let repo = GitRepository::open(&repo_path).unwrap();
        let initial_head = repo.head().unwrap();

        repo.write_working_file("new.txt", "hello\n").unwrap();
        repo.stage_all().unwrap();
        let new_hash = repo.commit("Add new.txt").unwrap();
        assert_eq!(repo.head().unwrap(), new_hash);

        repo.reset_hard(&initial_head).unwrap();
        assert_eq!(repo.head().unwrap(), initial_head);
        assert!(!repo_path.join("new.txt").exists());
        assert!(repo.is_clean().unwrap());
    }

    #[test]
    fn test_branch_create_and_delete() {
        let (_temp_dir, repo_path) = create_test_repo();
        let repo = GitRepository::open(&repo_path).unwrap();
        let head = repo.head().unwrap();

        repo.create_branch("backup-test-1", &head).unwrap();
        assert!(repo.reference_exists("backup-test-1"));

        repo.delete_branch("backup-test-1").unwrap();
        assert!(!repo.reference_exists("backup-test-1"));
    }

    #[test]
    fn test_file_at_revision() {
        let (_temp_dir, repo_path) = create_test_repo();
        create_commit(&repo_path, "Add data", "data.txt", "one\ntwo\n");
        let repo = GitRepository::open(&repo_path).unwrap();

        let content = repo.file_at("HEAD", "data.txt").unwrap();
        assert_eq!(content.as_deref(), Some("one\ntwo\n"));

        assert!(repo.file_at("HEAD", "missing.txt").unwrap().is_none());
    }

    #[test]
    fn test_commits_in_range_newest_first() {
        let (_temp_dir, repo_path) = create_test_repo();
        let repo = GitRepository::open(&repo_path).unwrap();
        let base = repo.head().unwrap();

        create_commit(&repo_path, "Second", "a.txt", "a\n");
        create_commit(&repo_path, "Third", "b.txt", "b\n");

        let commits = repo.commits_in_range(&base, "HEAD").unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].summary(), Some("Third"));
        assert_eq!(commits[1].summary(), Some("Second"));
    }

    #[test]
    fn test_diff_text_is_parseable_unified_diff() {
        let (_temp_dir, repo_path) = create_test_repo();
        create_commit(&repo_path, "Add data", "data.txt", "one\ntwo\n");
        let repo = GitRepository::open(&repo_path).unwrap();

        let head = repo.resolve_commit("HEAD").unwrap();
        let text = repo.diff_text(&head).unwrap();
        assert!(text.starts_with("diff --git a/data.txt b/data.txt"));
        assert!(text.contains("new file mode"));
        assert!(text.contains("@@ -0,0 +1,2 @@"));
        assert!(text.contains("+one\n+two\n"));

        let files = crate::diff::parse(&text);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "data.txt");
        assert_eq!(files[0].change_type, crate::diff::ChangeType::Added);
        assert_eq!(files[0].hunks[0].new_lines, 2);
    }

    #[test]
    fn test_stage_all_includes_deletions() {
        let (_temp_dir, repo_path) = create_test_repo();
        create_commit(&repo_path, "Add data", "data.txt", "one\n");
        let repo = GitRepository::open(&repo_path).unwrap();

        std::fs::remove_file(repo_path.join("data.txt")).unwrap();
        repo.stage_all().unwrap();
        repo.commit("Remove data").unwrap();

        assert!(repo.file_at("HEAD", "data.txt").unwrap().is_none());
        assert!(repo.is_clean().unwrap());
    }
}
