use crate::errors::Result;

/// The only seam through which the restack engine touches repository
/// state. Every method maps to a single version-control operation; no
/// method performs multi-step logic, which is what keeps the executor
/// testable against a fake implementation.
pub trait Gateway {
    /// Hash of the commit HEAD currently points at.
    fn head(&self) -> Result<String>;

    /// Name of the current branch (or a detached-HEAD marker).
    fn current_branch(&self) -> Result<String>;

    /// True when neither the index nor the working tree has pending changes.
    fn is_clean(&self) -> Result<bool>;

    /// Create a branch pointing at `target` without switching to it.
    fn create_branch(&self, name: &str, target: &str) -> Result<()>;

    /// Delete a local branch.
    fn delete_branch(&self, name: &str) -> Result<()>;

    /// Hard-reset working tree, index and current branch to `reference`.
    fn reset_hard(&self, reference: &str) -> Result<()>;

    /// File content at a revision, `None` when the path does not exist there.
    fn file_at(&self, reference: &str, path: &str) -> Result<Option<String>>;

    /// Write a file in the working tree, creating parent directories.
    fn write_working_file(&self, path: &str, content: &str) -> Result<()>;

    /// Stage every change in the working tree.
    fn stage_all(&self) -> Result<()>;

    /// Commit the staged changes, returning the new commit hash.
    fn commit(&self, message: &str) -> Result<String>;
}
