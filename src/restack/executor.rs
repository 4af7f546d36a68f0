use crate::errors::{RestackError, Result};
use crate::git::gateway::Gateway;
use crate::restack::patch::apply_mutations;
use crate::restack::plan::RestackPlan;
use chrono::Utc;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// The working tree, index and HEAD are one shared resource; two restacks
/// must never interleave within a process.
static EXECUTION_LOCK: Mutex<()> = Mutex::new(());

/// What a successful execution produced.
#[derive(Debug, Clone)]
pub struct RestackOutcome {
    /// New commit hashes, in application order.
    pub new_commits: Vec<String>,
    /// Backup branch pointing at the pre-restack HEAD. Left in place until
    /// the caller explicitly confirms deletion.
    pub backup_branch: String,
}

/// Drives a [`Gateway`] to realize a [`RestackPlan`]: snapshot, reset to
/// the base, replay each step as file mutations plus a commit, and roll
/// back to the snapshot on any failure.
pub struct RestackExecutor<'a, G: Gateway> {
    gateway: &'a G,
}

impl<'a, G: Gateway> RestackExecutor<'a, G> {
    pub fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    /// Execute the plan on top of `base_ref`.
    ///
    /// Atomicity contract: on a returned error (other than
    /// [`RestackError::RollbackFailed`]) the repository is exactly as it
    /// was before the call; on success the full new commit sequence is
    /// applied. No partial sequence is ever left behind.
    pub fn execute(&self, plan: &RestackPlan, base_ref: &str) -> Result<RestackOutcome> {
        self.execute_with_cancel(plan, base_ref, || false)
    }

    /// Like [`execute`](Self::execute), polling `cancelled` before each
    /// plan step. A positive poll aborts the replay with
    /// [`RestackError::Cancelled`] and rolls back; a commit already in
    /// progress is never interrupted.
    pub fn execute_with_cancel<F>(
        &self,
        plan: &RestackPlan,
        base_ref: &str,
        cancelled: F,
    ) -> Result<RestackOutcome>
    where
        F: Fn() -> bool,
    {
        let _guard = EXECUTION_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if plan.is_empty() {
            return Err(RestackError::plan("refusing to execute an empty plan"));
        }

        if !self.gateway.is_clean()? {
            return Err(RestackError::DirtyWorkingTree);
        }

        let original_head = self.gateway.head()?;
        let branch = self.gateway.current_branch()?;
        let backup_branch = format!("backup-{}-{}", branch, Utc::now().timestamp_millis());
        self.gateway.create_branch(&backup_branch, &original_head)?;
        info!(
            "Created backup branch '{}' at {}",
            backup_branch, original_head
        );

        match self.replay(plan, base_ref, &cancelled) {
            Ok(new_commits) => {
                info!("Restack complete: {} new commits", new_commits.len());
                Ok(RestackOutcome {
                    new_commits,
                    backup_branch,
                })
            }
            Err(cause) => Err(self.roll_back(&backup_branch, cause)),
        }
    }

    fn replay<F: Fn() -> bool>(
        &self,
        plan: &RestackPlan,
        base_ref: &str,
        cancelled: &F,
    ) -> Result<Vec<String>> {
        self.gateway.reset_hard(base_ref)?;
        debug!("Reset to base {}", base_ref);

        let mut new_commits = Vec::with_capacity(plan.steps.len());
        for (index, step) in plan.steps.iter().enumerate() {
            if cancelled() {
                return Err(RestackError::Cancelled);
            }
            debug!(
                "Applying step {}/{}: {}",
                index + 1,
                plan.steps.len(),
                step.message
            );

            for file in &step.files {
                let base = self.gateway.file_at("HEAD", &file.file_name)?;
                let next = apply_mutations(base.as_deref(), &file.mutations);
                self.gateway.write_working_file(&file.file_name, &next)?;
            }

            self.gateway.stage_all()?;
            let hash = self.gateway.commit(&step.message)?;
            debug!("Created commit {}", hash);
            new_commits.push(hash);
        }

        Ok(new_commits)
    }

    /// Restore the pre-restack state after a failed replay. A successful
    /// rollback consumes the backup branch; a failed one must surface the
    /// backup ref so a human can recover, never be swallowed.
    fn roll_back(&self, backup_branch: &str, cause: RestackError) -> RestackError {
        warn!("Restack failed ({}), rolling back", cause);

        if let Err(reset_err) = self.gateway.reset_hard(backup_branch) {
            return RestackError::RollbackFailed {
                backup_ref: backup_branch.to_string(),
                reason: reset_err.to_string(),
            };
        }

        if let Err(delete_err) = self.gateway.delete_branch(backup_branch) {
            // State is already restored; a stale backup branch is only noise.
            warn!(
                "Could not delete backup branch '{}': {}",
                backup_branch, delete_err
            );
        }

        match cause {
            // The variant already tells the whole story, including the rollback.
            RestackError::Cancelled => RestackError::Cancelled,
            cause => {
                RestackError::gateway(format!("{cause} (repository rolled back to pre-restack state)"))
            }
        }
    }
}
