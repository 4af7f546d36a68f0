/// Restack error types, one variant per failure phase
#[derive(Debug, thiserror::Error)]
pub enum RestackError {
    /// Git-related errors
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Diff parsing errors (only for inputs that cannot be degraded locally)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid or incomplete restack assignment, rejected before any mutation
    #[error("Plan error: {0}")]
    Plan(String),

    /// Precondition failure: uncommitted changes in the working tree
    #[error("Working tree has uncommitted changes; commit or stash them before restacking")]
    DirtyWorkingTree,

    /// Execution cancelled between steps; the repository was rolled back
    #[error("Restack cancelled; repository rolled back to its pre-restack state")]
    Cancelled,

    /// A repository operation failed mid-execution (rollback was attempted)
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Rollback after a failed restack also failed; manual recovery required
    #[error("Rollback failed ({reason}); pre-restack state is preserved on branch '{backup_ref}'")]
    RollbackFailed { backup_ref: String, reason: String },

    /// Configuration / environment errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RestackError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        RestackError::Config(msg.into())
    }

    pub fn parse<S: Into<String>>(msg: S) -> Self {
        RestackError::Parse(msg.into())
    }

    pub fn plan<S: Into<String>>(msg: S) -> Self {
        RestackError::Plan(msg.into())
    }

    pub fn gateway<S: Into<String>>(msg: S) -> Self {
        RestackError::Gateway(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RestackError>;
