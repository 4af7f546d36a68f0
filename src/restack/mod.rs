//! Commit restacking engine
//!
//! Turns a user's unit-to-commit assignment into a deterministic build
//! plan, then replays that plan against the repository gateway with an
//! all-or-nothing failure contract:
//! - Planner: eager validation, grouping and ordering (no side effects)
//! - Patch: line-level file mutation
//! - Executor: snapshot, replay, rollback

pub mod executor;
pub mod patch;
pub mod plan;

pub use executor::{RestackExecutor, RestackOutcome};
pub use patch::apply_mutations;
pub use plan::{
    plan, plan_operations, FileMutations, LineMutation, PlanStep, RestackCommit, RestackOperation,
    RestackPlan, RestackRequest,
};
