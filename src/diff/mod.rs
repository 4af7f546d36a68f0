//! Unified-diff model
//!
//! This module implements the diff side of the restack engine:
//! - Parsing raw `git`-style unified diff text into structured file changes
//! - Deriving selectable change units (whole hunks or single edit lines)
//!   with session-scoped ids the planner can address

pub mod parser;
pub mod units;

pub use parser::{parse, ChangeType, DiffLine, FileChange, Hunk};
pub use units::{by_file, explode, explode_commit, ChangeUnit, LineKind};
