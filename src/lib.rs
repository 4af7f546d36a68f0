pub mod api;
pub mod cli;
pub mod diff;
pub mod errors;
pub mod git;
pub mod restack;

pub use errors::RestackError;
