pub mod apply;
pub mod commits;
pub mod status;
