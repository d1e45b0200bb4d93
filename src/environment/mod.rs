//! Host platform implementations of [`Environment`](crate::core::traits::Environment)

pub mod github_actions;
pub mod memory;

pub use github_actions::GithubActionsEnvironment;
pub use memory::MemoryEnvironment;
