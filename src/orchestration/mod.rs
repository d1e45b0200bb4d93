//! Orchestration layer for app distribution
//!
//! This module sequences the pipeline steps and reports the outcome to the
//! host environment.

pub mod pipeline;
pub mod reporter;

// Re-export main types for convenience
pub use pipeline::DistributionPipeline;
pub use reporter::Reporter;
