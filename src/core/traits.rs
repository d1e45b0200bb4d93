//! Core traits and types for app distribution
//!
//! This module defines the seams the pipeline depends on: the host CI
//! platform (`Environment`) and the bearer token exchange (`TokenSource`),
//! plus the small value types threaded through a run.

use crate::core::error::PipelineError;
use crate::security::credentials::ServiceAccountKey;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::io;

/// Release notes used when none are configured
pub const DEFAULT_RELEASE_NOTES: &str = "Distributed via GitHub Actions";

/// Name of the output carrying the release identifier
pub const RELEASE_NAME_OUTPUT: &str = "releaseName";

// ============================================================================
// Host platform
// ============================================================================

/// Capabilities the pipeline needs from the CI platform hosting it
///
/// The core never reads platform globals directly; everything goes through
/// this trait so tests can substitute an in-memory fake.
pub trait Environment: Send + Sync {
    /// Read a named step input. Blank values are reported as `None`.
    fn get_input(&self, name: &str) -> Option<String>;

    /// Publish a machine-readable step output
    fn set_output(&self, name: &str, value: &str) -> io::Result<()>;

    /// Mark the step as failed with a human-readable message
    fn fail(&self, message: &str);

    /// Write an informational log line
    fn log(&self, message: &str);

    /// Register a value that must never appear in logs
    fn redact(&self, secret: &str);

    /// Open a collapsible log group
    fn start_group(&self, name: &str);

    /// Close the innermost log group
    fn end_group(&self);

    /// Append markdown to the job summary
    fn write_summary(&self, markdown: &str) -> io::Result<()>;
}

// ============================================================================
// Authentication
// ============================================================================

/// Source of short-lived bearer tokens for the distribution API
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Exchange the service account key for a non-empty access token
    async fn access_token(&self, key: &ServiceAccountKey) -> Result<SecretString, PipelineError>;
}

// ============================================================================
// Groups
// ============================================================================

/// Normalized set of tester group aliases
///
/// An empty set means distribution is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSet(Vec<String>);

impl GroupSet {
    /// Parse a comma-separated list, trimming each name and dropping blanks
    pub fn parse(raw: Option<&str>) -> Self {
        let names = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        Self(names)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

// ============================================================================
// Reporting
// ============================================================================

/// Outcome of a successful pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionReport {
    pub app_id: String,
    pub release_name: String,
    pub groups: Vec<String>,
    pub distributed: bool,
    /// Wall-clock duration of the run in milliseconds
    pub duration: u64,
}
