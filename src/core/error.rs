//! Error handling for the distribution pipeline
//!
//! Every pipeline step maps onto exactly one variant. All of them are fatal:
//! the orchestrator stops at the first error and reports it.

use thiserror::Error;

/// Main error type for distribution operations
#[derive(Error, Debug)]
pub enum PipelineError {
    // Configuration errors
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    // Credential errors
    #[error("Invalid service credentials: {message}")]
    CredentialParse { message: String },

    // Authentication errors
    #[error("Failed to obtain an access token: {message}")]
    Authentication { message: String },

    // Artifact errors
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // Upload errors
    #[error("Upload failed{}: {message}", format_status(.status))]
    Upload { status: Option<u16>, message: String },

    // Distribution errors
    #[error("Distribution failed{}: {message}", format_status(.status))]
    Distribution { status: Option<u16>, message: String },

    // Reporting errors
    #[error("Failed to write job summary: {message}")]
    Summary { message: String },
}

fn format_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn summary(message: impl Into<String>) -> Self {
        Self::Summary {
            message: message.into(),
        }
    }

    /// Name of the pipeline step this error belongs to
    pub fn step(&self) -> &'static str {
        match self {
            Self::Config { .. } => "configuration",
            Self::CredentialParse { .. } => "credentials",
            Self::Authentication { .. } => "authentication",
            Self::FileNotFound { .. } => "artifact",
            Self::Upload { .. } => "upload",
            Self::Distribution { .. } => "distribution",
            Self::Summary { .. } => "report",
        }
    }

    /// Upstream HTTP status, when the failure came from a remote response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upload { status, .. } | Self::Distribution { status, .. } => *status,
            _ => None,
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::Config { .. } => vec![
                "Check the step inputs in the workflow file",
                "Required inputs: serviceCredentialsFileContent, appId, file",
            ],
            Self::CredentialParse { .. } => vec![
                "Paste the full service account JSON key into the secret",
                "Make sure the secret is not base64 encoded",
            ],
            Self::Authentication { .. } => vec![
                "Check that the service account key has not been revoked",
                "Check that the service account has the App Distribution Admin role",
            ],
            Self::FileNotFound { .. } => vec![
                "Check that the build step produced the artifact",
                "Relative paths are resolved against the working directory",
            ],
            Self::Upload { status: Some(403), .. } | Self::Distribution { status: Some(403), .. } => {
                vec!["Check that the service account can access this project and app"]
            }
            Self::Upload { .. } => vec![
                "Check the app id and that the project has App Distribution enabled",
                "Check the network connection and try again",
            ],
            Self::Distribution { .. } => vec![
                "Check that every group alias exists in the project",
                "The release was uploaded and can be distributed manually",
            ],
            Self::Summary { .. } => {
                vec!["Check that GITHUB_OUTPUT and GITHUB_STEP_SUMMARY are writable"]
            }
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_INVALID",
            Self::CredentialParse { .. } => "CREDENTIAL_PARSE_FAILED",
            Self::Authentication { .. } => "AUTHENTICATION_FAILED",
            Self::FileNotFound { .. } => "FILE_NOT_FOUND",
            Self::Upload { .. } => "UPLOAD_FAILED",
            Self::Distribution { .. } => "DISTRIBUTION_FAILED",
            Self::Summary { .. } => "SUMMARY_FAILED",
        }
    }
}
