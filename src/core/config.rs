//! Configuration structures and types for app-distributor
//!
//! `DistributionConfig` is the mergeable, partially-filled shape shared by
//! every configuration source. `PipelineInputs` is the fully resolved view
//! the pipeline runs on.

use crate::core::traits::GroupSet;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default root of the distribution API
pub const DEFAULT_API_BASE_URL: &str = "https://firebaseappdistribution.googleapis.com";

/// Default whole-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

/// Step input names, as declared by the action
pub mod inputs {
    pub const SERVICE_CREDENTIALS_FILE_CONTENT: &str = "serviceCredentialsFileContent";
    pub const SERVICE_CREDENTIALS_FILE: &str = "serviceCredentialsFile";
    pub const APP_ID: &str = "appId";
    pub const FILE: &str = "file";
    pub const GROUPS: &str = "groups";
    pub const RELEASE_NOTES: &str = "releaseNotes";
    pub const RELEASE_NOTES_FILE: &str = "releaseNotesFile";
    pub const TIMEOUT_SECONDS: &str = "timeoutSeconds";
    pub const API_BASE_URL: &str = "apiBaseUrl";
}

/// Partial configuration from a single source
///
/// Credentials content never appears here; it only arrives through the
/// step input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DistributionConfig {
    /// Path to a service account JSON key file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_credentials_file: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    /// Artifact path, absolute or relative to the working directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Comma-separated tester group aliases
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes_file: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}

/// Fully resolved inputs for one pipeline run
#[derive(Debug)]
pub struct PipelineInputs {
    /// Raw service account JSON
    pub service_credentials: SecretString,
    pub app_id: String,
    pub file: PathBuf,
    pub groups: GroupSet,
    pub release_notes: String,
    pub timeout: Duration,
    pub api_base_url: String,
    /// Directory relative artifact paths are resolved against
    pub working_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r#"
appId: "1:1234567890:android:abcdef"
file: build/app-release.apk
groups: "testers, qa"
timeoutSeconds: 120
"#;

        let config: DistributionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.app_id.as_deref(), Some("1:1234567890:android:abcdef"));
        assert_eq!(config.file.as_deref(), Some("build/app-release.apk"));
        assert_eq!(config.groups.as_deref(), Some("testers, qa"));
        assert_eq!(config.timeout_seconds, Some(120));
        assert_eq!(config.release_notes, None);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let yaml = "serviceCredentialsFileContent: \"{}\"\n";
        assert!(serde_yaml::from_str::<DistributionConfig>(yaml).is_err());
    }

    #[test]
    fn test_default_config_is_empty() {
        let config = DistributionConfig::default();
        assert_eq!(serde_json::to_string(&config).unwrap(), "{}");
    }
}
