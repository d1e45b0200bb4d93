//! Service account credential parsing
//!
//! The credential blob is secret material end to end: parse errors only
//! report the error category and position, never the offending text.
//! Only `project_id` is required here; the signing fields are checked when
//! a token is requested.

use crate::core::error::PipelineError;
use secrecy::SecretString;
use serde::Deserialize;

/// Token endpoint used when the key does not name one
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Service account key as downloaded from the cloud console
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,

    pub project_id: String,

    #[serde(default)]
    pub private_key_id: Option<String>,

    #[serde(default)]
    pub private_key: Option<SecretString>,

    #[serde(default)]
    pub client_email: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse a service account key from its JSON text
    pub fn from_json(raw: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(raw).map_err(|e| {
            let kind = match e.classify() {
                serde_json::error::Category::Syntax => "not valid JSON, syntax error",
                serde_json::error::Category::Eof => "not valid JSON, unexpected end of input",
                serde_json::error::Category::Data => {
                    "missing required field project_id or a field has the wrong type"
                }
                serde_json::error::Category::Io => "read error",
            };

            PipelineError::CredentialParse {
                message: format!("{} at line {} column {}", kind, e.line(), e.column()),
            }
        })
    }
}

#[cfg(test)]
pub(crate) fn test_credentials_json(token_uri: &str) -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "demo-project",
        "private_key_id": "0123456789abcdef",
        "private_key": include_str!("../../tests/fixtures/test-service-account.pem"),
        "client_email": "uploader@demo-project.iam.gserviceaccount.com",
        "client_id": "111111111111111111111",
        "token_uri": token_uri,
    })
    .to_string()
}
