//! Service account token exchange
//!
//! Implements the OAuth2 JWT-bearer grant: sign a short-lived assertion with
//! the service account's private key and trade it at the key's token URI
//! for an access token.

use crate::core::error::PipelineError;
use crate::core::traits::TokenSource;
use crate::security::credentials::ServiceAccountKey;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// OAuth scope granting access to the distribution API
pub const DISTRIBUTION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime in seconds (the token endpoint's maximum)
const ASSERTION_LIFETIME: i64 = 3600;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchanges service account keys for bearer tokens
pub struct ServiceAccountAuthenticator {
    client: reqwest::Client,
    scope: String,
}

impl ServiceAccountAuthenticator {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_scope(client, DISTRIBUTION_SCOPE)
    }

    pub fn with_scope(client: reqwest::Client, scope: impl Into<String>) -> Self {
        Self {
            client,
            scope: scope.into(),
        }
    }

    /// Build the signed JWT assertion for `key`
    fn sign_assertion(&self, key: &ServiceAccountKey) -> Result<String, PipelineError> {
        let private_key = key.private_key.as_ref().ok_or_else(|| {
            PipelineError::authentication("service account key has no private_key")
        })?;
        let client_email = key.client_email.as_deref().ok_or_else(|| {
            PipelineError::authentication("service account key has no client_email")
        })?;

        let encoding_key = EncodingKey::from_rsa_pem(private_key.expose_secret().as_bytes())
            .map_err(|e| {
                PipelineError::authentication(format!("invalid service account private key: {}", e))
            })?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = key.private_key_id.clone();

        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: client_email,
            scope: &self.scope,
            aud: &key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME,
        };

        encode(&header, &claims, &encoding_key).map_err(|e| {
            PipelineError::authentication(format!("failed to sign token assertion: {}", e))
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountAuthenticator {
    async fn access_token(&self, key: &ServiceAccountKey) -> Result<SecretString, PipelineError> {
        let assertion = self.sign_assertion(key)?;

        tracing::debug!(
            token_uri = %key.token_uri,
            client_email = key.client_email.as_deref().unwrap_or_default(),
            "requesting access token"
        );

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| PipelineError::authentication(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::authentication(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            PipelineError::authentication(format!("invalid token response: {}", e))
        })?;

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => {
                tracing::debug!(expires_in = ?token.expires_in, "access token obtained");
                Ok(SecretString::from(access_token))
            }
            _ => Err(PipelineError::authentication(
                "token endpoint returned an empty access token",
            )),
        }
    }
}
