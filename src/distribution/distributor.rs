//! Release distribution to tester groups

use crate::core::error::PipelineError;
use crate::core::traits::GroupSet;
use crate::distribution::endpoints::build_distribute_url;
use crate::distribution::failure_details;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DistributeRequest<'a> {
    group_names: &'a [String],
    release_notes: ReleaseNotes<'a>,
}

#[derive(Debug, Serialize)]
struct ReleaseNotes<'a> {
    text: &'a str,
}

/// Sends an uploaded release to tester groups
pub struct Distributor {
    client: reqwest::Client,
    base_url: String,
}

impl Distributor {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Distribute `release_name` to every group in `groups`
    ///
    /// Callers skip this step entirely for an empty group set.
    pub async fn distribute(
        &self,
        project_id: &str,
        app_id: &str,
        release_name: &str,
        groups: &GroupSet,
        release_notes: &str,
        token: &SecretString,
    ) -> Result<(), PipelineError> {
        let url = build_distribute_url(&self.base_url, project_id, app_id, release_name)?;
        let body = DistributeRequest {
            group_names: groups.names(),
            release_notes: ReleaseNotes {
                text: release_notes,
            },
        };

        tracing::info!(release = %release_name, groups = ?groups.names(), "distributing release");

        let response = self
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Distribution {
                status: None,
                message: e.without_url().to_string(),
            })?;

        if !response.status().is_success() {
            let (status, message) = failure_details(response).await;
            tracing::warn!(status, "distribution rejected");
            return Err(PipelineError::Distribution {
                status: Some(status),
                message,
            });
        }

        Ok(())
    }
}
