//! Distribution Pipeline - Main orchestrator for a single run
//!
//! Runs the steps strictly in order:
//! - Credential parsing
//! - Token exchange
//! - Artifact resolution
//! - Upload
//! - Distribution (only when groups are configured)
//! - Reporting
//!
//! The first failing step aborts the run. Nothing is retried and an
//! uploaded release is never rolled back.

use crate::core::config::PipelineInputs;
use crate::core::error::PipelineError;
use crate::core::state_machine::{PipelineState, PipelineStateMachine};
use crate::core::traits::{DistributionReport, Environment, TokenSource};
use crate::distribution::{Artifact, Distributor, Uploader};
use crate::orchestration::reporter::Reporter;
use crate::security::credentials::ServiceAccountKey;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Instant;

/// Main distribution orchestrator
pub struct DistributionPipeline {
    environment: Arc<dyn Environment>,
    token_source: Arc<dyn TokenSource>,
    client: reqwest::Client,
    state_machine: PipelineStateMachine,
}

impl DistributionPipeline {
    /// Create a new pipeline
    ///
    /// # Arguments
    ///
    /// * `environment` - Host platform the run reports to
    /// * `token_source` - Exchanges the service account key for a bearer token
    /// * `client` - HTTP client used for upload and distribution
    pub fn new(
        environment: Arc<dyn Environment>,
        token_source: Arc<dyn TokenSource>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            environment,
            token_source,
            client,
            state_machine: PipelineStateMachine::new(),
        }
    }

    /// Current state of the last run
    pub fn state(&self) -> PipelineState {
        self.state_machine.get_state()
    }

    /// Transition history of the last run
    pub fn history(&self) -> String {
        self.state_machine.get_history()
    }

    /// Run the pipeline and report any failure to the environment
    ///
    /// The failure message is registered for redaction before it is
    /// surfaced, since upstream error bodies can echo request data.
    pub async fn execute(
        &mut self,
        inputs: &PipelineInputs,
    ) -> Result<DistributionReport, PipelineError> {
        match self.run(inputs).await {
            Ok(report) => Ok(report),
            Err(error) => {
                tracing::error!(code = error.code(), step = error.step(), "distribution failed");

                let message = error.to_string();
                self.environment.redact(&message);
                self.environment.fail(&message);
                Err(error)
            }
        }
    }

    /// Run every step without reporting failures
    ///
    /// A failing step still leaves the state machine in `Failed`.
    pub async fn run(
        &mut self,
        inputs: &PipelineInputs,
    ) -> Result<DistributionReport, PipelineError> {
        let result = self.run_steps(inputs).await;
        if result.is_err() {
            self.state_machine.fail();
        }
        result
    }

    async fn run_steps(
        &mut self,
        inputs: &PipelineInputs,
    ) -> Result<DistributionReport, PipelineError> {
        let start_time = Instant::now();
        self.state_machine = PipelineStateMachine::new();

        // 1. Credentials
        self.advance(PipelineState::ParsingCredentials);
        let key = ServiceAccountKey::from_json(inputs.service_credentials.expose_secret())?;
        if let Some(private_key) = &key.private_key {
            self.environment.redact(private_key.expose_secret());
        }

        // 2. Token
        self.advance(PipelineState::Authenticating);
        let token = self.token_source.access_token(&key).await?;
        self.environment.redact(token.expose_secret());

        // 3. Artifact
        self.advance(PipelineState::ResolvingArtifact);
        let artifact = Artifact::resolve(&inputs.file, &inputs.working_dir)?;

        // 4. Upload
        self.advance(PipelineState::Uploading);
        self.environment
            .start_group(&format!("Uploading {}", artifact.file_name));
        let uploaded = Uploader::new(self.client.clone(), inputs.api_base_url.as_str())
            .upload(&key.project_id, &inputs.app_id, &artifact, &token)
            .await;
        self.environment.end_group();
        let release_name = uploaded?;
        self.environment
            .log(&format!("Uploaded {} as {}", artifact.file_name, release_name));

        // 5. Distribution
        let distributed = if inputs.groups.is_empty() {
            self.environment
                .log("No tester groups configured, skipping distribution");
            false
        } else {
            self.advance(PipelineState::Distributing);
            self.environment
                .start_group(&format!("Distributing {}", release_name));
            let result = Distributor::new(self.client.clone(), inputs.api_base_url.as_str())
                .distribute(
                    &key.project_id,
                    &inputs.app_id,
                    &release_name,
                    &inputs.groups,
                    &inputs.release_notes,
                    &token,
                )
                .await;
            self.environment.end_group();
            result?;
            self.environment.log(&format!(
                "Distributed to {}",
                inputs.groups.names().join(", ")
            ));
            true
        };

        // 6. Report
        self.advance(PipelineState::Reporting);
        Reporter::report(
            self.environment.as_ref(),
            &inputs.app_id,
            &release_name,
            &inputs.groups,
        )?;

        self.advance(PipelineState::Succeeded);
        tracing::debug!(history = %self.state_machine.get_history(), "distribution finished");

        Ok(DistributionReport {
            app_id: inputs.app_id.clone(),
            release_name,
            groups: inputs.groups.names().to_vec(),
            distributed,
            duration: start_time.elapsed().as_millis() as u64,
        })
    }

    fn advance(&mut self, to: PipelineState) {
        if let Err(e) = self.state_machine.transition(to) {
            tracing::error!(error = %e, "pipeline step order violated");
        }
    }
}
