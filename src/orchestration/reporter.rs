//! Reporter - job summary and step outputs for a finished run

use crate::core::error::PipelineError;
use crate::core::traits::{Environment, GroupSet, RELEASE_NAME_OUTPUT};

/// Emits the human-readable summary and the `releaseName` output
pub struct Reporter;

impl Reporter {
    /// Report a created release
    ///
    /// Any failure is fatal to the run.
    pub fn report(
        environment: &dyn Environment,
        app_id: &str,
        release_name: &str,
        groups: &GroupSet,
    ) -> Result<(), PipelineError> {
        environment
            .write_summary(&Self::summary_markdown(app_id, release_name, groups))
            .map_err(|e| PipelineError::summary(e.to_string()))?;

        environment
            .set_output(RELEASE_NAME_OUTPUT, release_name)
            .map_err(|e| PipelineError::summary(format!("failed to set {}: {}", RELEASE_NAME_OUTPUT, e)))?;

        environment.log(&format!("Release {} is ready", release_name));
        Ok(())
    }

    /// Markdown block appended to the job summary
    pub fn summary_markdown(app_id: &str, release_name: &str, groups: &GroupSet) -> String {
        let distributed_to = if groups.is_empty() {
            "_not distributed_".to_string()
        } else {
            groups
                .names()
                .iter()
                .map(|g| format!("`{}`", g))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "## App Distribution\n\n\
             | | |\n\
             |---|---|\n\
             | App | `{}` |\n\
             | Release | `{}` |\n\
             | Groups | {} |\n\n",
            app_id, release_name, distributed_to
        )
    }
}
