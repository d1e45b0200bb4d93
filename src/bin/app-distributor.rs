//! App Distributor CLI
//!
//! Uploads a build artifact and distributes it to tester groups, as a
//! GitHub Actions step or from any shell.

use anyhow::Result;
use app_distributor::distribution::build_http_client;
use app_distributor::{
    ConfigLoadOptions, ConfigLoader, DistributionConfig, DistributionPipeline, Environment,
    GithubActionsEnvironment, ServiceAccountAuthenticator,
};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Upload a build to App Distribution and share it with testers
///
/// Every option can also be given as a step input (`INPUT_<NAME>`);
/// command-line flags take priority.
#[derive(Parser)]
#[command(name = "app-distributor")]
#[command(version)]
#[command(about = "Upload a build to App Distribution and share it with testers", long_about = None)]
struct Cli {
    /// Application id, e.g. 1:1234567890:android:0a1b2c3d4e5f
    #[arg(long)]
    app_id: Option<String>,

    /// Artifact to upload (absolute or relative to the working directory)
    #[arg(long)]
    file: Option<String>,

    /// Comma-separated tester group aliases
    #[arg(long)]
    groups: Option<String>,

    /// Release notes text
    #[arg(long)]
    release_notes: Option<String>,

    /// File holding release notes, used when --release-notes is absent
    #[arg(long)]
    release_notes_file: Option<String>,

    /// Path to a service account JSON key file
    #[arg(long)]
    service_credentials_file: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_seconds: Option<u64>,

    /// Root URL of the distribution API
    #[arg(long)]
    api_base_url: Option<String>,

    /// YAML config file (defaults to ./.app-distribution.yaml when present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory relative paths are resolved against
    #[arg(short = 'C', long, value_name = "DIR")]
    working_directory: Option<PathBuf>,
}

impl Cli {
    fn distribution_config(&self) -> DistributionConfig {
        DistributionConfig {
            service_credentials_file: self.service_credentials_file.clone(),
            app_id: self.app_id.clone(),
            file: self.file.clone(),
            groups: self.groups.clone(),
            release_notes: self.release_notes.clone(),
            release_notes_file: self.release_notes_file.clone(),
            timeout_seconds: self.timeout_seconds,
            api_base_url: self.api_base_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("{}", e);
    }

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

/// Structured diagnostics go to stderr; stdout carries workflow commands.
fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let environment = Arc::new(GithubActionsEnvironment::from_process());

    let working_dir = match &cli.working_directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    let options = ConfigLoadOptions {
        working_dir,
        config_path: cli.config.clone(),
        cli_args: cli.distribution_config(),
        env: std::env::vars().collect(),
    };

    let inputs = match ConfigLoader::load(options, environment.as_ref()).await {
        Ok(inputs) => inputs,
        Err(e) => {
            let message = e.to_string();
            environment.redact(&message);
            environment.fail(&message);
            for action in e.suggested_actions() {
                tracing::info!("hint: {}", action);
            }
            return Ok(1);
        }
    };

    let client = build_http_client(inputs.timeout)?;
    let mut pipeline = DistributionPipeline::new(
        environment.clone(),
        Arc::new(ServiceAccountAuthenticator::new(client.clone())),
        client,
    );

    match pipeline.execute(&inputs).await {
        Ok(report) => {
            tracing::info!(
                release = %report.release_name,
                distributed = report.distributed,
                duration_ms = report.duration,
                "distribution completed"
            );
            Ok(0)
        }
        Err(e) => {
            for action in e.suggested_actions() {
                tracing::info!("hint: {}", action);
            }
            tracing::debug!(history = %pipeline.history(), "pipeline history");
            Ok(1)
        }
    }
}
