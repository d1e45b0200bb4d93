//! Configuration loader for app-distributor
//!
//! Resolves `PipelineInputs` from CLI flags, step inputs and an optional
//! YAML file, then fills in defaults.

use super::config::*;
use crate::core::error::PipelineError;
use crate::core::traits::{DEFAULT_RELEASE_NOTES, Environment, GroupSet};
use lazy_static::lazy_static;
use regex::Regex;
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Configuration file name
const CONFIG_FILENAME: &str = ".app-distribution.yaml";

lazy_static! {
    /// Environment variable pattern (${VAR_NAME})
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern");
}

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Directory for relative paths and the default config file
    pub working_dir: PathBuf,

    /// Explicit config file; it must exist when given
    pub config_path: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: DistributionConfig,

    /// Variables available to `${VAR}` expansion in the config file
    pub env: HashMap<String, String>,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load pipeline inputs from every source
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Step inputs from the environment
    /// 3. Config file (`--config` or ./.app-distribution.yaml)
    /// 4. Default values
    pub async fn load(
        options: ConfigLoadOptions,
        environment: &dyn Environment,
    ) -> Result<PipelineInputs, PipelineError> {
        let mut configs = Vec::new();

        // 3. Config file
        if let Some(file_config) =
            Self::load_file_config(&options.working_dir, options.config_path.as_deref()).await?
        {
            configs.push(Self::expand_env_vars(file_config, &options.env)?);
        }

        // 2. Step inputs
        configs.push(Self::load_input_config(environment)?);

        // Inline credentials rank with the step inputs: a CLI key file beats them
        let credentials = if options.cli_args.service_credentials_file.is_some() {
            None
        } else {
            environment.get_input(inputs::SERVICE_CREDENTIALS_FILE_CONTENT)
        };

        // 1. CLI arguments
        configs.push(options.cli_args);

        let merged = Self::merge_configs(configs);

        Self::resolve(merged, credentials, &options.working_dir).await
    }

    async fn load_file_config(
        working_dir: &Path,
        explicit: Option<&Path>,
    ) -> Result<Option<DistributionConfig>, PipelineError> {
        let path = match explicit {
            Some(path) => working_dir.join(path),
            None => {
                let default_path = working_dir.join(CONFIG_FILENAME);
                if !default_path.exists() {
                    return Ok(None);
                }
                default_path
            }
        };

        let content = fs::read_to_string(&path).await.map_err(|e| {
            PipelineError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: DistributionConfig = serde_yaml::from_str(&content).map_err(|e| {
            PipelineError::config(format!("Failed to parse YAML config {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(Some(config))
    }

    /// Read step inputs through the environment
    fn load_input_config(environment: &dyn Environment) -> Result<DistributionConfig, PipelineError> {
        let timeout_seconds = match environment.get_input(inputs::TIMEOUT_SECONDS) {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                PipelineError::config(format!(
                    "{} must be a whole number of seconds, got {:?}",
                    inputs::TIMEOUT_SECONDS,
                    raw
                ))
            })?),
            None => None,
        };

        Ok(DistributionConfig {
            service_credentials_file: environment.get_input(inputs::SERVICE_CREDENTIALS_FILE),
            app_id: environment.get_input(inputs::APP_ID),
            file: environment.get_input(inputs::FILE),
            groups: environment.get_input(inputs::GROUPS),
            release_notes: environment.get_input(inputs::RELEASE_NOTES),
            release_notes_file: environment.get_input(inputs::RELEASE_NOTES_FILE),
            timeout_seconds,
            api_base_url: environment.get_input(inputs::API_BASE_URL),
        })
    }

    /// Merge multiple configurations; later entries win
    fn merge_configs(configs: Vec<DistributionConfig>) -> DistributionConfig {
        let mut result = DistributionConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    fn merge_into(target: &mut DistributionConfig, source: DistributionConfig) {
        if source.service_credentials_file.is_some() {
            target.service_credentials_file = source.service_credentials_file;
        }
        if source.app_id.is_some() {
            target.app_id = source.app_id;
        }
        if source.file.is_some() {
            target.file = source.file;
        }
        if source.groups.is_some() {
            target.groups = source.groups;
        }
        if source.release_notes.is_some() {
            target.release_notes = source.release_notes;
        }
        if source.release_notes_file.is_some() {
            target.release_notes_file = source.release_notes_file;
        }
        if source.timeout_seconds.is_some() {
            target.timeout_seconds = source.timeout_seconds;
        }
        if source.api_base_url.is_some() {
            target.api_base_url = source.api_base_url;
        }
    }

    /// Expand `${VAR}` references in string fields of a file config
    fn expand_env_vars(
        mut config: DistributionConfig,
        env: &HashMap<String, String>,
    ) -> Result<DistributionConfig, PipelineError> {
        for field in [
            &mut config.service_credentials_file,
            &mut config.app_id,
            &mut config.file,
            &mut config.groups,
            &mut config.release_notes,
            &mut config.release_notes_file,
            &mut config.api_base_url,
        ] {
            if let Some(value) = field.as_mut() {
                *value = Self::expand_value(value, env)?;
            }
        }

        Ok(config)
    }

    fn expand_value(value: &str, env: &HashMap<String, String>) -> Result<String, PipelineError> {
        if let Some(missing) = ENV_VAR_PATTERN
            .captures_iter(value)
            .map(|caps| caps[1].to_string())
            .find(|name| !env.contains_key(name))
        {
            return Err(PipelineError::config(format!(
                "Undefined environment variable ${{{}}} in config file",
                missing
            )));
        }

        Ok(ENV_VAR_PATTERN
            .replace_all(value, |caps: &regex::Captures| env[&caps[1]].clone())
            .into_owned())
    }

    /// Check required fields and apply defaults
    async fn resolve(
        config: DistributionConfig,
        credentials: Option<String>,
        working_dir: &Path,
    ) -> Result<PipelineInputs, PipelineError> {
        let service_credentials = match (credentials, &config.service_credentials_file) {
            (Some(content), _) => content,
            (None, Some(path)) => Self::read_text(working_dir, path, "service credentials").await?,
            (None, None) => {
                return Err(PipelineError::config(format!(
                    "Input required and not supplied: {}",
                    inputs::SERVICE_CREDENTIALS_FILE_CONTENT
                )));
            }
        };

        let app_id = Self::required(config.app_id, inputs::APP_ID)?;
        let file = Self::required(config.file, inputs::FILE)?;

        let release_notes = match (config.release_notes, &config.release_notes_file) {
            (Some(notes), _) => notes,
            (None, Some(path)) => Self::read_text(working_dir, path, "release notes")
                .await?
                .trim_end()
                .to_string(),
            (None, None) => DEFAULT_RELEASE_NOTES.to_string(),
        };

        let timeout_seconds = config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        if timeout_seconds == 0 {
            return Err(PipelineError::config("timeoutSeconds must be greater than zero"));
        }

        Ok(PipelineInputs {
            service_credentials: SecretString::from(service_credentials),
            app_id,
            file: PathBuf::from(file),
            groups: GroupSet::parse(config.groups.as_deref()),
            release_notes,
            timeout: Duration::from_secs(timeout_seconds),
            api_base_url: config
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            working_dir: working_dir.to_path_buf(),
        })
    }

    fn required(value: Option<String>, name: &str) -> Result<String, PipelineError> {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| PipelineError::config(format!("Input required and not supplied: {}", name)))
    }

    async fn read_text(working_dir: &Path, path: &str, what: &str) -> Result<String, PipelineError> {
        let full_path = working_dir.join(path);
        fs::read_to_string(&full_path).await.map_err(|e| {
            PipelineError::config(format!(
                "Failed to read {} from {}: {}",
                what,
                full_path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MemoryEnvironment;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    fn required_inputs() -> MemoryEnvironment {
        MemoryEnvironment::new()
            .with_input(inputs::SERVICE_CREDENTIALS_FILE_CONTENT, r#"{"project_id":"p"}"#)
            .with_input(inputs::APP_ID, "1:123:android:abc")
            .with_input(inputs::FILE, "app.apk")
    }

    fn options(dir: &TempDir) -> ConfigLoadOptions {
        ConfigLoadOptions {
            working_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_load_from_inputs_with_defaults() {
        let dir = TempDir::new().unwrap();
        let env = required_inputs();

        let loaded = ConfigLoader::load(options(&dir), &env).await.unwrap();

        assert_eq!(loaded.service_credentials.expose_secret(), r#"{"project_id":"p"}"#);
        assert_eq!(loaded.app_id, "1:123:android:abc");
        assert_eq!(loaded.file, PathBuf::from("app.apk"));
        assert!(loaded.groups.is_empty());
        assert_eq!(loaded.release_notes, DEFAULT_RELEASE_NOTES);
        assert_eq!(loaded.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
        assert_eq!(loaded.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[tokio::test]
    async fn test_missing_required_input() {
        let dir = TempDir::new().unwrap();
        let env = MemoryEnvironment::new()
            .with_input(inputs::SERVICE_CREDENTIALS_FILE_CONTENT, "{}")
            .with_input(inputs::FILE, "app.apk");

        let err = ConfigLoader::load(options(&dir), &env).await.unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID");
        assert!(err.to_string().contains("appId"));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let dir = TempDir::new().unwrap();
        let env = MemoryEnvironment::new()
            .with_input(inputs::APP_ID, "app")
            .with_input(inputs::FILE, "app.apk");

        let err = ConfigLoader::load(options(&dir), &env).await.unwrap_err();
        assert!(err.to_string().contains("serviceCredentialsFileContent"));
    }

    #[tokio::test]
    async fn test_cli_overrides_inputs_and_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            "groups: from-file\nreleaseNotes: file notes\n",
        )
        .unwrap();

        let env = required_inputs().with_input(inputs::GROUPS, "from-input");
        let mut opts = options(&dir);
        opts.cli_args.groups = Some("from-cli, second".to_string());

        let loaded = ConfigLoader::load(opts, &env).await.unwrap();
        assert_eq!(
            loaded.groups.names(),
            &["from-cli".to_string(), "second".to_string()]
        );
        assert_eq!(loaded.release_notes, "file notes");
    }

    #[tokio::test]
    async fn test_config_file_env_expansion() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dist.yaml");
        std::fs::write(&path, "appId: \"${FIREBASE_APP_ID}\"\nfile: app.apk\n").unwrap();

        let env = MemoryEnvironment::new()
            .with_input(inputs::SERVICE_CREDENTIALS_FILE_CONTENT, "{}");
        let mut opts = options(&dir);
        opts.config_path = Some(PathBuf::from("dist.yaml"));
        opts.env
            .insert("FIREBASE_APP_ID".to_string(), "1:99:ios:ff".to_string());

        let loaded = ConfigLoader::load(opts, &env).await.unwrap();
        assert_eq!(loaded.app_id, "1:99:ios:ff");
    }

    #[tokio::test]
    async fn test_config_file_undefined_variable() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "appId: \"${NOPE}\"\n").unwrap();

        let err = ConfigLoader::load(options(&dir), &required_inputs())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("${NOPE}"));
    }

    #[tokio::test]
    async fn test_explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let mut opts = options(&dir);
        opts.config_path = Some(PathBuf::from("missing.yaml"));

        let err = ConfigLoader::load(opts, &required_inputs()).await.unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
    }

    #[tokio::test]
    async fn test_release_notes_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "Fixed the login crash\n").unwrap();

        let env = required_inputs().with_input(inputs::RELEASE_NOTES_FILE, "notes.txt");
        let loaded = ConfigLoader::load(options(&dir), &env).await.unwrap();
        assert_eq!(loaded.release_notes, "Fixed the login crash");
    }

    #[tokio::test]
    async fn test_release_notes_input_wins_over_file() {
        let dir = TempDir::new().unwrap();
        let env = required_inputs()
            .with_input(inputs::RELEASE_NOTES, "inline notes")
            .with_input(inputs::RELEASE_NOTES_FILE, "does-not-exist.txt");

        let loaded = ConfigLoader::load(options(&dir), &env).await.unwrap();
        assert_eq!(loaded.release_notes, "inline notes");
    }

    #[tokio::test]
    async fn test_credentials_from_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sa.json"), r#"{"project_id":"from-file"}"#).unwrap();

        let env = MemoryEnvironment::new()
            .with_input(inputs::SERVICE_CREDENTIALS_FILE, "sa.json")
            .with_input(inputs::APP_ID, "app")
            .with_input(inputs::FILE, "app.apk");

        let loaded = ConfigLoader::load(options(&dir), &env).await.unwrap();
        assert!(loaded.service_credentials.expose_secret().contains("from-file"));
    }

    #[tokio::test]
    async fn test_cli_credentials_file_wins_over_input_content() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cli.json"), r#"{"project_id":"from-cli"}"#).unwrap();

        let env = MemoryEnvironment::new()
            .with_input(inputs::SERVICE_CREDENTIALS_FILE_CONTENT, r#"{"project_id":"from-input"}"#)
            .with_input(inputs::APP_ID, "app")
            .with_input(inputs::FILE, "app.apk");
        let mut opts = options(&dir);
        opts.cli_args.service_credentials_file = Some("cli.json".to_string());

        let loaded = ConfigLoader::load(opts, &env).await.unwrap();
        assert!(loaded.service_credentials.expose_secret().contains("from-cli"));
    }

    #[tokio::test]
    async fn test_input_content_wins_over_config_file_credentials() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sa.json"), r#"{"project_id":"from-file"}"#).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "serviceCredentialsFile: sa.json
").unwrap();

        let loaded = ConfigLoader::load(options(&dir), &required_inputs()).await.unwrap();
        assert_eq!(loaded.service_credentials.expose_secret(), r#"{"project_id":"p"}"#);
    }

    #[tokio::test]
    async fn test_invalid_timeout_input() {
        let dir = TempDir::new().unwrap();
        let env = required_inputs().with_input(inputs::TIMEOUT_SECONDS, "ten");

        let err = ConfigLoader::load(options(&dir), &env).await.unwrap_err();
        assert!(err.to_string().contains("timeoutSeconds"));
    }

    #[test]
    fn test_expand_value_multiple_vars() {
        let mut env = HashMap::new();
        env.insert("A".to_string(), "x".to_string());
        env.insert("B_2".to_string(), "y".to_string());

        let expanded = ConfigLoader::expand_value("${A}-${B_2}-${A}", &env).unwrap();
        assert_eq!(expanded, "x-y-x");
    }
}
