//! GitHub Actions host environment
//!
//! Speaks the runner's workflow-command protocol on stdout and appends to
//! the `GITHUB_OUTPUT` and `GITHUB_STEP_SUMMARY` files.

use crate::core::traits::Environment;
use crate::security::SecretMasker;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const OUTPUT_FILE_VAR: &str = "GITHUB_OUTPUT";
const SUMMARY_FILE_VAR: &str = "GITHUB_STEP_SUMMARY";

/// Environment backed by the GitHub Actions runner
pub struct GithubActionsEnvironment {
    vars: HashMap<String, String>,
    masker: SecretMasker,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Default for GithubActionsEnvironment {
    fn default() -> Self {
        Self::from_process()
    }
}

impl GithubActionsEnvironment {
    /// Snapshot the process environment and write commands to stdout
    pub fn from_process() -> Self {
        Self::new(std::env::vars().collect(), Box::new(io::stdout()))
    }

    pub fn new(vars: HashMap<String, String>, writer: Box<dyn Write + Send>) -> Self {
        Self {
            vars,
            masker: SecretMasker::new(),
            writer: Mutex::new(writer),
        }
    }

    /// Environment variable that carries the input `name`
    pub fn input_var(name: &str) -> String {
        format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
    }

    fn emit(&self, line: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        // A closed stdout leaves nothing else to report to.
        let _ = writeln!(writer, "{}", line);
        let _ = writer.flush();
    }

    fn command(&self, name: &str, value: &str) {
        self.emit(&format!("::{}::{}", name, escape_data(value)));
    }

    fn file_from_var(&self, var: &str) -> Option<PathBuf> {
        self.vars
            .get(var)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
    }

    fn append(path: &Path, content: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(content.as_bytes())
    }
}

impl Environment for GithubActionsEnvironment {
    fn get_input(&self, name: &str) -> Option<String> {
        self.vars
            .get(&Self::input_var(name))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn set_output(&self, name: &str, value: &str) -> io::Result<()> {
        match self.file_from_var(OUTPUT_FILE_VAR) {
            Some(path) => {
                let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
                if name.contains(&delimiter) || value.contains(&delimiter) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "output value contains the heredoc delimiter",
                    ));
                }
                Self::append(&path, &format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
            }
            None => {
                self.emit(&format!(
                    "::set-output name={}::{}",
                    escape_property(name),
                    escape_data(value)
                ));
                Ok(())
            }
        }
    }

    fn fail(&self, message: &str) {
        self.command("error", message);
    }

    fn log(&self, message: &str) {
        self.emit(&self.masker.mask(message));
    }

    fn redact(&self, secret: &str) {
        if secret.trim().is_empty() {
            return;
        }
        self.masker.register(secret);
        self.command("add-mask", secret);
    }

    fn start_group(&self, name: &str) {
        self.command("group", &self.masker.mask(name));
    }

    fn end_group(&self) {
        self.emit("::endgroup::");
    }

    fn write_summary(&self, markdown: &str) -> io::Result<()> {
        match self.file_from_var(SUMMARY_FILE_VAR) {
            Some(path) => Self::append(&path, markdown),
            None => {
                tracing::debug!("{} not set, skipping job summary", SUMMARY_FILE_VAR);
                Ok(())
            }
        }
    }
}

/// Escape a workflow command value
fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escape a workflow command property
fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}
