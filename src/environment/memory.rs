//! In-memory environment, used as the platform fake in tests

use crate::core::traits::Environment;
use crate::security::SecretMasker;
use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default, Clone)]
struct Recorded {
    outputs: HashMap<String, String>,
    logs: Vec<String>,
    failures: Vec<String>,
    redactions: Vec<String>,
    groups: Vec<String>,
    summary: String,
    events: Vec<String>,
}

/// Environment that records every interaction in memory
///
/// Log lines are stored after masking, the same way a real runner would
/// print them.
#[derive(Default)]
pub struct MemoryEnvironment {
    inputs: HashMap<String, String>,
    fail_summary: bool,
    masker: SecretMasker,
    recorded: Mutex<Recorded>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, name: &str, value: &str) -> Self {
        self.inputs.insert(name.to_string(), value.to_string());
        self
    }

    /// Make every `write_summary` call fail
    pub fn with_failing_summary(mut self) -> Self {
        self.fail_summary = true;
        self
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn output(&self, name: &str) -> Option<String> {
        self.recorded().outputs.get(name).cloned()
    }

    pub fn logs(&self) -> Vec<String> {
        self.recorded().logs.clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.recorded().failures.clone()
    }

    pub fn redactions(&self) -> Vec<String> {
        self.recorded().redactions.clone()
    }

    pub fn groups(&self) -> Vec<String> {
        self.recorded().groups.clone()
    }

    pub fn summary(&self) -> String {
        self.recorded().summary.clone()
    }

    /// Every interaction in call order, e.g. `redact:<value>` or `group:<name>`
    pub fn events(&self) -> Vec<String> {
        self.recorded().events.clone()
    }

    pub fn has_failed(&self) -> bool {
        !self.recorded().failures.is_empty()
    }
}

impl Environment for MemoryEnvironment {
    fn get_input(&self, name: &str) -> Option<String> {
        self.inputs
            .get(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn set_output(&self, name: &str, value: &str) -> io::Result<()> {
        let mut recorded = self.recorded();
        recorded.outputs.insert(name.to_string(), value.to_string());
        recorded.events.push(format!("output:{}", name));
        Ok(())
    }

    fn fail(&self, message: &str) {
        let mut recorded = self.recorded();
        recorded.failures.push(message.to_string());
        recorded.events.push("fail".to_string());
    }

    fn log(&self, message: &str) {
        let masked = self.masker.mask(message);
        let mut recorded = self.recorded();
        recorded.events.push(format!("log:{}", masked));
        recorded.logs.push(masked);
    }

    fn redact(&self, secret: &str) {
        self.masker.register(secret);
        let mut recorded = self.recorded();
        recorded.redactions.push(secret.to_string());
        recorded.events.push(format!("redact:{}", secret));
    }

    fn start_group(&self, name: &str) {
        let mut recorded = self.recorded();
        recorded.groups.push(name.to_string());
        recorded.events.push(format!("group:{}", name));
    }

    fn end_group(&self) {
        self.recorded().events.push("endgroup".to_string());
    }

    fn write_summary(&self, markdown: &str) -> io::Result<()> {
        if self.fail_summary {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "summary file is read-only",
            ));
        }
        let mut recorded = self.recorded();
        recorded.summary.push_str(markdown);
        recorded.events.push("summary".to_string());
        Ok(())
    }
}
