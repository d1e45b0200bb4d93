//! Secret masking for log output
//!
//! Values registered here are replaced with `***` in any text passed
//! through [`SecretMasker::mask`]. Registered values are held as
//! `SecretString` so they never show up in debug output themselves.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::sync::RwLock;

/// Replacement text for masked values
pub const MASK: &str = "***";

/// Registry of secret values to scrub from log lines
///
/// # Examples
///
/// ```
/// use app_distributor::security::SecretMasker;
///
/// let masker = SecretMasker::new();
/// masker.register("ya29.secret-token");
/// assert_eq!(masker.mask("Bearer ya29.secret-token"), "Bearer ***");
/// ```
#[derive(Default)]
pub struct SecretMasker {
    secrets: RwLock<Vec<SecretString>>,
}

impl SecretMasker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value to be masked
    ///
    /// Multi-line values are also registered line by line, since log sinks
    /// usually print them one line at a time. Blank values are ignored.
    pub fn register(&self, value: &str) {
        let mut candidates: Vec<&str> = vec![value.trim()];
        if value.contains('\n') {
            candidates.extend(value.lines().map(str::trim));
        }

        let mut secrets = self.secrets.write().unwrap_or_else(|e| e.into_inner());
        for candidate in candidates {
            if candidate.is_empty() {
                continue;
            }
            if secrets.iter().any(|s| s.expose_secret() == candidate) {
                continue;
            }
            secrets.push(SecretString::from(candidate));
        }
    }

    /// Number of distinct registered values
    pub fn len(&self) -> usize {
        self.secrets.read().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace every registered value in `text` with `***`
    pub fn mask(&self, text: &str) -> String {
        let secrets = self.secrets.read().unwrap_or_else(|e| e.into_inner());
        if secrets.is_empty() {
            return text.to_string();
        }

        // Longest first so a secret containing another is masked whole.
        let mut patterns: Vec<&str> = secrets.iter().map(|s| s.expose_secret()).collect();
        patterns.sort_by_key(|p| std::cmp::Reverse(p.len()));

        let alternation = patterns
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");

        match Regex::new(&alternation) {
            Ok(regex) => regex.replace_all(text, MASK).into_owned(),
            // Pattern too large for the regex engine; fall back to plain replacement.
            Err(_) => patterns
                .iter()
                .fold(text.to_string(), |acc, p| acc.replace(p, MASK)),
        }
    }
}
