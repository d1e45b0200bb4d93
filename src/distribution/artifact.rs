//! Artifact resolution
//!
//! Existence is checked once, before any network call. The file's content
//! is not inspected.

use crate::core::error::PipelineError;
use std::path::{Path, PathBuf};

/// Fallback upload name for paths without a final component
const FALLBACK_FILE_NAME: &str = "artifact";

/// A local build artifact ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path as given by the caller
    pub given: PathBuf,
    /// Absolute path
    pub path: PathBuf,
    /// Base name sent as the multipart file name
    pub file_name: String,
    /// Size in bytes at resolution time
    pub size: u64,
}

impl Artifact {
    /// Resolve `given` against `working_dir` and confirm a regular file exists there
    pub fn resolve(given: impl AsRef<Path>, working_dir: &Path) -> Result<Self, PipelineError> {
        let given = given.as_ref();
        let joined = working_dir.join(given);
        let path = std::path::absolute(&joined).unwrap_or(joined);

        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                return Err(PipelineError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());

        Ok(Self {
            given: given.to_path_buf(),
            path,
            file_name,
            size: metadata.len(),
        })
    }
}
