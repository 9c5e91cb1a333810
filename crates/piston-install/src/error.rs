use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error type returned by every public installer entry point.
#[derive(Debug, Error)]
pub enum InstallError {
    // Resolution (fatal)
    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("Manifest for {id} is corrupt: {reason}")]
    ManifestCorrupt { id: String, reason: String },

    #[error("Inheritance cycle detected: {}", chain.join(" -> "))]
    InheritanceCycle { chain: Vec<String> },

    #[error("Unsupported {loader} version {loader_version} for Minecraft {minecraft_version}: {reason}")]
    UnsupportedVersion {
        loader: String,
        minecraft_version: String,
        loader_version: String,
        reason: String,
    },

    #[error("Metadata request failed for {url}: {reason}")]
    Network { url: String, reason: String },

    // Post-processing (fatal)
    #[error("Failed to extract natives from {archive:?}: {reason}")]
    NativeExtraction { archive: PathBuf, reason: String },

    #[error("Post-processing step {task} failed: {reason}")]
    PostProcess { task: String, reason: String },

    // Session outcome
    #[error("Installation incomplete: {} task(s) failed ({})", failed.len(), FailedTask::summarize(failed))]
    InstallationIncomplete { failed: Vec<FailedTask> },

    #[error("Installation cancelled ({completed} task(s) finished, {remaining} left pending)")]
    Cancelled { completed: usize, remaining: usize },

    // Local I/O
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InstallError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(id: impl Into<String>, reason: impl fmt::Display) -> Self {
        InstallError::ManifestCorrupt {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Resolution errors abort before any file is fetched.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            InstallError::VersionNotFound(_)
                | InstallError::ManifestCorrupt { .. }
                | InstallError::InheritanceCycle { .. }
                | InstallError::UnsupportedVersion { .. }
                | InstallError::Network { .. }
        )
    }

    /// Ids of the tasks a caller may retry selectively.
    pub fn failed_task_ids(&self) -> Vec<String> {
        match self {
            InstallError::InstallationIncomplete { failed } => {
                failed.iter().map(|f| f.id.clone()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Failure of a single transfer attempt. Always retryable until the task's
/// attempt budget is spent.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },

    #[error("no data received from {url} for {secs}s")]
    Stalled { url: String, secs: u64 },

    #[error("SHA1 mismatch for {url}: expected {expected}, got {actual}")]
    HashMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("size mismatch for {url}: expected {expected} bytes, got {actual}")]
    SizeMismatch { url: String, expected: u64, actual: u64 },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A task that exhausted its attempts, as reported in
/// [`InstallError::InstallationIncomplete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTask {
    pub id: String,
    pub url: String,
    pub reason: String,
    pub attempts: u32,
}

impl FailedTask {
    fn summarize(failed: &[FailedTask]) -> String {
        const SHOWN: usize = 3;
        let mut ids: Vec<&str> = failed.iter().take(SHOWN).map(|f| f.id.as_str()).collect();
        if failed.len() > SHOWN {
            ids.push("...");
        }
        ids.join(", ")
    }
}

pub type InstallResult<T> = Result<T, InstallError>;
