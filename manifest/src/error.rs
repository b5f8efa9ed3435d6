//! Error types for manifest loading and building.

use flagtree_core::RegistryError;
use thiserror::Error;

use crate::validate::ManifestIssue;

/// Errors that can occur while loading or building a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// File extension is neither JSON nor YAML.
    #[error("unsupported manifest format: {0}")]
    UnsupportedFormat(String),

    /// Structural problems found by [`validate_manifest`](crate::validate_manifest).
    #[error("invalid manifest: {}", join_issues(.0))]
    InvalidManifest(Vec<ManifestIssue>),

    /// A flag was rejected by a command's registry while building.
    #[error("command '{command}': {source}")]
    Registry {
        command: String,
        #[source]
        source: RegistryError,
    },
}

fn join_issues(issues: &[ManifestIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for results with [`ManifestError`].
pub type Result<T> = std::result::Result<T, ManifestError>;
