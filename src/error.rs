//! Error types for Skiff
//!
//! Uses `thiserror` for library errors. The taxonomy follows the pipeline
//! stages: build failures (external toolchain exited non-zero), stage
//! failures (local filesystem), deploy failures (remote API call, tagged
//! with the step that failed). Every failure aborts the pipeline; nothing
//! is converted to a partial-success state.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Skiff operations
pub type SkiffResult<T> = Result<T, SkiffError>;

/// The deploy step a `DeployFailure` occurred in.
///
/// Steps execute strictly in declaration order; a failure aborts the
/// remaining steps with no rollback (redeploying is the recovery path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    PublishPrimary,
    PublishEdge,
    UploadStatic,
    PutDistribution,
    Invalidate,
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployStep::PublishPrimary => "publish-primary",
            DeployStep::PublishEdge => "publish-edge-version",
            DeployStep::UploadStatic => "upload-static",
            DeployStep::PutDistribution => "update-distribution",
            DeployStep::Invalidate => "invalidate",
        };
        f.write_str(name)
    }
}

/// Main error type for Skiff operations
#[derive(Error, Debug)]
pub enum SkiffError {
    /// External compiler or build tool exited non-zero. Diagnostics were
    /// already streamed through to the operator's terminal.
    #[error("failed to build '{entrypoint}': toolchain exited non-zero")]
    BuildFailure { entrypoint: String },

    /// A toolchain executable could not be started at all
    #[error("could not start '{program}': {source}")]
    ToolchainSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error while cleaning or copying staged output
    #[error("staging error at {path}: {source}")]
    StageFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A remote API call failed; carries the deploy step it happened in
    #[error("deploy failed at step '{step}': {message}")]
    DeployFailure { step: DeployStep, message: String },

    /// Topology construction produced overlapping or malformed rules
    #[error("invalid routing topology: {reason}")]
    InvalidTopology { reason: String },

    /// Invalid configuration file
    #[error("invalid configuration in {file}: {message}")]
    Config { file: PathBuf, message: String },

    /// Required configuration value missing
    #[error("missing configuration value '{key}' (set it in skiff.toml or via {env})")]
    MissingConfig { key: String, env: String },

    /// Another deploy holds the per-checkout lock
    #[error("another deploy is in progress (lock held at {path})")]
    LockHeld { path: PathBuf },

    /// Pipeline aborted by a cancellation signal between steps
    #[error("deploy cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
