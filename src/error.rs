//! Unified error type hierarchy for the kernel build pipeline
//!
//! Provides structured error handling with FetchError, ToolError, PatchError,
//! HarvestError, ConfigError and the stage-tagged BuildError.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Source archive download errors.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid source URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP request for {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status code for {url}: got {status}, want 200")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("IO error while downloading {url}")]
    Io {
        url: String,
        #[source]
        source: io::Error,
    },
}

/// External tool invocation errors.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Command '{program}' could not be started")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Command '{program} {}' failed: {status}", .args.join(" "))]
    Failed {
        program: String,
        args: Vec<String>,
        status: ExitStatus,
    },
}

/// Kernel patch application errors.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Patch discovery in {dir} failed")]
    Discovery {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Patch file {patch} could not be opened")]
    Open {
        patch: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Patch {patch} failed to apply")]
    ApplyFailed {
        patch: PathBuf,
        #[source]
        source: ToolError,
    },
}

/// Build artifact harvesting errors.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Staging directory {dir} could not be created")]
    StagingDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Copying {src} -> {dest} failed")]
    Copy {
        src: PathBuf,
        dest: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Build pipeline errors, one variant per stage.
///
/// Every variant keeps its underlying cause as `source`, so printing the
/// error chain names both the failing stage and the root cause.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Preparation phase failed: {0}")]
    Preparation(String),

    #[error("Downloading kernel source failed")]
    Fetch(#[source] FetchError),

    #[error("Unpacking kernel source failed")]
    Unpack(#[source] ToolError),

    #[error("Copying defconfig {src} -> {dest} failed")]
    InjectConfig {
        src: PathBuf,
        dest: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Applying patches failed")]
    Patch(#[source] PatchError),

    #[error("make {target}")]
    Compile {
        target: String,
        #[source]
        source: ToolError,
    },

    #[error("Harvesting build artifacts failed")]
    Harvest(#[source] HarvestError),

    #[error("Invalid build state: {0}")]
    State(String),
}

impl BuildError {
    /// Name of the pipeline stage this error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            BuildError::Preparation(_) => "preparation",
            BuildError::Fetch(_) => "fetch",
            BuildError::Unpack(_) => "unpack",
            BuildError::InjectConfig { .. } => "configuration",
            BuildError::Patch(_) => "patching",
            BuildError::Compile { .. } => "compile",
            BuildError::Harvest(_) => "harvest",
            BuildError::State(_) => "state",
        }
    }
}

/// Top-level result type for pipeline operations.
pub type Result<T> = std::result::Result<T, BuildError>;
