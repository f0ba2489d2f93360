//! gokrazy Raspberry Pi kernel builder
//!
//! Reproducibly cross-compiles the Raspberry Pi kernel image and its
//! device-tree blobs from a pinned upstream source snapshot.
//!
//! The system is organized into functional modules:
//! - **error**: Error type hierarchy, one enum per component
//! - **models**: Release source, workspace, toolchain environment, patch set, artifacts
//! - **system**: External tool execution (`ToolRunner`)
//! - **config**: Pinned build configuration and JSON overrides
//! - **kernel**: Source download, patch application, artifact harvest
//! - **orchestrator**: Stage sequencing and phase tracking
//! - **log_collector**: Run log persisted to disk and mirrored to stderr

// Core foundational modules
pub mod error;
pub mod models;

// External tool execution
pub mod system;

// Pinned build configuration
pub mod config;

// Robust, decoupled logging system
pub mod log_collector;

// Source, patches and artifacts
pub mod kernel;

// Build pipeline sequencing and state
pub mod orchestrator;

// Re-export the log crate for macro usage
pub use log;

// Re-export log collector for use throughout the system
pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

// Re-export error types for easy access
pub use error::{
    BuildError, ConfigError, FetchError, HarvestError, PatchError, Result, ToolError,
};

// Re-export model types for easy access
pub use models::{
    Artifact, ArtifactKind, BuildReport, BuildWorkspace, PatchSet, ReleaseSource,
    ToolchainEnvironment,
};

pub use config::BuildConfig;

pub use system::{SystemRunner, ToolInvocation, ToolRunner};

// Re-export orchestrator and state management
pub use orchestrator::{BuildOrchestrator, BuildPhaseState, OrchestrationState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(VERSION, "0.1.0");
    }

    #[test]
    fn test_error_reexport() {
        let _: Result<i32> = Ok(42);
    }

    #[test]
    fn test_enum_variants_accessible() {
        assert_eq!(BuildPhaseState::Preparation, BuildPhaseState::Preparation);
        assert_ne!(ArtifactKind::KernelImage, ArtifactKind::DeviceTree);
    }
}
