//! Build State Management and Phase Tracking
//!
//! The orchestrator walks a fixed, linear sequence of phases:
//!
//! ```text
//! Preparation -> Fetching -> Unpacking -> Configuration -> Patching
//!             -> Building -> Harvesting -> Completed
//! ```
//!
//! Any phase except `Completed` may move to `Failed`. There is no resume:
//! a failed run is restarted from `Preparation` by a new invocation.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Build phase enumeration - discrete states in the build lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildPhaseState {
    /// Preflight checks before any network access
    Preparation,

    /// Downloading the pinned source archive
    Fetching,

    /// `tar xf` of the archive in the invocation directory
    Unpacking,

    /// Defconfig injection into the source tree
    Configuration,

    /// Local patch application
    Patching,

    /// make: defconfig, image/dtbs/modules, modules_install
    Building,

    /// Copying the kernel image and device trees to staging
    Harvesting,

    /// Build completed successfully
    Completed,

    /// Build failed; nothing is rolled back
    Failed,
}

impl BuildPhaseState {
    /// Get the human-readable name for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhaseState::Preparation => "preparation",
            BuildPhaseState::Fetching => "fetch",
            BuildPhaseState::Unpacking => "unpack",
            BuildPhaseState::Configuration => "configuration",
            BuildPhaseState::Patching => "patching",
            BuildPhaseState::Building => "compile",
            BuildPhaseState::Harvesting => "harvest",
            BuildPhaseState::Completed => "completed",
            BuildPhaseState::Failed => "failed",
        }
    }

    /// Get all valid phase transitions FROM this phase.
    pub fn valid_next_phases(&self) -> Vec<BuildPhaseState> {
        match self {
            BuildPhaseState::Preparation => vec![BuildPhaseState::Fetching, BuildPhaseState::Failed],
            BuildPhaseState::Fetching => vec![BuildPhaseState::Unpacking, BuildPhaseState::Failed],
            BuildPhaseState::Unpacking => vec![BuildPhaseState::Configuration, BuildPhaseState::Failed],
            BuildPhaseState::Configuration => vec![BuildPhaseState::Patching, BuildPhaseState::Failed],
            BuildPhaseState::Patching => vec![BuildPhaseState::Building, BuildPhaseState::Failed],
            BuildPhaseState::Building => vec![BuildPhaseState::Harvesting, BuildPhaseState::Failed],
            BuildPhaseState::Harvesting => vec![BuildPhaseState::Completed, BuildPhaseState::Failed],
            BuildPhaseState::Completed => vec![],
            BuildPhaseState::Failed => vec![],
        }
    }

    /// Check if a transition to the given phase is valid.
    pub fn can_transition_to(&self, next: BuildPhaseState) -> bool {
        self.valid_next_phases().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildPhaseState::Completed | BuildPhaseState::Failed)
    }

    /// Phase whose `as_str()` equals a `BuildError::stage()` name.
    pub fn from_stage(stage: &str) -> Option<BuildPhaseState> {
        [
            BuildPhaseState::Preparation,
            BuildPhaseState::Fetching,
            BuildPhaseState::Unpacking,
            BuildPhaseState::Configuration,
            BuildPhaseState::Patching,
            BuildPhaseState::Building,
            BuildPhaseState::Harvesting,
        ]
        .into_iter()
        .find(|phase| phase.as_str() == stage)
    }
}

/// Build execution state snapshot for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationState {
    /// Current build phase
    pub phase: BuildPhaseState,

    /// Phase the failure is attributed to
    pub failed_phase: Option<BuildPhaseState>,

    /// Number of patches applied
    pub patches_applied: u32,

    /// Number of artifacts copied to staging
    pub artifacts_harvested: u32,

    /// Build start timestamp
    pub start_time: SystemTime,

    /// Last phase update timestamp
    pub last_update_time: SystemTime,

    /// Error message if the run failed
    pub error: Option<String>,
}

impl Default for OrchestrationState {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestrationState {
    /// Create a new orchestration state for a build execution.
    pub fn new() -> Self {
        let now = SystemTime::now();
        OrchestrationState {
            phase: BuildPhaseState::Preparation,
            failed_phase: None,
            patches_applied: 0,
            artifacts_harvested: 0,
            start_time: now,
            last_update_time: now,
            error: None,
        }
    }

    /// Attempt to transition to the next phase.
    pub fn transition_to(&mut self, next_phase: BuildPhaseState) -> Result<(), String> {
        if !self.phase.can_transition_to(next_phase) {
            return Err(format!(
                "Invalid phase transition: {} -> {}",
                self.phase.as_str(),
                next_phase.as_str()
            ));
        }
        self.phase = next_phase;
        self.last_update_time = SystemTime::now();
        Ok(())
    }

    pub fn record_patches_applied(&mut self, count: usize) {
        self.patches_applied = u32::try_from(count).unwrap_or(u32::MAX);
    }

    pub fn record_artifacts_harvested(&mut self, count: usize) {
        self.artifacts_harvested = u32::try_from(count).unwrap_or(u32::MAX);
    }

    /// Record an error and mark the run as failed.
    ///
    /// Only the first error is kept; the phase it occurred in is remembered.
    pub fn record_error(&mut self, error: String) {
        let phase = self.phase;
        self.record_error_in(phase, error);
    }

    /// Record an error attributed to `phase`, which may differ from the
    /// current one when a later stage's check runs early.
    pub fn record_error_in(&mut self, phase: BuildPhaseState, error: String) {
        if self.phase.is_terminal() {
            return;
        }
        self.failed_phase = Some(phase);
        self.error = Some(error);
        self.phase = BuildPhaseState::Failed;
        self.last_update_time = SystemTime::now();
    }

    /// Get time elapsed since build start.
    pub fn elapsed_since_start(&self) -> Duration {
        self.start_time.elapsed().unwrap_or_default()
    }
}
