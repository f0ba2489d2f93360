//! Build Orchestration: the linear kernel build pipeline
//! (Fetch -> Unpack -> Configuration -> Patching -> Compile -> Harvest).
//!
//! The orchestrator owns the invocation directory for one run. Tools that
//! operate on the source tree receive the workspace root as their explicit
//! working directory; the process current directory is never changed.
//! The first failing stage ends the run and nothing is cleaned up.

pub mod executor;
pub mod phases;
pub mod state;

use std::path::PathBuf;

pub use executor::{compile_steps, run_compile, MakeStep};
pub use state::{BuildPhaseState, OrchestrationState};

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::kernel::harvest::harvest_artifacts;
use crate::kernel::patcher::{discover_patches, KernelPatcher};
use crate::kernel::sources::fetch_source;
use crate::models::{BuildReport, BuildWorkspace};
use crate::system::ToolRunner;

/// Runs the kernel build pipeline for one invocation directory.
pub struct BuildOrchestrator<'r> {
    /// Pinned build configuration, fixed for the run
    config: BuildConfig,

    /// Invocation directory: archive, defconfig and patches live here
    work_dir: PathBuf,

    /// Executes tar, patch and make
    runner: &'r dyn ToolRunner,

    state: OrchestrationState,
}

impl<'r> BuildOrchestrator<'r> {
    /// Create a new orchestrator in the Preparation phase.
    ///
    /// # Arguments
    /// * `config` - Validated build configuration
    /// * `work_dir` - Invocation directory
    /// * `runner` - Tool runner used for every external program
    pub fn new(config: BuildConfig, work_dir: PathBuf, runner: &'r dyn ToolRunner) -> Self {
        BuildOrchestrator {
            config,
            work_dir,
            runner,
            state: OrchestrationState::new(),
        }
    }

    /// Snapshot of the phase tracking for this run.
    pub fn state(&self) -> &OrchestrationState {
        &self.state
    }

    pub fn current_phase(&self) -> BuildPhaseState {
        self.state.phase
    }

    /// Run every stage in order.
    ///
    /// On failure the error is recorded in the state under the phase named by
    /// `BuildError::stage()` and returned unchanged. A missing defconfig is
    /// caught before the download but recorded as a configuration failure.
    pub fn run(&mut self) -> Result<BuildReport> {
        match self.execute() {
            Ok(report) => Ok(report),
            Err(e) => {
                let phase = BuildPhaseState::from_stage(e.stage()).unwrap_or(self.state.phase);
                self.state.record_error_in(phase, e.to_string());
                Err(e)
            }
        }
    }

    fn transition_phase(&mut self, next_phase: BuildPhaseState) -> Result<()> {
        self.state
            .transition_to(next_phase)
            .map_err(BuildError::State)?;
        log::info!("[Build] phase: {}", next_phase.as_str());
        Ok(())
    }

    fn execute(&mut self) -> Result<BuildReport> {
        let runner = self.runner;
        let work_dir = self.work_dir.clone();

        let source = self
            .config
            .release_source()
            .map_err(|e| BuildError::Preparation(e.to_string()))?;
        let workspace = BuildWorkspace::new(&work_dir, &source, &self.config.workspace_prefix);
        let defconfig = work_dir.join(&self.config.defconfig_path);
        let config_slot = workspace.config_slot(&self.config.arch, &self.config.defconfig_name);
        let env = self.config.toolchain_environment();
        let staging_dir = self.config.staging_dir(&work_dir);

        log::info!("[Build] source: {}", source);
        log::info!("[Build] workspace: {}", workspace.root().display());
        phases::preflight_defconfig(&defconfig, &config_slot)?;

        self.transition_phase(BuildPhaseState::Fetching)?;
        let archive = fetch_source(&source, &work_dir).map_err(BuildError::Fetch)?;

        self.transition_phase(BuildPhaseState::Unpacking)?;
        phases::unpack_source(runner, &archive, &work_dir)?;

        self.transition_phase(BuildPhaseState::Configuration)?;
        phases::inject_defconfig(
            &workspace,
            &defconfig,
            &self.config.arch,
            &self.config.defconfig_name,
        )?;

        self.transition_phase(BuildPhaseState::Patching)?;
        let patches =
            discover_patches(&work_dir.join(&self.config.patch_dir)).map_err(BuildError::Patch)?;
        let patches_applied = KernelPatcher::new(workspace.root().to_path_buf())
            .apply_all(runner, &patches)
            .map_err(BuildError::Patch)?;
        self.state.record_patches_applied(patches_applied.len());

        self.transition_phase(BuildPhaseState::Building)?;
        run_compile(runner, &self.config, workspace.root(), &env, &staging_dir)?;

        self.transition_phase(BuildPhaseState::Harvesting)?;
        let artifacts = harvest_artifacts(
            workspace.root(),
            &staging_dir,
            &self.config.artifacts(&work_dir),
        )
        .map_err(BuildError::Harvest)?;
        self.state.record_artifacts_harvested(artifacts.len());

        self.transition_phase(BuildPhaseState::Completed)?;
        let elapsed = self.state.elapsed_since_start();
        log::info!(
            "[Build] done in {:.1}s: {} patch(es), {} artifact(s) in {}",
            elapsed.as_secs_f64(),
            patches_applied.len(),
            artifacts.len(),
            staging_dir.display()
        );

        Ok(BuildReport {
            workspace: workspace.root().to_path_buf(),
            patches_applied,
            artifacts,
            elapsed,
        })
    }
}
