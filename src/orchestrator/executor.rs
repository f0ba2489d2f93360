//! Compile stage: the three make invocations of a kernel build.
//!
//! 1. `make ARCH=<arch> <defconfig>` generates `.config`
//! 2. `make <image> dtbs modules -j<N>` builds the kernel, device trees and modules
//! 3. `make INSTALL_MOD_PATH=<staging> modules_install -j<N>` installs the modules
//!
//! Every step runs in the workspace root with the toolchain environment.

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::models::ToolchainEnvironment;
use crate::system::{ToolInvocation, ToolRunner};
use std::path::Path;

/// One make invocation of the compile stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeStep {
    /// Target(s) named in errors and logs
    pub target: String,
    /// Full argument list passed to make
    pub args: Vec<String>,
}

impl MakeStep {
    fn invocation(&self, workspace_root: &Path, env: &ToolchainEnvironment) -> ToolInvocation {
        ToolInvocation::new("make", workspace_root)
            .args(self.args.iter().cloned())
            .toolchain_env(env)
    }
}

/// The make steps for `config`, in execution order.
pub fn compile_steps(config: &BuildConfig, staging_dir: &Path, jobs: usize) -> Vec<MakeStep> {
    let jobs_arg = format!("-j{}", jobs);
    let image_targets = format!("{} dtbs modules", config.image_target);

    vec![
        MakeStep {
            target: config.defconfig_name.clone(),
            args: vec![format!("ARCH={}", config.arch), config.defconfig_name.clone()],
        },
        MakeStep {
            target: image_targets,
            args: vec![
                config.image_target.clone(),
                "dtbs".to_string(),
                "modules".to_string(),
                jobs_arg.clone(),
            ],
        },
        MakeStep {
            target: "modules_install".to_string(),
            args: vec![
                format!("INSTALL_MOD_PATH={}", staging_dir.display()),
                "modules_install".to_string(),
                jobs_arg,
            ],
        },
    ]
}

/// Run the compile stage, stopping at the first failing make step.
pub fn run_compile(
    runner: &dyn ToolRunner,
    config: &BuildConfig,
    workspace_root: &Path,
    env: &ToolchainEnvironment,
    staging_dir: &Path,
) -> Result<()> {
    let jobs = config.jobs();
    log::info!("[Build] compiling in {} with -j{}", workspace_root.display(), jobs);

    for step in compile_steps(config, staging_dir, jobs) {
        log::info!("[Build] make {}", step.args.join(" "));
        runner
            .run(step.invocation(workspace_root, env))
            .map_err(|e| BuildError::Compile {
                target: step.target.clone(),
                source: e,
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use std::os::unix::process::ExitStatusExt;
    use std::path::PathBuf;
    use std::process::ExitStatus;
    use std::sync::Mutex;

    /// Records invocations; fails when the argument list contains `fail_on`.
    struct MakeRecorder {
        fail_on: Option<&'static str>,
        calls: Mutex<Vec<ToolInvocation>>,
    }

    impl MakeRecorder {
        fn new(fail_on: Option<&'static str>) -> Self {
            MakeRecorder {
                fail_on,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ToolRunner for MakeRecorder {
        fn run(&self, invocation: ToolInvocation) -> std::result::Result<(), ToolError> {
            let fail = self
                .fail_on
                .map_or(false, |t| invocation.args.iter().any(|a| a == t));
            let program = invocation.program.clone();
            let args = invocation.args.clone();
            self.calls.lock().unwrap().push(invocation);
            if fail {
                return Err(ToolError::Failed {
                    program,
                    args,
                    status: ExitStatus::from_raw(2 << 8),
                });
            }
            Ok(())
        }
    }

    fn config_with_jobs(jobs: usize) -> BuildConfig {
        BuildConfig {
            jobs: Some(jobs),
            ..BuildConfig::default()
        }
    }

    #[test]
    fn test_compile_steps_default_config() {
        let steps = compile_steps(&config_with_jobs(8), Path::new("/tmp/buildresult"), 8);
        let rendered: Vec<String> = steps.iter().map(|s| s.args.join(" ")).collect();
        assert_eq!(
            rendered,
            vec![
                "ARCH=arm64 gooniebox_defconfig",
                "Image.gz dtbs modules -j8",
                "INSTALL_MOD_PATH=/tmp/buildresult modules_install -j8",
            ]
        );
        assert_eq!(steps[1].target, "Image.gz dtbs modules");
    }

    #[test]
    fn test_run_compile_uses_workspace_and_env() {
        let config = config_with_jobs(4);
        let env = config.toolchain_environment();
        let runner = MakeRecorder::new(None);
        let ws = PathBuf::from("/work/linux-abc");

        run_compile(&runner, &config, &ws, &env, Path::new("/stage")).unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for call in calls.iter() {
            assert_eq!(call.program, "make");
            assert_eq!(call.current_dir, ws);
            assert_eq!(call.env.get("CROSS_COMPILE").map(String::as_str), Some("aarch64-linux-gnu-"));
            assert_eq!(
                call.env.get("KBUILD_BUILD_TIMESTAMP").map(String::as_str),
                Some("Wed Mar  1 20:57:29 UTC 2017")
            );
        }
    }

    #[test]
    fn test_run_compile_stops_at_failing_step() {
        let config = config_with_jobs(2);
        let env = config.toolchain_environment();
        let runner = MakeRecorder::new(Some("dtbs"));

        let err = run_compile(&runner, &config, Path::new("/ws"), &env, Path::new("/stage")).unwrap_err();

        match err {
            BuildError::Compile { ref target, .. } => assert_eq!(target, "Image.gz dtbs modules"),
            ref other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.to_string(), "make Image.gz dtbs modules");
        assert_eq!(runner.calls.lock().unwrap().len(), 2);
    }
}
