//! System module: external tool execution with a uniform status check

use crate::error::ToolError;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::models::ToolchainEnvironment;

/// One invocation of an external program.
///
/// The working directory is always explicit; the process-wide current
/// directory is never changed. `env` is merged over the inherited
/// environment. stdout/stderr are inherited so tool output reaches the
/// operator live.
#[derive(Debug)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub stdin: Option<File>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>, current_dir: &Path) -> Self {
        ToolInvocation {
            program: program.into(),
            args: Vec::new(),
            current_dir: current_dir.to_path_buf(),
            env: BTreeMap::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add the toolchain variables on top of the inherited environment.
    pub fn toolchain_env(mut self, env: &ToolchainEnvironment) -> Self {
        self.env
            .extend(env.vars().iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn stdin(mut self, file: File) -> Self {
        self.stdin = Some(file);
        self
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Capability to run an external tool to completion and check its status.
///
/// Every pipeline stage that shells out goes through this trait, so the
/// error wrapping is identical everywhere and tests can substitute a double.
pub trait ToolRunner {
    fn run(&self, invocation: ToolInvocation) -> Result<(), ToolError>;
}

/// Production runner backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: ToolInvocation) -> Result<(), ToolError> {
        log::debug!(
            "[System] Running '{}' in {}",
            invocation,
            invocation.current_dir.display()
        );

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.current_dir)
            .envs(&invocation.env)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        match invocation.stdin {
            Some(file) => {
                command.stdin(Stdio::from(file));
            }
            None => {
                command.stdin(Stdio::inherit());
            }
        }

        let status = command.status().map_err(|e| ToolError::Spawn {
            program: invocation.program.clone(),
            source: e,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ToolError::Failed {
                program: invocation.program,
                args: invocation.args,
                status,
            })
        }
    }
}
