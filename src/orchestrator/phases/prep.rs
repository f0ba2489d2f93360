//! Preparation, unpack and configuration injection.
//!
//! These run before the source tree is patched:
//! - the defconfig must exist before anything is downloaded
//! - the archive is unpacked with `tar xf` in the invocation directory
//! - the board defconfig is copied into `arch/<arch>/configs/`

use crate::error::{BuildError, Result};
use crate::kernel::harvest::copy_file_preserving_mode;
use crate::models::BuildWorkspace;
use crate::system::{ToolInvocation, ToolRunner};
use std::io;
use std::path::{Path, PathBuf};

/// Check that the board defconfig is a readable regular file.
///
/// A missing defconfig is reported as a configuration-injection failure,
/// before any network access happens.
pub fn preflight_defconfig(defconfig: &Path, config_slot: &Path) -> Result<()> {
    log::debug!("[Build] [PREPARATION] checking defconfig {}", defconfig.display());

    let inject_err = |source: io::Error| BuildError::InjectConfig {
        src: defconfig.to_path_buf(),
        dest: config_slot.to_path_buf(),
        source,
    };

    let metadata = std::fs::metadata(defconfig).map_err(inject_err)?;
    if !metadata.is_file() {
        return Err(inject_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "defconfig is not a regular file",
        )));
    }
    Ok(())
}

/// Unpack `archive` with `tar xf` inside `work_dir`.
pub fn unpack_source(runner: &dyn ToolRunner, archive: &Path, work_dir: &Path) -> Result<()> {
    log::info!("[Build] unpacking {}", archive.display());
    let invocation = ToolInvocation::new("tar", work_dir)
        .arg("xf")
        .arg(archive.display().to_string());
    runner.run(invocation).map_err(BuildError::Unpack)
}

/// Copy the defconfig into the workspace under `defconfig_name`.
///
/// # Returns
/// The destination path inside the source tree.
pub fn inject_defconfig(
    workspace: &BuildWorkspace,
    defconfig: &Path,
    arch: &str,
    defconfig_name: &str,
) -> Result<PathBuf> {
    let dest = workspace.config_slot(arch, defconfig_name);
    log::info!("[Build] installing defconfig as {}", dest.display());

    copy_file_preserving_mode(defconfig, &dest).map_err(|e| BuildError::InjectConfig {
        src: defconfig.to_path_buf(),
        dest: dest.clone(),
        source: e,
    })?;
    Ok(dest)
}
