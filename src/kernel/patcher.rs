//! Local patch discovery and application.
//!
//! Patches live next to the defconfig in the invocation directory as
//! `*.patch` files. They are applied in file-name order with `patch -p1`,
//! rooted at the unpacked source tree. The first failure aborts; already
//! applied patches are not rolled back.

use crate::error::PatchError;
use crate::models::PatchSet;
use crate::system::{ToolInvocation, ToolRunner};
use std::fs::{self, File};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// File-name suffix that marks a patch.
pub const PATCH_SUFFIX: &str = ".patch";

/// Result type for patching operations
pub type PatchResult<T> = std::result::Result<T, PatchError>;

/// Discover every `*.patch` file directly inside `dir`.
///
/// An empty result is valid. The order is lexicographic by file name, so
/// numbered patches (`0001-...`, `0002-...`) apply in sequence on every run.
pub fn discover_patches(dir: &Path) -> PatchResult<PatchSet> {
    let discovery_err = |e: std::io::Error| PatchError::Discovery {
        dir: dir.to_path_buf(),
        source: e,
    };

    let mut patches: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(discovery_err)? {
        let entry = entry.map_err(discovery_err)?;
        let path = entry.path();
        // Raw bytes: names that are not valid UTF-8 still match.
        let is_patch = entry
            .file_name()
            .as_bytes()
            .ends_with(PATCH_SUFFIX.as_bytes());
        if is_patch && path.is_file() {
            patches.push(path);
        }
    }

    let set = PatchSet::from_paths(patches);
    log::debug!("[Patch] discovered {} patch(es) in {}", set.len(), dir.display());
    Ok(set)
}

/// Applies a patch set to one source tree.
pub struct KernelPatcher {
    /// Top directory of the unpacked kernel source
    src_dir: PathBuf,
}

impl KernelPatcher {
    /// Create a new kernel patcher for the given source directory
    pub fn new(src_dir: PathBuf) -> Self {
        KernelPatcher { src_dir }
    }

    /// Apply every patch in order, stopping at the first failure.
    ///
    /// # Returns
    /// The names of the applied patches, in application order.
    pub fn apply_all(&self, runner: &dyn ToolRunner, patches: &PatchSet) -> PatchResult<Vec<String>> {
        if patches.is_empty() {
            log::info!("[Patch] no patches to apply");
            return Ok(Vec::new());
        }

        let mut applied = Vec::with_capacity(patches.len());
        for (patch, name) in patches.iter().zip(patches.names()) {
            self.apply_one(runner, patch)?;
            applied.push(name);
        }
        Ok(applied)
    }

    /// Feed one patch file to `patch -p1` running in the source tree.
    pub fn apply_one(&self, runner: &dyn ToolRunner, patch: &Path) -> PatchResult<()> {
        log::info!("[Patch] applying patch {:?}", patch.display().to_string());

        let file = File::open(patch).map_err(|e| PatchError::Open {
            patch: patch.to_path_buf(),
            source: e,
        })?;

        let invocation = ToolInvocation::new("patch", &self.src_dir)
            .arg("-p1")
            .stdin(file);

        runner.run(invocation).map_err(|e| PatchError::ApplyFailed {
            patch: patch.to_path_buf(),
            source: e,
        })
    }
}
