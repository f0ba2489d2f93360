//! Configuration module for the kernel build.
//!
//! The defaults of [`BuildConfig`] are the pinned inputs of the gokrazy
//! Raspberry Pi kernel build: the source snapshot, the cross toolchain, the
//! fixed build identity, and the list of harvested artifacts. A JSON file can
//! override any of them (see [`loader`]), but a run never changes them after
//! start-up.
//!
//! # Module Structure
//!
//! - `loader`: Loading configurations from JSON files

pub mod loader;

use crate::error::ConfigError;
use crate::models::{Artifact, ArtifactKind, ReleaseSource, ToolchainEnvironment};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pinned source snapshot of the Raspberry Pi kernel fork.
pub const DEFAULT_SOURCE_URL: &str =
    "https://github.com/raspberrypi/linux/archive/b5dbe58ae4140a1ef7b86e4757e872c209b9f9ab.tar.gz";

/// Fixed KBUILD_BUILD_TIMESTAMP for reproducible images.
pub const DEFAULT_BUILD_TIMESTAMP: &str = "Wed Mar  1 20:57:29 UTC 2017";

pub const DEFAULT_STAGING_DIR: &str = "/tmp/buildresult";

/// Device-tree blobs harvested for the supported boards.
pub const DEFAULT_DEVICE_TREES: &[&str] = &[
    "bcm2710-rpi-3-b.dtb",
    "bcm2710-rpi-3-b-plus.dtb",
    "bcm2710-rpi-cm3.dtb",
    "bcm2711-rpi-4-b.dtb",
    "bcm2710-rpi-zero-2-w.dtb",
];

/// Build configuration, constructed once at start-up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Pinned source archive URL
    pub source_url: String,
    /// Prefix of the directory the archive unpacks into
    pub workspace_prefix: String,

    /// Board defconfig file, relative to the invocation directory
    pub defconfig_path: PathBuf,
    /// Name the defconfig gets inside arch/<arch>/configs/
    pub defconfig_name: String,

    // Toolchain environment
    pub arch: String,
    pub cross_compile: String,
    pub build_user: String,
    pub build_host: String,
    pub build_timestamp: String,

    /// Compressed kernel image make target
    pub image_target: String,
    /// Parallel make jobs; None means one per processing unit
    pub jobs: Option<usize>,

    /// Directory patches are discovered in, relative to the invocation directory
    pub patch_dir: PathBuf,

    // Artifact layout
    pub staging_dir: PathBuf,
    pub kernel_image: PathBuf,
    pub kernel_image_dest: String,
    pub device_tree_dir: PathBuf,
    pub device_trees: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            workspace_prefix: "linux-".to_string(),
            defconfig_path: PathBuf::from("defconfig"),
            defconfig_name: "gooniebox_defconfig".to_string(),
            arch: "arm64".to_string(),
            cross_compile: "aarch64-linux-gnu-".to_string(),
            build_user: "gokrazy".to_string(),
            build_host: "docker".to_string(),
            build_timestamp: DEFAULT_BUILD_TIMESTAMP.to_string(),
            image_target: "Image.gz".to_string(),
            jobs: None,
            patch_dir: PathBuf::from("."),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            kernel_image: PathBuf::from("arch/arm64/boot/Image"),
            kernel_image_dest: "vmlinuz".to_string(),
            device_tree_dir: PathBuf::from("arch/arm64/boot/dts/broadcom"),
            device_trees: DEFAULT_DEVICE_TREES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BuildConfig {
    /// Validate the configuration before any stage runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let source = self.release_source()?;
        if !source.is_pinned() {
            return Err(ConfigError::ValidationFailed(format!(
                "source {} is not pinned to a commit (revision '{}')",
                self.source_url,
                source.revision()
            )));
        }

        let required = [
            ("defconfig_name", self.defconfig_name.as_str()),
            ("arch", self.arch.as_str()),
            ("cross_compile", self.cross_compile.as_str()),
            ("build_timestamp", self.build_timestamp.as_str()),
            ("image_target", self.image_target.as_str()),
            ("kernel_image_dest", self.kernel_image_dest.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!("{} must not be empty", field)));
            }
        }

        if self.defconfig_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed("defconfig_path must not be empty".to_string()));
        }

        if self.staging_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed("staging_dir must not be empty".to_string()));
        }

        if self.jobs == Some(0) {
            return Err(ConfigError::ValidationFailed("jobs must be at least 1".to_string()));
        }

        Ok(())
    }

    pub fn release_source(&self) -> Result<ReleaseSource, ConfigError> {
        ReleaseSource::new(&self.source_url).map_err(|e| ConfigError::ValidationFailed(e.to_string()))
    }

    pub fn toolchain_environment(&self) -> ToolchainEnvironment {
        ToolchainEnvironment::new(
            &self.arch,
            &self.cross_compile,
            &self.build_user,
            &self.build_host,
            &self.build_timestamp,
        )
    }

    /// Number of parallel make jobs.
    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Staging path for `modules_install` and the harvested artifacts.
    pub fn staging_dir(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.staging_dir)
    }

    /// The fixed list of artifacts: the kernel image, then every device tree.
    pub fn artifacts(&self, work_dir: &Path) -> Vec<Artifact> {
        let staging = self.staging_dir(work_dir);
        let mut artifacts = vec![Artifact {
            kind: ArtifactKind::KernelImage,
            source: self.kernel_image.clone(),
            dest: staging.join(&self.kernel_image_dest),
        }];
        artifacts.extend(self.device_trees.iter().map(|dtb| Artifact {
            kind: ArtifactKind::DeviceTree,
            source: self.device_tree_dir.join(dtb),
            dest: staging.join(dtb),
        }));
        artifacts
    }
}
