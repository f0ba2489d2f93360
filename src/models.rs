//! Core data types for the kernel build pipeline.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::FetchError;

/// Archive suffixes stripped when deriving the unpacked directory name.
/// Longest first so `.tar.gz` wins over `.tar`.
pub const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tar.xz", ".tar.bz2", ".tar.zst", ".tgz", ".tar"];

static COMMIT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("Invalid commit regex"));

/// Immutable reference to exactly one source snapshot.
///
/// The URL's final path segment is the archive name, e.g.
/// `https://github.com/raspberrypi/linux/archive/<commit>.tar.gz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    url: Url,
    archive_name: String,
}

impl ReleaseSource {
    /// Parse a transport URL into a release source.
    pub fn new(url: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let archive_name = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.to_string())
            .ok_or_else(|| FetchError::InvalidUrl {
                url: url.to_string(),
                reason: "URL has no final path segment to name the archive".to_string(),
            })?;

        Ok(ReleaseSource {
            url: parsed,
            archive_name,
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// File name of the downloaded archive (final URL path segment).
    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    /// Archive name without its compression suffix.
    pub fn revision(&self) -> &str {
        ARCHIVE_SUFFIXES
            .iter()
            .find_map(|suffix| self.archive_name.strip_suffix(suffix))
            .unwrap_or(&self.archive_name)
    }

    /// Name of the directory the archive unpacks into.
    pub fn workspace_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.revision())
    }

    /// Whether the revision is a full commit id rather than a moving ref.
    pub fn is_pinned(&self) -> bool {
        COMMIT_REGEX.is_match(self.revision())
    }
}

impl fmt::Display for ReleaseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Directory tree created by unpacking the release source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildWorkspace {
    root: PathBuf,
}

impl BuildWorkspace {
    pub fn new(work_dir: &Path, source: &ReleaseSource, prefix: &str) -> Self {
        BuildWorkspace {
            root: work_dir.join(source.workspace_name(prefix)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the toolchain expects a named defconfig for `arch`.
    pub fn config_slot(&self, arch: &str, defconfig_name: &str) -> PathBuf {
        self.root.join("arch").join(arch).join("configs").join(defconfig_name)
    }
}

/// Fixed build metadata passed to every build-tool invocation.
///
/// Constructed once per run; the variables are merged over the inherited
/// process environment by the tool runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainEnvironment {
    vars: BTreeMap<String, String>,
}

impl ToolchainEnvironment {
    pub fn new(arch: &str, cross_compile: &str, build_user: &str, build_host: &str, build_timestamp: &str) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("ARCH".to_string(), arch.to_string());
        vars.insert("CROSS_COMPILE".to_string(), cross_compile.to_string());
        vars.insert("KBUILD_BUILD_USER".to_string(), build_user.to_string());
        vars.insert("KBUILD_BUILD_HOST".to_string(), build_host.to_string());
        vars.insert("KBUILD_BUILD_TIMESTAMP".to_string(), build_timestamp.to_string());
        ToolchainEnvironment { vars }
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|v| v.as_str())
    }

    pub fn arch(&self) -> &str {
        self.get("ARCH").unwrap_or_default()
    }
}

/// Ordered sequence of patch files, sorted by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    patches: Vec<PathBuf>,
}

impl PatchSet {
    /// Build a set from arbitrary paths; ordering is by file name.
    pub fn from_paths(mut patches: Vec<PathBuf>) -> Self {
        patches.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        PatchSet { patches }
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.patches.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.patches
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect()
    }
}

/// Kind of harvested build output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    KernelImage,
    DeviceTree,
}

/// A named build output and where it has to be copied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Path relative to the build workspace root
    pub source: PathBuf,
    /// Absolute destination path inside the staging directory
    pub dest: PathBuf,
}

/// Summary of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub workspace: PathBuf,
    pub patches_applied: Vec<String>,
    pub artifacts: Vec<PathBuf>,
    pub elapsed: Duration,
}
