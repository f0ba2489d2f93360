//! Artifact harvest: copy build outputs into the staging layout.

use crate::error::HarvestError;
use crate::models::Artifact;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Copy `src` to `dest`, mirroring the source permission bits.
///
/// Opens the source, creates or truncates the destination, streams the
/// bytes, applies the source mode to the destination and then flushes and
/// syncs explicitly so that close-time errors are reported.
pub fn copy_file_preserving_mode(src: &Path, dest: &Path) -> io::Result<u64> {
    let input = File::open(src)?;
    let permissions = input.metadata()?.permissions();

    let output = File::create(dest)?;
    let mut reader = BufReader::new(input);
    let mut writer = BufWriter::new(output);
    let bytes = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;

    let output = writer.into_inner().map_err(|e| e.into_error())?;
    output.set_permissions(permissions)?;
    output.sync_all()?;
    Ok(bytes)
}

/// Copy every artifact from `workspace_root` into its staging destination.
///
/// Copies happen in list order; the first failure aborts the rest.
///
/// # Returns
/// Destination paths of the harvested artifacts.
pub fn harvest_artifacts(
    workspace_root: &Path,
    staging_dir: &Path,
    artifacts: &[Artifact],
) -> Result<Vec<PathBuf>, HarvestError> {
    fs::create_dir_all(staging_dir).map_err(|e| HarvestError::StagingDir {
        dir: staging_dir.to_path_buf(),
        source: e,
    })?;

    let mut harvested = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let src = workspace_root.join(&artifact.source);
        let bytes = copy_file_preserving_mode(&src, &artifact.dest).map_err(|e| HarvestError::Copy {
            src: src.clone(),
            dest: artifact.dest.clone(),
            source: e,
        })?;
        log::info!(
            "[Harvest] {:?} {} -> {} ({} bytes)",
            artifact.kind,
            artifact.source.display(),
            artifact.dest.display(),
            bytes
        );
        harvested.push(artifact.dest.clone());
    }

    Ok(harvested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtifactKind;
    use std::os::unix::fs::PermissionsExt;

    fn mode(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn test_copy_preserves_bytes_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("defconfig");
        fs::write(&src, b"CONFIG_ARM64=y\n").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o751)).unwrap();

        let dest = dir.path().join("copy");
        let bytes = copy_file_preserving_mode(&src, &dest).unwrap();

        assert_eq!(bytes, 15);
        assert_eq!(fs::read(&dest).unwrap(), b"CONFIG_ARM64=y\n");
        assert_eq!(mode(&dest), 0o751);
    }

    #[test]
    fn test_copy_truncates_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a");
        let dest = dir.path().join("b");
        fs::write(&src, "short").unwrap();
        fs::write(&dest, "a much longer previous content").unwrap();
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o600)).unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o644)).unwrap();

        copy_file_preserving_mode(&src, &dest).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "short");
        assert_eq!(mode(&dest), 0o644);
    }

    #[test]
    fn test_harvest_all_artifacts_with_modes() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("linux-x");
        let staging = dir.path().join("staging");
        fs::create_dir_all(ws.join("boot")).unwrap();
        fs::write(ws.join("boot/Image"), "image").unwrap();
        fs::write(ws.join("boot/a.dtb"), "dtb").unwrap();
        fs::set_permissions(ws.join("boot/Image"), fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(ws.join("boot/a.dtb"), fs::Permissions::from_mode(0o640)).unwrap();

        let artifacts = vec![
            Artifact {
                kind: ArtifactKind::KernelImage,
                source: PathBuf::from("boot/Image"),
                dest: staging.join("vmlinuz"),
            },
            Artifact {
                kind: ArtifactKind::DeviceTree,
                source: PathBuf::from("boot/a.dtb"),
                dest: staging.join("a.dtb"),
            },
        ];

        let harvested = harvest_artifacts(&ws, &staging, &artifacts).unwrap();
        assert_eq!(harvested, vec![staging.join("vmlinuz"), staging.join("a.dtb")]);
        assert_eq!(mode(&staging.join("vmlinuz")), 0o755);
        assert_eq!(mode(&staging.join("a.dtb")), 0o640);
    }

    #[test]
    fn test_harvest_stops_at_first_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        let staging = dir.path().join("staging");
        fs::create_dir_all(&ws).unwrap();
        fs::write(ws.join("present.dtb"), "x").unwrap();

        let artifacts = vec![
            Artifact {
                kind: ArtifactKind::KernelImage,
                source: PathBuf::from("missing-Image"),
                dest: staging.join("vmlinuz"),
            },
            Artifact {
                kind: ArtifactKind::DeviceTree,
                source: PathBuf::from("present.dtb"),
                dest: staging.join("present.dtb"),
            },
        ];

        let err = harvest_artifacts(&ws, &staging, &artifacts).unwrap_err();
        assert!(matches!(err, HarvestError::Copy { ref src, .. } if src.ends_with("missing-Image")));
        assert!(!staging.join("vmlinuz").exists());
        assert!(!staging.join("present.dtb").exists());
    }
}
