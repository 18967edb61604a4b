//! Restore from a backup archive
//!
//! The archive is extracted into `<backup_dir>/tmp_restore`, which is purged
//! first so leftovers from an interrupted restore never leak into this one.
//! The scratch directory is only removed on the success path and after an
//! empty or invalid archive; a hard failure part way through leaves it in
//! place for inspection.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::archive::{top_level_entries, unpack_archive};
use crate::core::command::CommandRunner;
use crate::core::config::StackConfig;
use crate::core::docker::DockerManager;
use crate::core::volumes::{is_valid_volume_name, snapshot_file_name};
use crate::utils::{copy_dir_all, copy_file_preserving, remove_path, Result, StackError, ARCHIVE_SUFFIX};

/// Where the set of volumes to restore comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeSource {
    /// Query the service definition that now sits in the repository
    ServiceDefinition,
    /// Every `<name>.tar.gz` directly inside the archive's content directory
    ArchiveContents,
}

impl VolumeSource {
    pub fn select(definition_present: bool) -> Self {
        if definition_present {
            VolumeSource::ServiceDefinition
        } else {
            VolumeSource::ArchiveContents
        }
    }
}

/// What a restore run put back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Name of the archive's top-level directory
    pub content_dir: String,
    pub items: Vec<String>,
    pub volume_source: VolumeSource,
    pub volumes: Vec<String>,
    /// Volumes wanted by the definition that had no tarball in the archive
    pub skipped_volumes: Vec<String>,
}

/// Volume names with a snapshot tarball directly inside `content_dir`, sorted
pub fn archived_volume_names(content_dir: &Path) -> Result<Vec<String>> {
    let read_dir = fs::read_dir(content_dir).map_err(StackError::io(format!(
        "Failed to read {}",
        content_dir.display()
    )))?;

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(StackError::io("Failed to read archive entry"))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(name) = file_name.strip_suffix(ARCHIVE_SUFFIX) else {
            continue;
        };
        if is_valid_volume_name(name) {
            names.push(name.to_string());
        } else {
            warn!("Ignoring {} in archive: not a valid volume name", file_name);
        }
    }
    names.sort();
    Ok(names)
}

pub struct RestoreManager<R> {
    docker: DockerManager<R>,
    config: StackConfig,
}

impl<R: CommandRunner> RestoreManager<R> {
    pub fn new(runner: R, config: StackConfig) -> Self {
        Self {
            docker: DockerManager::new(runner, config.repo_dir.clone()),
            config,
        }
    }

    /// Restore configuration items and volumes from `archive`.
    ///
    /// An empty archive is reported as an error and leaves services stopped.
    pub fn restore(&self, archive: &Path) -> Result<RestoreReport> {
        if !archive.is_file() {
            return Err(StackError::ArchiveNotFound(archive.to_path_buf()));
        }

        info!("Stopping services for restore...");
        self.docker.stop_all_lenient()?;

        let scratch = self.config.restore_scratch_dir();
        self.prepare_scratch_dir(&scratch)?;

        info!("Extracting archive {}...", archive.display());
        unpack_archive(archive, &scratch).map_err(StackError::io(format!(
            "Failed to extract {}",
            archive.display()
        )))?;

        let content_dir = self.locate_content_dir(archive, &scratch)?;
        let content_name = content_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let items = self.restore_items(&content_dir)?;

        let volume_source = VolumeSource::select(self.config.compose_file().exists());
        let wanted = match volume_source {
            VolumeSource::ServiceDefinition => {
                info!("Determining volumes from the restored service definition");
                self.docker.discover_volumes()
            }
            VolumeSource::ArchiveContents => {
                info!("No service definition in the repository, restoring every volume in the archive");
                archived_volume_names(&content_dir)?
            }
        };

        let mut volumes = Vec::new();
        let mut skipped_volumes = Vec::new();
        for volume in wanted {
            if !content_dir.join(snapshot_file_name(&volume)).is_file() {
                warn!("No snapshot for volume {} in archive, skipping", volume);
                skipped_volumes.push(volume);
                continue;
            }

            info!("Restoring volume: {}", volume);
            self.docker.create_volume(&volume)?;
            self.docker
                .restore_volume(&volume, &content_dir, &self.config.helper_image)?;
            volumes.push(volume);
        }

        if let Err(e) = fs::remove_dir_all(&scratch) {
            warn!("Could not remove {}: {}", scratch.display(), e);
        }

        info!("Restore complete!");
        info!("Restarting services...");
        self.docker.start_all()?;

        Ok(RestoreReport {
            content_dir: content_name,
            items,
            volume_source,
            volumes,
            skipped_volumes,
        })
    }

    /// Purge any stale extraction directory and create a fresh one
    fn prepare_scratch_dir(&self, scratch: &Path) -> Result<()> {
        remove_path(scratch).map_err(StackError::io(format!(
            "Failed to remove stale {}",
            scratch.display()
        )))?;
        fs::create_dir_all(scratch).map_err(StackError::io(format!(
            "Failed to create {}",
            scratch.display()
        )))
    }

    /// First top-level directory of the extracted archive
    fn locate_content_dir(&self, archive: &Path, scratch: &Path) -> Result<PathBuf> {
        let entries = top_level_entries(scratch).map_err(StackError::io(format!(
            "Failed to list {}",
            scratch.display()
        )))?;

        if entries.is_empty() {
            discard_scratch(scratch);
            return Err(StackError::EmptyArchive(archive.to_path_buf()));
        }

        let content_dir = entries
            .into_iter()
            .find(|path| fs::symlink_metadata(path).map(|m| m.is_dir()).unwrap_or(false));

        match content_dir {
            Some(dir) => Ok(dir),
            None => {
                discard_scratch(scratch);
                Err(StackError::NoContentDirectory(archive.to_path_buf()))
            }
        }
    }

    /// Overwrite repository items present in the archive; others stay untouched
    fn restore_items(&self, content_dir: &Path) -> Result<Vec<String>> {
        let mut restored = Vec::new();
        for item in self.config.staged_items() {
            let src = content_dir.join(item);
            let metadata = match fs::symlink_metadata(&src) {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };
            let dst = self.config.repo_dir.join(item);

            info!("Restoring {}...", item);
            let copied = if metadata.is_dir() {
                remove_path(&dst).and_then(|()| copy_dir_all(&src, &dst))
            } else {
                let clear = if dst.is_dir() { remove_path(&dst) } else { Ok(()) };
                clear.and_then(|()| copy_file_preserving(&src, &dst))
            };
            copied.map_err(StackError::io(format!("Failed to restore {}", dst.display())))?;
            restored.push(item.to_string());
        }
        Ok(restored)
    }
}

fn discard_scratch(scratch: &Path) {
    if let Err(e) = fs::remove_dir_all(scratch) {
        warn!("Could not remove {}: {}", scratch.display(), e);
    }
}
