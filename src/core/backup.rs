//! Backup creation and listing
//!
//! A backup run stops the stack, stages the configuration items and a
//! tarball per existing named volume, packs everything into
//! `backup_<timestamp>.tar.gz` and brings the stack back up.

use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::archive::pack_directory;
use crate::core::command::CommandRunner;
use crate::core::config::StackConfig;
use crate::core::docker::DockerManager;
use crate::utils::{
    copy_path, Result, StackError, ARCHIVE_PREFIX, ARCHIVE_SUFFIX, ARCHIVE_TIMESTAMP_FORMAT,
};

/// Base name (no extension) of the archive for a backup taken at `at`
pub fn archive_base_name(at: NaiveDateTime) -> String {
    format!("{}{}", ARCHIVE_PREFIX, at.format(ARCHIVE_TIMESTAMP_FORMAT))
}

pub struct BackupManager<R> {
    docker: DockerManager<R>,
    config: StackConfig,
}

impl<R: CommandRunner> BackupManager<R> {
    pub fn new(runner: R, config: StackConfig) -> Self {
        Self {
            docker: DockerManager::new(runner, config.repo_dir.clone()),
            config,
        }
    }

    /// Create a backup stamped with the current local time
    pub fn create(&self) -> Result<PathBuf> {
        self.create_at(Local::now().naive_local())
    }

    /// Create a backup stamped with `at`; returns the archive path
    pub fn create_at(&self, at: NaiveDateTime) -> Result<PathBuf> {
        let base_name = archive_base_name(at);
        let backup_dir = &self.config.backup_dir;
        let staging_dir = backup_dir.join(&base_name);

        fs::create_dir_all(backup_dir).map_err(StackError::io(format!(
            "Failed to create backup directory {}",
            backup_dir.display()
        )))?;
        fs::create_dir(&staging_dir).map_err(StackError::io(format!(
            "Failed to create staging directory {}",
            staging_dir.display()
        )))?;

        info!("Stopping services for consistent backup...");
        self.docker.stop_all_lenient()?;

        let items = self.stage_items(&staging_dir)?;
        let volumes = self.stage_volumes(&staging_dir)?;
        info!("Staged {} item(s) and {} volume snapshot(s)", items.len(), volumes.len());

        let archive = backup_dir.join(format!("{}{}", base_name, ARCHIVE_SUFFIX));
        info!("Compressing {} into {}", staging_dir.display(), archive.display());
        pack_directory(&staging_dir, &base_name, &archive).map_err(StackError::io(format!(
            "Failed to create archive {}",
            archive.display()
        )))?;

        if let Err(e) = fs::remove_dir_all(&staging_dir) {
            warn!("Could not remove staging directory {}: {}", staging_dir.display(), e);
        }

        info!("Backup created successfully: {}", archive.display());
        info!("Restarting services...");
        self.docker.start_all()?;

        Ok(archive)
    }

    /// Copy every staged item that exists in the repository; absent ones are skipped
    fn stage_items(&self, staging_dir: &Path) -> Result<Vec<String>> {
        let mut staged = Vec::new();
        for item in self.config.staged_items() {
            let src = self.config.repo_dir.join(item);
            if !src.exists() {
                warn!("{} not found in {}, skipping", item, self.config.repo_dir.display());
                continue;
            }

            info!("Backing up {}...", item);
            copy_path(&src, &staging_dir.join(item))
                .map_err(StackError::io(format!("Failed to stage {}", src.display())))?;
            staged.push(item.to_string());
        }
        Ok(staged)
    }

    /// Snapshot each discovered volume that exists; a failing snapshot aborts the run
    fn stage_volumes(&self, staging_dir: &Path) -> Result<Vec<String>> {
        let mut snapshots = Vec::new();
        for volume in self.docker.discover_volumes() {
            if !self.docker.volume_exists(&volume) {
                warn!("Volume {} not found, skipping", volume);
                continue;
            }

            info!("Backing up volume: {}", volume);
            self.docker
                .snapshot_volume(&volume, staging_dir, &self.config.helper_image)?;
            snapshots.push(volume);
        }
        Ok(snapshots)
    }
}

/// An archive found in the backup directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    /// Parsed from the file name; `None` when the stamp is not a valid timestamp
    pub created: Option<NaiveDateTime>,
}

/// Archives in `backup_dir`, newest first. A missing directory has no backups.
pub fn list_backups(backup_dir: &Path) -> Result<Vec<BackupEntry>> {
    if !backup_dir.is_dir() {
        return Ok(Vec::new());
    }

    let read_dir = fs::read_dir(backup_dir).map_err(StackError::io(format!(
        "Failed to read backup directory {}",
        backup_dir.display()
    )))?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(StackError::io("Failed to read backup directory entry"))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(stamp) = name
            .strip_prefix(ARCHIVE_PREFIX)
            .and_then(|rest| rest.strip_suffix(ARCHIVE_SUFFIX))
        else {
            continue;
        };

        let metadata = match entry.metadata() {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => continue,
        };

        entries.push(BackupEntry {
            path: entry.path(),
            created: NaiveDateTime::parse_from_str(stamp, ARCHIVE_TIMESTAMP_FORMAT).ok(),
            name,
            size_bytes: metadata.len(),
        });
    }

    entries.sort_by(|a, b| b.name.cmp(&a.name));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(12, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_archive_base_name() {
        assert_eq!(archive_base_name(noon()), "backup_20240309_120507");
    }

    #[test]
    fn test_list_backups_newest_first() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("backup_20240101_000000.tar.gz"), "a").unwrap();
        fs::write(tmp.path().join("backup_20240309_120507.tar.gz"), "bbb").unwrap();
        fs::write(tmp.path().join("backup_garbage.tar.gz"), "c").unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(tmp.path().join("tmp_restore")).unwrap();
        fs::create_dir(tmp.path().join("backup_20240505_000000.tar.gz")).unwrap();

        let backups = list_backups(tmp.path()).unwrap();
        let names: Vec<_> = backups.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "backup_garbage.tar.gz",
                "backup_20240309_120507.tar.gz",
                "backup_20240101_000000.tar.gz"
            ]
        );
        assert_eq!(backups[1].created, Some(noon()));
        assert_eq!(backups[1].size_bytes, 3);
        assert!(backups[0].created.is_none());
    }

    #[test]
    fn test_list_backups_missing_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(list_backups(&tmp.path().join("nope")).unwrap().is_empty());
    }
}
