//! Routine upkeep for the stack

use std::path::PathBuf;
use tracing::info;

use crate::core::backup::BackupManager;
use crate::core::command::CommandRunner;
use crate::core::config::StackConfig;
use crate::core::docker::DockerManager;
use crate::utils::Result;

pub struct MaintenanceManager<R> {
    runner: R,
    config: StackConfig,
}

impl<R: CommandRunner> MaintenanceManager<R> {
    pub fn new(runner: R, config: StackConfig) -> Self {
        Self { runner, config }
    }

    /// Safety backup, update check, then docker prune. Stops at the first failing step.
    ///
    /// Returns the path of the backup archive.
    pub fn housekeep(&self) -> Result<PathBuf> {
        info!("Step 1: creating safety backup");
        let archive = BackupManager::new(&self.runner, self.config.clone()).create()?;

        let docker = DockerManager::new(&self.runner, self.config.repo_dir.clone());

        info!("Step 2: checking for container updates");
        docker.check_updates()?;

        info!("Step 3: cleaning up unused docker resources");
        docker.prune_system()?;

        info!("Housekeeping complete");
        Ok(archive)
    }
}
