//! Resolved locations and options shared by the backup and restore pipelines

use std::path::{Path, PathBuf};

use crate::utils::{
    absolutize, resolve_project_root, AppConfig, Result, COMPOSE_FILE, DEFAULT_BACKUP_DIR,
    DEFAULT_HELPER_IMAGE, RESTORE_SCRATCH_DIR, STAGED_ITEMS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    /// Repository root holding the staged items
    pub repo_dir: PathBuf,
    /// Where archives are written and scratch directories live
    pub backup_dir: PathBuf,
    /// Image for the volume snapshot/restore containers
    pub helper_image: String,
}

impl StackConfig {
    pub fn new(repo_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            backup_dir: backup_dir.into(),
            helper_image: DEFAULT_HELPER_IMAGE.to_string(),
        }
    }

    pub fn with_helper_image(mut self, image: impl Into<String>) -> Self {
        self.helper_image = image.into();
        self
    }

    /// Combine command line overrides with the saved configuration.
    ///
    /// A relative backup directory is taken relative to the repository root.
    pub fn resolve(app: &AppConfig, repo: Option<&Path>, backup_dir: Option<&Path>) -> Result<Self> {
        let repo_dir = resolve_project_root(repo, app.project_root.as_deref())?;

        let backup_dir = backup_dir
            .map(Path::to_path_buf)
            .or_else(|| app.backup_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR));
        let backup_dir = absolutize(&repo_dir, &backup_dir);

        let mut config = Self::new(repo_dir, backup_dir);
        if let Some(image) = app.helper_image.as_deref().filter(|i| !i.trim().is_empty()) {
            config = config.with_helper_image(image.trim());
        }
        Ok(config)
    }

    pub fn staged_items(&self) -> &'static [&'static str] {
        STAGED_ITEMS
    }

    pub fn compose_file(&self) -> PathBuf {
        self.repo_dir.join(COMPOSE_FILE)
    }

    pub fn restore_scratch_dir(&self) -> PathBuf {
        self.backup_dir.join(RESTORE_SCRATCH_DIR)
    }
}
