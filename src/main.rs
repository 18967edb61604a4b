mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};

use cli::{BackupCommands, Cli, Commands, ConfigCommands, ConfigKey, DockerCommands};
use stack_tools::core::{
    list_backups, BackupManager, DockerManager, MaintenanceManager, ProcessRunner, RestoreManager,
    StackConfig,
};
use stack_tools::utils::{self, absolutize, format_bytes, resolve_project_root, AppConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::logger::init(&cli.log_level)?;

    let repo = cli.repo.as_deref();
    match cli.command {
        Commands::Backup { command } => handle_backup(command, repo),
        Commands::Docker { command } => handle_docker(command, repo),
        Commands::Housekeep { dir } => handle_housekeep(repo, dir.as_deref()),
        Commands::Config { command } => handle_config(command, repo),
    }
}

fn stack_config(repo: Option<&Path>, dir: Option<&Path>) -> Result<StackConfig> {
    let app = AppConfig::load()?;
    Ok(StackConfig::resolve(&app, repo, dir)?)
}

fn handle_backup(command: BackupCommands, repo: Option<&Path>) -> Result<()> {
    match command {
        BackupCommands::Create { dir } => {
            let config = stack_config(repo, dir.as_deref())?;
            let archive = BackupManager::new(ProcessRunner, config)
                .create()
                .context("Backup failed")?;

            println!("{} Backup created: {}", "✓".green().bold(), archive.display().to_string().cyan());
        }
        BackupCommands::Restore { archive, dir } => {
            let config = stack_config(repo, dir.as_deref())?;
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            let archive = absolutize(&cwd, &archive);

            let report = RestoreManager::new(ProcessRunner, config)
                .restore(&archive)
                .context("Restore failed")?;

            println!("{} Restored {} from {}", "✓".green().bold(), report.content_dir.cyan(), archive.display());
            if !report.items.is_empty() {
                println!("  Files:   {}", report.items.join(", "));
            }
            if !report.volumes.is_empty() {
                println!("  Volumes: {}", report.volumes.join(", "));
            }
            if !report.skipped_volumes.is_empty() {
                println!("  {} {}", "Skipped (no snapshot):".yellow(), report.skipped_volumes.join(", "));
            }
        }
        BackupCommands::List { dir } => {
            let config = stack_config(repo, dir.as_deref())?;
            let backups = list_backups(&config.backup_dir)?;

            if backups.is_empty() {
                println!("No backups found in {}", config.backup_dir.display());
                return Ok(());
            }

            println!("Backups in {}\n", config.backup_dir.display());
            println!("{:<40} {:<22} {:>12}", "Archive", "Created", "Size");
            println!("{}", "-".repeat(76));
            for backup in backups {
                let created = backup
                    .created
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("{:<40} {:<22} {:>12}", backup.name, created, format_bytes(backup.size_bytes));
            }
        }
    }

    Ok(())
}

fn handle_docker(command: DockerCommands, repo: Option<&Path>) -> Result<()> {
    let app = AppConfig::load()?;
    let root = resolve_project_root(repo, app.project_root.as_deref())?;
    let docker = DockerManager::new(ProcessRunner, root);

    match command {
        DockerCommands::Deploy { service } => docker.deploy(service.as_deref())?,
        DockerCommands::Stop => {
            println!("Stopping docker compose services...");
            docker.stop_all()?;
        }
        DockerCommands::Pull => {
            println!("Pulling latest images...");
            docker.pull_images()?;
        }
        DockerCommands::Rebuild => {
            println!("Rebuilding and restarting services...");
            docker.rebuild()?;
        }
        DockerCommands::Status => docker.status()?,
        DockerCommands::Logs { service, tail, no_follow } => {
            docker.logs(service.as_deref(), !no_follow, tail)?;
        }
        DockerCommands::CheckUpdates => {
            println!("Checking for available container updates (this may take a moment)...");
            docker.check_updates()?;
        }
        DockerCommands::Test => {
            println!("Validating docker compose configuration (dry run)...");
            docker.dry_run()?;
        }
    }

    Ok(())
}

fn handle_housekeep(repo: Option<&Path>, dir: Option<&Path>) -> Result<()> {
    let config = stack_config(repo, dir)?;
    println!("{}", "Starting housekeeping routine".cyan().bold());

    let archive = MaintenanceManager::new(ProcessRunner, config)
        .housekeep()
        .context("Housekeeping failed")?;

    println!("{} Housekeeping complete (backup: {})", "✓".green().bold(), archive.display());
    Ok(())
}

fn handle_config(command: ConfigCommands, repo: Option<&Path>) -> Result<()> {
    let mut app = AppConfig::load()?;

    match command {
        ConfigCommands::Show => {
            println!("Config file: {}\n", AppConfig::config_path()?.display());
            println!("project_root = {}", app.project_root.as_deref().unwrap_or("<auto>"));
            println!("backup_dir   = {}", app.backup_dir.as_deref().unwrap_or("<default>"));
            println!("helper_image = {}", app.helper_image.as_deref().unwrap_or("<default>"));

            let resolved = StackConfig::resolve(&app, repo, None)?;
            println!("\nResolved:");
            println!("  repository: {}", resolved.repo_dir.display());
            println!("  backups:    {}", resolved.backup_dir.display());
            println!("  helper:     {}", resolved.helper_image);
        }
        ConfigCommands::Set { key, value } => {
            let value = match key {
                ConfigKey::ProjectRoot => {
                    let cwd = std::env::current_dir().context("Failed to get current directory")?;
                    absolutize(&cwd, &PathBuf::from(&value)).to_string_lossy().to_string()
                }
                _ => value,
            };
            *slot(&mut app, key) = Some(value);
            let path = app.save()?;
            println!("{} Saved to {}", "✓".green().bold(), path.display());
        }
        ConfigCommands::Unset { key } => {
            *slot(&mut app, key) = None;
            let path = app.save()?;
            println!("{} Saved to {}", "✓".green().bold(), path.display());
        }
    }

    Ok(())
}

fn slot(app: &mut AppConfig, key: ConfigKey) -> &mut Option<String> {
    match key {
        ConfigKey::ProjectRoot => &mut app.project_root,
        ConfigKey::BackupDir => &mut app.backup_dir,
        ConfigKey::HelperImage => &mut app.helper_image,
    }
}
