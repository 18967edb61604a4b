//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

// Build timestamp injected at compile time
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "stack-tools")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    /// Repository root holding docker-compose.yml (auto-detected when omitted)
    #[arg(long, global = true, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Backup operations
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Docker service management
    Docker {
        #[command(subcommand)]
        command: DockerCommands,
    },

    /// Safety backup, container update check and docker cleanup in one go
    Housekeep {
        /// Directory to store the backup
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Saved configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a full backup of service data and configuration
    Create {
        /// Directory to store the backup
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Restore service data and configuration from a backup archive
    Restore {
        /// Path to the backup tar.gz archive
        archive: PathBuf,

        /// Directory where temporary files are handled
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// List backups, newest first
    List {
        /// Directory holding the backups
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum DockerCommands {
    /// Bring up services; all of them if no service is named
    Deploy {
        /// Service name
        service: Option<String>,
    },

    /// Stop all services
    Stop,

    /// Pull latest images for all services
    Pull,

    /// Force rebuild and restart of all services
    Rebuild,

    /// Show service status
    Status,

    /// View service logs
    Logs {
        /// Service name
        service: Option<String>,

        /// Number of lines to show (0 for all)
        #[arg(short, long, default_value = "100")]
        tail: usize,

        /// Disable log following
        #[arg(long)]
        no_follow: bool,
    },

    /// Check for container image updates (monitor only)
    CheckUpdates,

    /// Validate the service definition with a dry run
    Test,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the saved configuration and the resolved locations
    Show,

    /// Save a configuration value
    Set {
        key: ConfigKey,
        value: String,
    },

    /// Remove a saved configuration value
    Unset {
        key: ConfigKey,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ConfigKey {
    ProjectRoot,
    BackupDir,
    HelperImage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_restore_with_global_repo() {
        let cli = Cli::try_parse_from([
            "stack-tools",
            "backup",
            "restore",
            "backups/backup_20240101_000000.tar.gz",
            "--dir",
            "/mnt/b",
            "--repo",
            "/srv/stack",
        ])
        .unwrap();

        assert_eq!(cli.repo, Some(PathBuf::from("/srv/stack")));
        match cli.command {
            Commands::Backup { command: BackupCommands::Restore { archive, dir } } => {
                assert_eq!(archive, PathBuf::from("backups/backup_20240101_000000.tar.gz"));
                assert_eq!(dir, Some(PathBuf::from("/mnt/b")));
            }
            _ => panic!("expected backup restore"),
        }
    }

    #[test]
    fn test_parse_logs_defaults() {
        let cli = Cli::try_parse_from(["stack-tools", "docker", "logs"]).unwrap();
        match cli.command {
            Commands::Docker { command: DockerCommands::Logs { service, tail, no_follow } } => {
                assert!(service.is_none());
                assert_eq!(tail, 100);
                assert!(!no_follow);
            }
            _ => panic!("expected docker logs"),
        }
    }

    #[test]
    fn test_parse_housekeep_dir() {
        let cli = Cli::try_parse_from(["stack-tools", "housekeep", "-d", "/mnt/b"]).unwrap();
        match cli.command {
            Commands::Housekeep { dir } => assert_eq!(dir, Some(PathBuf::from("/mnt/b"))),
            _ => panic!("expected housekeep"),
        }
    }

    #[test]
    fn test_parse_config_key() {
        let cli = Cli::try_parse_from(["stack-tools", "config", "set", "backup-dir", "/mnt/b"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config { command: ConfigCommands::Set { key: ConfigKey::BackupDir, .. } }
        ));
    }
}
