//! Stack layout and naming constants

/// Environment file at the repository root
pub const ENV_FILE: &str = ".env";

/// Service definition at the repository root
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Per-service configuration tree
pub const SERVICES_DIR: &str = "services";

/// Repository paths copied verbatim into every backup, in staging order
pub const STAGED_ITEMS: &[&str] = &[ENV_FILE, COMPOSE_FILE, SERVICES_DIR];

/// Default backup root, relative to the repository root
pub const DEFAULT_BACKUP_DIR: &str = "backups";

/// Extraction directory under the backup root, purged by every restore
pub const RESTORE_SCRATCH_DIR: &str = "tmp_restore";

pub const ARCHIVE_PREFIX: &str = "backup_";
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Image used for the ephemeral volume snapshot/restore containers
pub const DEFAULT_HELPER_IMAGE: &str = "alpine";

/// Mount points inside the helper container
pub const VOLUME_MOUNT: &str = "/volume";
pub const BACKUP_MOUNT: &str = "/backup";

pub const WATCHTOWER_IMAGE: &str = "containrrr/watchtower";
pub const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Overrides the saved project root
pub const PROJECT_ROOT_ENV: &str = "STACK_TOOLS_PROJECT_ROOT";
