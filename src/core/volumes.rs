//! Named volume discovery and snapshot/restore helpers
//!
//! Discovery reads the key set of the top-level `volumes` mapping from the
//! resolved service definition. It never fails: a query or parse problem is
//! logged and treated as "no volumes".

use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::command::{Cmd, CommandError, CommandRunner};
use crate::core::docker::DockerManager;
use crate::utils::{DefinitionError, ARCHIVE_SUFFIX, BACKUP_MOUNT, VOLUME_MOUNT};

/// Extract declared named volumes from a service definition document.
///
/// Names come back sorted and de-duplicated. A document without a
/// `volumes` section (or with an empty one) declares no volumes.
pub fn parse_volume_names(document: &str) -> Result<Vec<String>, DefinitionError> {
    let yaml: Value = serde_yaml::from_str(document)?;

    let root = match yaml {
        Value::Mapping(map) => map,
        Value::Null => return Ok(Vec::new()),
        _ => return Err(DefinitionError::NotMapping),
    };

    let volumes = match root.get("volumes") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Mapping(map)) => map,
        Some(_) => return Err(DefinitionError::VolumesNotMapping),
    };

    let mut names: Vec<String> = volumes
        .keys()
        .filter_map(|key| match key {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|name| {
            let valid = is_valid_volume_name(name);
            if !valid {
                warn!("Ignoring invalid volume name {:?} in service definition", name);
            }
            valid
        })
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Docker's volume name rule: `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
///
/// Names are passed to docker as operands, so anything that could read as a
/// flag or carry a mount separator is refused.
pub fn is_valid_volume_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        _ => false,
    }
}

/// File name of a volume's snapshot tarball
pub fn snapshot_file_name(volume: &str) -> String {
    format!("{}{}", volume, ARCHIVE_SUFFIX)
}

impl<R: CommandRunner> DockerManager<R> {
    /// Named volumes declared by the current, fully resolved service definition
    pub fn discover_volumes(&self) -> Vec<String> {
        let document = match self.resolved_config() {
            Ok(document) => document,
            Err(e) => {
                warn!("Could not query the service definition, assuming no volumes: {}", e);
                return Vec::new();
            }
        };

        match parse_volume_names(&document) {
            Ok(names) => {
                info!("Discovered {} named volume(s): {}", names.len(), names.join(", "));
                names
            }
            Err(e) => {
                warn!("Could not parse the service definition, assuming no volumes: {}", e);
                Vec::new()
            }
        }
    }

    /// Existence probe; any failure counts as "absent"
    pub fn volume_exists(&self, name: &str) -> bool {
        let cmd = Cmd::docker().args(["volume", "inspect", "--", name]).capture();
        match self.runner().run(&cmd) {
            Ok(_) => true,
            Err(CommandError::Failed { .. }) => false,
            Err(e) => {
                warn!("Volume probe for {} could not run: {}", name, e);
                false
            }
        }
    }

    /// Create the volume; a no-op if it already exists
    pub fn create_volume(&self, name: &str) -> Result<(), CommandError> {
        self.runner()
            .run(&Cmd::docker().args(["volume", "create", "--", name]).capture())?;
        Ok(())
    }

    /// Write `<name>.tar.gz` with the volume's full content into `dest_dir`.
    ///
    /// The volume is mounted read-only into a throwaway `image` container.
    pub fn snapshot_volume(&self, name: &str, dest_dir: &Path, image: &str) -> Result<PathBuf, CommandError> {
        let file_name = snapshot_file_name(name);
        let cmd = Cmd::docker().args([
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{}:ro", name, VOLUME_MOUNT),
            "-v".to_string(),
            format!("{}:{}", dest_dir.display(), BACKUP_MOUNT),
            image.to_string(),
            "tar".to_string(),
            "czf".to_string(),
            format!("{}/{}", BACKUP_MOUNT, file_name),
            "-C".to_string(),
            VOLUME_MOUNT.to_string(),
            ".".to_string(),
        ]);
        self.runner().run(&cmd)?;
        Ok(dest_dir.join(file_name))
    }

    /// Replace the volume's content with `<name>.tar.gz` from `source_dir`.
    ///
    /// The tarball name reaches the shell as a positional parameter, not
    /// through string interpolation.
    pub fn restore_volume(&self, name: &str, source_dir: &Path, image: &str) -> Result<(), CommandError> {
        let script = format!(
            "find {vol} -mindepth 1 -delete && tar xzf \"{backup}/$1\" -C {vol}",
            vol = VOLUME_MOUNT,
            backup = BACKUP_MOUNT
        );
        let cmd = Cmd::docker().args([
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{}", name, VOLUME_MOUNT),
            "-v".to_string(),
            format!("{}:{}:ro", source_dir.display(), BACKUP_MOUNT),
            image.to_string(),
            "sh".to_string(),
            "-c".to_string(),
            script,
            "restore".to_string(),
            snapshot_file_name(name),
        ]);
        self.runner().run(&cmd)?;
        Ok(())
    }
}
