//! Helper utilities: project root detection, file copying, formatting

use filetime::FileTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::utils::constants::{COMPOSE_FILE, PROJECT_ROOT_ENV};
use crate::utils::errors::{Result, StackError};

/// Get the repository root (where docker-compose.yml lives)
///
/// Resolution order:
/// 1. explicit path (`--repo`)
/// 2. `STACK_TOOLS_PROJECT_ROOT`
/// 3. saved configuration, if it still holds a service definition
/// 4. nearest ancestor of the current directory holding docker-compose.yml
/// 5. the current directory
///
/// The last step matters for restores onto a fresh host where no service
/// definition exists yet.
pub fn resolve_project_root(explicit: Option<&Path>, saved: Option<&str>) -> Result<PathBuf> {
    let current_dir = std::env::current_dir()
        .map_err(StackError::io("Failed to get current directory"))?;

    if let Some(path) = explicit {
        return Ok(absolutize(&current_dir, path));
    }

    if let Ok(root) = std::env::var(PROJECT_ROOT_ENV) {
        if !root.trim().is_empty() {
            return Ok(absolutize(&current_dir, Path::new(root.trim())));
        }
    }

    if let Some(root) = saved {
        let path = PathBuf::from(root);
        if path.join(COMPOSE_FILE).exists() {
            return Ok(path);
        }
    }

    if let Some(found) = find_compose_root(&current_dir) {
        return Ok(found);
    }

    Ok(current_dir)
}

/// Walk up from `start` looking for a directory containing docker-compose.yml
pub fn find_compose_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(COMPOSE_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Resolve `path` against `base` unless it is already absolute
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Copy a file or a whole directory tree from `src` to `dst`
pub fn copy_path(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        copy_dir_all(src, dst)
    } else {
        copy_file_preserving(src, dst)
    }
}

/// Copy a file, keeping its permissions and access/modification times
pub fn copy_file_preserving(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;

    let metadata = fs::metadata(src)?;
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )
}

/// Recursively copy `src` into `dst`, recreating directories and symlinks
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in walkdir::WalkDir::new(src).follow_links(false) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        if rel.as_os_str().is_empty() {
            continue;
        }

        let out = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&out)?;
        } else if entry.file_type().is_symlink() {
            copy_symlink(entry.path(), &out)?;
        } else {
            copy_file_preserving(entry.path(), &out)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if fs::symlink_metadata(dst).is_ok() {
        fs::remove_file(dst)?;
    }
    let target = fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    // No portable symlink creation; copy what the link points at
    copy_path(&fs::canonicalize(src)?, dst)
}

/// Remove whatever sits at `path` (file, symlink or directory tree)
pub fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Format bytes to human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
