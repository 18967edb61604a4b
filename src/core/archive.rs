//! Backup archive packing and unpacking (gzip-compressed tar)

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};

/// Pack `src_dir` into `dest` so the archive holds exactly one top-level
/// directory named `top_level`.
///
/// The archive is written next to `dest` under a temporary name and renamed
/// into place once complete, so a half-written archive never carries the
/// final name.
pub fn pack_directory(src_dir: &Path, top_level: &str, dest: &Path) -> io::Result<()> {
    let partial = partial_path(dest);

    let result = write_archive(src_dir, top_level, &partial).and_then(|()| fs::rename(&partial, dest));
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn write_archive(src_dir: &Path, top_level: &str, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);

    builder.append_dir_all(top_level, src_dir)?;

    let file = builder.into_inner()?.finish()?;
    file.sync_all()
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".partial");
    dest.with_file_name(name)
}

/// Extract a gzip-compressed tar archive into `dest_dir`
pub fn unpack_archive(archive: &Path, dest_dir: &Path) -> io::Result<()> {
    let file = File::open(archive)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_mtime(true);
    archive.set_preserve_permissions(true);
    archive.unpack(dest_dir)
}

/// Top-level entry names of an extracted archive, sorted
pub fn top_level_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}
