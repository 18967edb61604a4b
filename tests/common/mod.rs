#![allow(dead_code)]

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use stack_tools::core::{Cmd, CommandError, CommandRunner};

/// Stand-in for the docker CLI.
///
/// Records every invocation and emulates named volumes as directories under
/// `volumes_root`, so snapshot and restore containers really move bytes.
pub struct FakeDocker {
    volumes_root: PathBuf,
    definition: Option<String>,
    failing_volume: Option<String>,
    calls: RefCell<Vec<Cmd>>,
}

impl FakeDocker {
    pub fn new(volumes_root: &Path) -> Self {
        fs::create_dir_all(volumes_root).unwrap();
        Self {
            volumes_root: volumes_root.to_path_buf(),
            definition: None,
            failing_volume: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Output of `docker compose config`; without one the query fails
    pub fn with_definition(mut self, yaml: &str) -> Self {
        self.definition = Some(yaml.to_string());
        self
    }

    /// Snapshot and restore containers for this volume exit non-zero
    pub fn failing_volume(mut self, name: &str) -> Self {
        self.failing_volume = Some(name.to_string());
        self
    }

    pub fn add_volume(&self, name: &str, files: &[(&str, &str)]) {
        let dir = self.volume_path(name);
        fs::create_dir_all(&dir).unwrap();
        write_files(&dir, files);
    }

    pub fn remove_volume(&self, name: &str) {
        fs::remove_dir_all(self.volume_path(name)).unwrap();
    }

    pub fn volume_path(&self, name: &str) -> PathBuf {
        self.volumes_root.join(name)
    }

    pub fn calls(&self) -> Vec<Cmd> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, prefix: &[&str]) -> usize {
        self.calls.borrow().iter().filter(|c| c.args_start_with(prefix)).count()
    }

    pub fn ran(&self, prefix: &[&str]) -> bool {
        self.count(prefix) > 0
    }

    /// Volume names handed to helper containers running `program`
    pub fn helper_volumes(&self, program: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.args_start_with(&["run", "--rm"]))
            .filter(|c| c.get_args().get(7).map(String::as_str) == Some(program))
            .map(|c| c.get_args()[3].split(':').next().unwrap().to_string())
            .collect()
    }

    fn helper_container(&self, cmd: &Cmd, volume_mount: &str, host_mount: &str, rest: &[&str]) -> Result<Option<String>, CommandError> {
        let volume = volume_mount.split(':').next().unwrap();
        let host = PathBuf::from(host_mount.split(':').next().unwrap());
        if self.failing_volume.as_deref() == Some(volume) {
            return cmd.failure(Some(2), "tar: short read");
        }

        match rest {
            ["tar", "czf", target, "-C", "/volume", "."] => {
                let src = self.volume_path(volume);
                if !src.is_dir() {
                    return cmd.failure(Some(125), format!("volume {} does not exist", volume));
                }
                let file_name = target.strip_prefix("/backup/").unwrap();
                write_tarball(&host.join(file_name), &src);
                Ok(None)
            }
            ["sh", "-c", _script, "restore", tarball] => {
                let dst = self.volume_path(volume);
                assert!(dst.is_dir(), "volume {} must be created before restoring", volume);
                fs::remove_dir_all(&dst).unwrap();
                fs::create_dir_all(&dst).unwrap();
                let mut archive = tar::Archive::new(GzDecoder::new(File::open(host.join(tarball)).unwrap()));
                archive.unpack(&dst).unwrap();
                Ok(None)
            }
            _ => panic!("unexpected helper container: {}", cmd),
        }
    }
}

impl CommandRunner for FakeDocker {
    fn run(&self, cmd: &Cmd) -> Result<Option<String>, CommandError> {
        self.calls.borrow_mut().push(cmd.clone());
        assert_eq!(cmd.program(), "docker");

        let args: Vec<&str> = cmd.get_args().iter().map(String::as_str).collect();
        match args.as_slice() {
            ["compose", "config"] => match &self.definition {
                Some(doc) => Ok(Some(doc.clone())),
                None => cmd.failure(Some(14), "no configuration file provided: not found"),
            },
            ["compose", ..] => Ok(None),
            ["volume", "inspect", "--", name] => {
                if self.volume_path(name).is_dir() {
                    Ok(Some("[]".to_string()))
                } else {
                    cmd.failure(Some(1), format!("Error response from daemon: get {}: no such volume", name))
                }
            }
            ["volume", "create", "--", name] => {
                fs::create_dir_all(self.volume_path(name)).unwrap();
                Ok(Some(name.to_string()))
            }
            ["system", "prune", "-f"] => Ok(None),
            ["run", "--rm", "-v", _socket, "containrrr/watchtower", ..] => Ok(None),
            ["run", "--rm", "-v", volume_mount, "-v", host_mount, _image, rest @ ..] => {
                self.helper_container(cmd, volume_mount, host_mount, rest)
            }
            _ => panic!("unexpected command: {}", cmd),
        }
    }
}

pub fn write_files(dir: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// gzip tarball of `src`'s content with paths relative to `src`
pub fn write_tarball(dest: &Path, src: &Path) {
    let encoder = GzEncoder::new(File::create(dest).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for entry in walkdir::WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(src).unwrap();
        if entry.file_type().is_dir() {
            builder.append_dir(rel, entry.path()).unwrap();
        } else {
            builder.append_path_with_name(entry.path(), rel).unwrap();
        }
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Relative path -> content for every file under `dir`; directories map to `None`
pub fn read_tree(dir: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    walkdir::WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).unwrap().to_string_lossy().into_owned();
            let content = if e.file_type().is_dir() { None } else { Some(fs::read(e.path()).unwrap()) };
            (rel, content)
        })
        .collect()
}

/// Names directly inside `dir`, sorted
pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Extract `archive` into `dest` and return the names of its top-level entries
pub fn extract(archive: &Path, dest: &Path) -> Vec<String> {
    fs::create_dir_all(dest).unwrap();
    tar::Archive::new(GzDecoder::new(File::open(archive).unwrap()))
        .unpack(dest)
        .unwrap();
    list_names(dest)
}
