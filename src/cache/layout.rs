use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::data::model::Dimensionality;
use crate::error::{Error, IoContext, Result};

/// File extension of every snapshot blob.
pub const SNAPSHOT_EXT: &str = "bin";

/// Create `dir` and its parents; an existing directory is success.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_io_context(|| format!("creating directory {}", dir.display()))
}

/// Remove `dir` recursively; a missing directory is success.
pub fn remove_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_io_context(|| format!("removing directory {}", dir.display())),
    }
}

/// `<path>.part`, the sibling a file is written to before it is moved into place.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Write `path` through [`partial_path`], renaming only after `write` and
/// the final flush succeed.
///
/// On error the partial file is removed and any previous `path` is left as
/// it was.
pub fn write_replacing<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let partial = partial_path(path);
    let result = write_partial(&partial, write).and_then(|()| {
        fs::rename(&partial, path)
            .with_io_context(|| format!("moving {} into place", path.display()))
    });
    if result.is_err() {
        match fs::remove_file(&partial) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("could not remove {}: {e}", partial.display()),
        }
    }
    result
}

fn write_partial<F>(partial: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file = File::create(partial).with_io_context(|| format!("creating {}", partial.display()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer
        .flush()
        .with_io_context(|| format!("writing {}", partial.display()))
}

/// Reject snapshot names that would resolve outside `user/`.
fn check_snapshot_name(name: &str) -> Result<()> {
    let escapes = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || Path::new(name).is_absolute();
    if escapes {
        return Err(Error::InvalidSnapshotName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// The `raw/`, `base/` and `user/` tiers of one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    /// Layout for `dataset` under the configured storage root.
    pub fn new(storage: &StorageConfig, dataset: &str) -> Self {
        Self {
            root: storage.base_dir.join(dataset),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn base_dir(&self) -> PathBuf {
        self.root.join("base")
    }

    pub fn user_dir(&self) -> PathBuf {
        self.root.join("user")
    }

    /// `base/1d_base.bin` or `base/2d_base.bin`.
    pub fn base_snapshot(&self, dims: Dimensionality) -> PathBuf {
        self.base_dir()
            .join(format!("{}_base.{SNAPSHOT_EXT}", dims))
    }

    /// `user/<name>.bin`; `name` must be a plain file stem.
    pub fn user_snapshot(&self, name: &str) -> Result<PathBuf> {
        check_snapshot_name(name)?;
        Ok(self.user_dir().join(format!("{name}.{SNAPSHOT_EXT}")))
    }

    /// Names of the saved user snapshots, sorted.
    pub fn user_saves(&self) -> Result<Vec<String>> {
        let dir = self.user_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_io_context(|| format!("listing {}", dir.display())),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .with_io_context(|| format!("listing {}", dir.display()))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
