use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use super::layout::{ensure_dir, remove_dir, CacheLayout};
use crate::data::export::{dump_blob, load_blob};
use crate::data::idx::decode_split;
use crate::data::model::{Dataset, Dimensionality};
use crate::error::{Error, IoContext, Result};
use crate::fetch::{extract, extracted_path, Downloader};

// ---------------------------------------------------------------------------
// Raw archive description
// ---------------------------------------------------------------------------

/// One remote archive and the name it is stored under in `raw/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub url: String,
    pub file_name: String,
}

impl RemoteFile {
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
        }
    }

    /// Take the file name from the last URL segment.
    pub fn from_url(url: &str) -> Self {
        let file_name = url.rsplit('/').next().unwrap_or(url);
        Self::new(url, file_name)
    }
}

/// The four archives making up a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFiles {
    pub train_images: RemoteFile,
    pub train_labels: RemoteFile,
    pub test_images: RemoteFile,
    pub test_labels: RemoteFile,
}

impl RawFiles {
    pub fn iter(&self) -> impl Iterator<Item = &RemoteFile> {
        [
            &self.train_images,
            &self.train_labels,
            &self.test_images,
            &self.test_labels,
        ]
        .into_iter()
    }
}

// ---------------------------------------------------------------------------
// Raw byte source
// ---------------------------------------------------------------------------

/// Reads the bytes of a raw file kept in the `raw/` tier.
pub trait RawSource {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reads `*.gz` archives through a gzip decoder, falling back to the
/// extracted file next to them when the archive itself is gone.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipSource;

impl RawSource for GzipSource {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();

        if path.is_file() {
            let file = File::open(path).with_io_context(|| format!("opening {}", path.display()))?;
            let is_gzip = path.extension().and_then(|e| e.to_str()) == Some("gz");
            let read = if is_gzip {
                GzDecoder::new(file).read_to_end(&mut bytes)
            } else {
                let mut file = file;
                file.read_to_end(&mut bytes)
            };
            read.with_io_context(|| format!("reading {}", path.display()))?;
            return Ok(bytes);
        }

        let plain = extracted_path(path).unwrap_or_else(|| path.to_path_buf());
        fs::read(&plain).with_io_context(|| format!("reading {}", plain.display()))
    }
}

// ---------------------------------------------------------------------------
// Fetch options
// ---------------------------------------------------------------------------

/// Per-call fetch behaviour; progress output is set on the [`Downloader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Delete the whole `raw/` tier before fetching.
    pub refetch: bool,
    /// Extract each freshly downloaded archive.
    pub extract: bool,
    /// Keep the archive after extracting it.
    pub keep_archive: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            refetch: false,
            extract: false,
            keep_archive: true,
        }
    }
}

// ---------------------------------------------------------------------------
// CacheOrchestrator
// ---------------------------------------------------------------------------

/// Moves a dataset through the `raw/`, `base/` and `user/` tiers.
///
/// Holds paths and collaborators only; datasets pass through by value.
/// Concurrent writers on the same tiers are not coordinated.
pub struct CacheOrchestrator {
    layout: CacheLayout,
    files: RawFiles,
    downloader: Box<dyn Downloader>,
    source: Box<dyn RawSource>,
}

impl CacheOrchestrator {
    pub fn new(
        layout: CacheLayout,
        files: RawFiles,
        downloader: Box<dyn Downloader>,
        source: Box<dyn RawSource>,
    ) -> Self {
        Self {
            layout,
            files,
            downloader,
            source,
        }
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn files(&self) -> &RawFiles {
        &self.files
    }

    fn raw_path(&self, file: &RemoteFile) -> PathBuf {
        self.layout.raw_dir().join(&file.file_name)
    }

    /// An archive counts as present if it, or what it extracts to, exists.
    fn is_present(path: &Path) -> bool {
        path.exists() || extracted_path(path).is_some_and(|p| p.exists())
    }

    /// Download every archive missing from `raw/`.
    pub fn fetch(&self, options: FetchOptions) -> Result<()> {
        let raw_dir = self.layout.raw_dir();
        if options.refetch {
            log::info!("refetch requested, clearing {}", raw_dir.display());
            remove_dir(&raw_dir)?;
        }
        ensure_dir(&raw_dir)?;

        for file in self.files.iter() {
            let dest = self.raw_path(file);
            if Self::is_present(&dest) {
                log::debug!("{} already present", dest.display());
                continue;
            }

            self.downloader.download(&file.url, &dest)?;

            if options.extract {
                extract(&dest, &raw_dir)?;
                if !options.keep_archive {
                    fs::remove_file(&dest)
                        .with_io_context(|| format!("removing {}", dest.display()))?;
                }
            }
        }
        Ok(())
    }

    /// Decode the raw tier into a dataset at `dims`.
    pub fn decode_raw(&self, dims: Dimensionality) -> Result<Dataset> {
        log::info!("parsing raw archives in {}", self.layout.raw_dir().display());
        let read = |file: &RemoteFile| -> Result<(Vec<u8>, PathBuf)> {
            let path = self.raw_path(file);
            Ok((self.source.read(&path)?, path))
        };

        let (train_x, train_x_path) = read(&self.files.train_images)?;
        let (train_y, train_y_path) = read(&self.files.train_labels)?;
        let (test_x, test_x_path) = read(&self.files.test_images)?;
        let (test_y, test_y_path) = read(&self.files.test_labels)?;

        let train = decode_split(
            (train_x.as_slice(), train_x_path.as_path()),
            (train_y.as_slice(), train_y_path.as_path()),
            dims,
        )?;
        let test = decode_split(
            (test_x.as_slice(), test_x_path.as_path()),
            (test_y.as_slice(), test_y_path.as_path()),
            dims,
        )?;
        Ok(Dataset::new(train, test))
    }

    /// Return the base snapshot at `dims`, parsing raw archives only when
    /// that snapshot does not exist yet.
    ///
    /// A parse writes the requested snapshot and, if missing, the other
    /// dimensionality's snapshot from the same decoded bytes.
    pub fn ensure_base_snapshot(&self, dims: Dimensionality, refetch: bool) -> Result<Dataset> {
        let base_dir = self.layout.base_dir();
        if refetch {
            log::info!("refetch requested, clearing {}", base_dir.display());
            remove_dir(&base_dir)?;
        }

        let requested = self.layout.base_snapshot(dims);
        if requested.is_file() {
            log::info!("loading cached {dims} base snapshot");
            return load_blob(&requested);
        }

        let dataset = self.decode_raw(dims)?;
        ensure_dir(&base_dir)?;
        log::info!("writing {}", requested.display());
        dump_blob(&requested, &dataset)?;

        let other_dims = dims.other();
        let other = self.layout.base_snapshot(other_dims);
        if other.is_file() {
            return Ok(dataset);
        }
        log::info!("writing {}", other.display());
        let dataset = dataset.reshaped(other_dims);
        dump_blob(&other, &dataset)?;
        Ok(dataset.reshaped(dims))
    }

    /// Persist `dataset` as the user snapshot `name`, overwriting any
    /// previous snapshot of that name.
    pub fn save(&self, name: &str, dataset: &Dataset) -> Result<PathBuf> {
        let path = self.layout.user_snapshot(name)?;
        ensure_dir(&self.layout.user_dir())?;
        log::info!("saving dataset as {name:?} at {}", path.display());
        dump_blob(&path, dataset)?;
        Ok(path)
    }

    /// Load the user snapshot `name`, or the base snapshot at `dims` when
    /// `name` is `None`.
    pub fn load(&self, name: Option<&str>, dims: Dimensionality) -> Result<Dataset> {
        match name {
            None => {
                let path = self.layout.base_snapshot(dims);
                if !path.is_file() {
                    return Err(Error::MissingBaseSnapshot { path });
                }
                load_blob(&path)
            }
            Some(name) => {
                let path = self.layout.user_snapshot(name)?;
                if !path.is_file() {
                    return Err(Error::UnknownSavedDataset {
                        name: name.to_string(),
                        available: self.user_saves()?,
                    });
                }
                log::info!("loading saved dataset {name:?}");
                load_blob(&path)
            }
        }
    }

    pub fn user_saves(&self) -> Result<Vec<String>> {
        self.layout.user_saves()
    }
}
