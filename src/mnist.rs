//! The MNIST handwritten digit dataset.

use std::path::{Path, PathBuf};

use crate::cache::{ensure_dir, CacheLayout, CacheOrchestrator, FetchOptions, GzipSource, RawFiles, RemoteFile};
use crate::config::StorageConfig;
use crate::data::export::{self, CsvOptions};
use crate::data::labels::LabelStatistics;
use crate::data::model::{Dataset, Dimensionality, Split};
use crate::data::shuffle::ShuffleSeeds;
use crate::error::{Error, Result, SplitKind};
use crate::fetch::{Downloader, HttpDownloader};
use crate::state::DatasetState;

/// Directory name of this dataset under the storage root.
pub const DATASET_NAME: &str = "mnist";

pub const TRAIN_IMAGES_URL: &str =
    "https://ossci-datasets.s3.amazonaws.com/mnist/train-images-idx3-ubyte.gz";
pub const TRAIN_LABELS_URL: &str =
    "https://ossci-datasets.s3.amazonaws.com/mnist/train-labels-idx1-ubyte.gz";
pub const TEST_IMAGES_URL: &str =
    "https://ossci-datasets.s3.amazonaws.com/mnist/t10k-images-idx3-ubyte.gz";
pub const TEST_LABELS_URL: &str =
    "https://ossci-datasets.s3.amazonaws.com/mnist/t10k-labels-idx1-ubyte.gz";

/// The four MNIST archives.
pub fn raw_files() -> RawFiles {
    RawFiles {
        train_images: RemoteFile::from_url(TRAIN_IMAGES_URL),
        train_labels: RemoteFile::from_url(TRAIN_LABELS_URL),
        test_images: RemoteFile::from_url(TEST_IMAGES_URL),
        test_labels: RemoteFile::from_url(TEST_LABELS_URL),
    }
}

/// What every dataset type provides on top of the shared split handling.
pub trait LabeledDataset {
    /// Make sure raw data is on disk and the base snapshot is loaded.
    fn fetch(&mut self, refetch: bool) -> Result<()>;

    /// Load a saved snapshot by name, or the base snapshot for `None`.
    fn load(&mut self, name: Option<&str>) -> Result<()>;

    /// Write `train.csv` and `test.csv` into `out_dir`.
    fn dump_csv(&self, out_dir: &Path, options: CsvOptions) -> Result<()>;
}

/// MNIST at a fixed dimensionality, backed by the on-disk cache.
///
/// Construction never touches the network or the cache; call
/// [`LabeledDataset::fetch`] or [`LabeledDataset::load`] first.
pub struct Mnist {
    dims: Dimensionality,
    seed: Option<u64>,
    cache: CacheOrchestrator,
    state: DatasetState,
}

impl Mnist {
    /// MNIST rooted at the configured storage directory, downloading over HTTP.
    pub fn new(ndims: u8, seed: Option<u64>) -> Result<Self> {
        Self::with_storage(
            ndims,
            seed,
            &StorageConfig::load()?,
            Box::new(HttpDownloader::new(true)?),
        )
    }

    /// MNIST rooted at `storage`, downloading with `downloader`.
    pub fn with_storage(
        ndims: u8,
        seed: Option<u64>,
        storage: &StorageConfig,
        downloader: Box<dyn Downloader>,
    ) -> Result<Self> {
        let cache = CacheOrchestrator::new(
            CacheLayout::new(storage, DATASET_NAME),
            raw_files(),
            downloader,
            Box::new(GzipSource),
        );
        Self::with_cache(ndims, seed, cache)
    }

    /// MNIST driven by an already assembled cache orchestrator.
    pub fn with_cache(ndims: u8, seed: Option<u64>, cache: CacheOrchestrator) -> Result<Self> {
        Ok(Self {
            dims: Dimensionality::try_from(ndims)?,
            seed,
            cache,
            state: DatasetState::default(),
        })
    }

    pub fn dims(&self) -> Dimensionality {
        self.dims
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn cache(&self) -> &CacheOrchestrator {
        &self.cache
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.state.dataset()
    }

    pub fn train(&self) -> Option<&Split> {
        self.state.split(SplitKind::Train)
    }

    pub fn test(&self) -> Option<&Split> {
        self.state.split(SplitKind::Test)
    }

    pub fn label_stats(&self) -> &LabelStatistics {
        self.state.stats()
    }

    fn install(&mut self, dataset: Dataset) {
        self.state.set_dataset(dataset);
        self.state.reshape(self.dims);
    }

    /// Download missing archives with explicit options, then load the base snapshot.
    pub fn fetch_with(&mut self, options: FetchOptions) -> Result<()> {
        self.cache.fetch(options)?;
        let dataset = self.cache.ensure_base_snapshot(self.dims, options.refetch)?;
        self.install(dataset);
        Ok(())
    }

    /// Save the current splits as the user snapshot `name`.
    pub fn save(&self, name: &str) -> Result<PathBuf> {
        self.cache.save(name, self.state.require()?)
    }

    pub fn user_saves(&self) -> Result<Vec<String>> {
        self.cache.user_saves()
    }

    /// Reduce both splits; see [`crate::data::reduce::reduce`].
    pub fn reduce_dataset(&mut self, n_train: usize, n_test: usize, balanced: bool) -> Result<()> {
        log::info!("reducing to {n_train} train / {n_test} test (balanced: {balanced})");
        self.state.reduce(n_train, n_test, balanced)
    }

    /// Shuffle both splits with seeds derived from the configured seed,
    /// or fresh random seeds when none is configured.
    pub fn shuffle(&mut self) -> Result<()> {
        let seeds = match self.seed {
            Some(seed) => ShuffleSeeds::derive(seed),
            None => ShuffleSeeds::from_entropy(),
        };
        self.shuffle_with(seeds)
    }

    /// Shuffle both splits with explicitly chosen seeds.
    pub fn shuffle_with(&mut self, seeds: ShuffleSeeds) -> Result<()> {
        log::debug!("shuffling with {seeds:?}");
        self.state.shuffle(seeds)
    }

    /// Write both splits to one snapshot blob at `path`.
    pub fn dump_blob(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        export::dump_blob(path, self.state.require()?)
    }

    /// Replace the splits with those stored in the blob at `path`.
    pub fn load_blob(&mut self, path: &Path) -> Result<()> {
        let dataset = export::load_blob(path)?;
        self.install(dataset);
        Ok(())
    }
}

impl LabeledDataset for Mnist {
    fn fetch(&mut self, refetch: bool) -> Result<()> {
        self.fetch_with(FetchOptions {
            refetch,
            ..FetchOptions::default()
        })
    }

    fn load(&mut self, name: Option<&str>) -> Result<()> {
        let dataset = self.cache.load(name, self.dims)?;
        self.install(dataset);
        Ok(())
    }

    fn dump_csv(&self, out_dir: &Path, options: CsvOptions) -> Result<()> {
        if self.dims != Dimensionality::One {
            return Err(Error::UnsupportedShape);
        }
        let dataset = self.state.require()?;
        ensure_dir(out_dir)?;
        export::write_csv(&out_dir.join("train.csv"), &dataset.train, options)?;
        export::write_csv(&out_dir.join("test.csv"), &dataset.test, options)?;
        log::info!("wrote CSV files to {}", out_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoNetwork;

    impl Downloader for NoNetwork {
        fn download(&self, url: &str, _dest: &Path) -> Result<()> {
            Err(Error::Download {
                url: url.to_string(),
                reason: "offline".into(),
            })
        }
    }

    fn mnist(ndims: u8, root: &Path) -> Result<Mnist> {
        Mnist::with_storage(ndims, Some(1), &StorageConfig::new(root), Box::new(NoNetwork))
    }

    #[test]
    fn raw_file_names_follow_urls() {
        let files = raw_files();
        assert_eq!(files.train_images.file_name, "train-images-idx3-ubyte.gz");
        assert_eq!(files.test_labels.file_name, "t10k-labels-idx1-ubyte.gz");
    }

    #[test]
    fn rejects_bad_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(mnist(3, dir.path()), Err(Error::InvalidDimension(3))));
        assert!(matches!(mnist(0, dir.path()), Err(Error::InvalidDimension(0))));
    }

    #[test]
    fn construction_is_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let m = mnist(1, dir.path()).unwrap();
        assert!(m.dataset().is_none());
        assert!(!dir.path().join(DATASET_NAME).exists());
    }

    #[test]
    fn grid_data_cannot_become_csv() {
        let dir = tempfile::tempdir().unwrap();
        let m = mnist(2, dir.path()).unwrap();
        assert!(matches!(
            m.dump_csv(dir.path(), CsvOptions::default()),
            Err(Error::UnsupportedShape)
        ));
    }

    #[test]
    fn download_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = mnist(1, dir.path()).unwrap();
        assert!(matches!(m.fetch(false), Err(Error::Download { .. })));
    }
}
