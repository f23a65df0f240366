use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use flate2::write::GzEncoder;
use flate2::Compression;

use rusty_digits::cache::{
    CacheLayout, CacheOrchestrator, FetchOptions, GzipSource, RawSource,
};
use rusty_digits::data::idx::{encode_images, encode_labels};
use rusty_digits::data::export::load_csv;
use rusty_digits::fetch::Downloader;
use rusty_digits::mnist::{raw_files, DATASET_NAME};
use rusty_digits::{
    CsvOptions, Dimensionality, Error, LabeledDataset, Mnist, Samples, ShuffleSeeds, StorageConfig,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const SIDE: usize = 2;

/// Labels for the synthetic train split: 3 zeros, 4 ones, 5 twos, interleaved.
const TRAIN_LABELS: [u8; 12] = [0, 1, 2, 1, 0, 2, 2, 1, 0, 2, 1, 2];
const TEST_LABELS: [u8; 6] = [2, 0, 1, 1, 0, 2];

/// Sample `i` is filled with the value `i`, so identity survives reordering.
fn images(n: usize) -> Vec<u8> {
    let samples = Samples::new(
        SIDE,
        SIDE,
        Dimensionality::One,
        (0..n).flat_map(|i| [i as u8; SIDE * SIDE]).collect(),
    );
    encode_images(&samples)
}

fn gz(bytes: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap()
}

/// Serves the synthetic archives by URL and counts downloads.
#[derive(Clone, Default)]
struct FakeDownloader {
    downloads: Rc<Cell<usize>>,
}

impl Downloader for FakeDownloader {
    fn download(&self, url: &str, dest: &Path) -> rusty_digits::Result<()> {
        self.downloads.set(self.downloads.get() + 1);
        let files = raw_files();
        let payload = if url == files.train_images.url {
            images(TRAIN_LABELS.len())
        } else if url == files.train_labels.url {
            encode_labels(&TRAIN_LABELS)
        } else if url == files.test_images.url {
            images(TEST_LABELS.len())
        } else {
            encode_labels(&TEST_LABELS)
        };
        File::create(dest).unwrap().write_all(&gz(&payload)).unwrap();
        Ok(())
    }
}

/// Wraps the gzip source and counts raw reads.
#[derive(Clone, Default)]
struct CountingSource {
    reads: Rc<Cell<usize>>,
}

impl RawSource for CountingSource {
    fn read(&self, path: &Path) -> rusty_digits::Result<Vec<u8>> {
        self.reads.set(self.reads.get() + 1);
        GzipSource.read(path)
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    storage: StorageConfig,
    downloader: FakeDownloader,
    source: CountingSource,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig::new(dir.path());
        Self {
            _dir: dir,
            storage,
            downloader: FakeDownloader::default(),
            source: CountingSource::default(),
        }
    }

    fn layout(&self) -> CacheLayout {
        CacheLayout::new(&self.storage, DATASET_NAME)
    }

    fn orchestrator(&self) -> CacheOrchestrator {
        CacheOrchestrator::new(
            self.layout(),
            raw_files(),
            Box::new(self.downloader.clone()),
            Box::new(self.source.clone()),
        )
    }

    fn mnist(&self, ndims: u8, seed: Option<u64>) -> Mnist {
        Mnist::with_cache(ndims, seed, self.orchestrator()).unwrap()
    }
}

fn label_counts(labels: &[u8]) -> BTreeMap<u8, usize> {
    let mut counts = BTreeMap::new();
    for &l in labels {
        *counts.entry(l).or_insert(0) += 1;
    }
    counts
}

/// Every sample byte equals the original index, which maps back to its label.
fn assert_aligned(samples: &Samples, labels: &[u8], source_labels: &[u8]) {
    assert_eq!(samples.len(), labels.len());
    for (sample, &label) in samples.iter().zip(labels) {
        let original = sample[0] as usize;
        assert!(sample.iter().all(|&v| v as usize == original));
        assert_eq!(source_labels[original], label);
    }
}

// ---------------------------------------------------------------------------
// Cache tiers
// ---------------------------------------------------------------------------

#[test]
fn fetch_downloads_once() {
    let h = Harness::new();
    let cache = h.orchestrator();
    cache.fetch(FetchOptions::default()).unwrap();
    assert_eq!(h.downloader.downloads.get(), 4);

    cache.fetch(FetchOptions::default()).unwrap();
    assert_eq!(h.downloader.downloads.get(), 4);

    cache
        .fetch(FetchOptions {
            refetch: true,
            ..FetchOptions::default()
        })
        .unwrap();
    assert_eq!(h.downloader.downloads.get(), 8);
}

#[test]
fn extracted_archives_count_as_present() {
    let h = Harness::new();
    let cache = h.orchestrator();
    let options = FetchOptions {
        refetch: false,
        extract: true,
        keep_archive: false,
    };
    cache.fetch(options).unwrap();

    let raw = h.layout().raw_dir();
    assert!(!raw.join("train-images-idx3-ubyte.gz").exists());
    assert!(raw.join("train-images-idx3-ubyte").is_file());

    cache.fetch(options).unwrap();
    assert_eq!(h.downloader.downloads.get(), 4);

    // The extracted files still decode.
    let dataset = cache.decode_raw(Dimensionality::One).unwrap();
    assert_eq!(dataset.train.labels(), &TRAIN_LABELS);
}

#[test]
fn base_snapshot_parses_raw_bytes_once() {
    let h = Harness::new();
    let cache = h.orchestrator();
    cache.fetch(FetchOptions::default()).unwrap();

    let first = cache.ensure_base_snapshot(Dimensionality::One, false).unwrap();
    assert_eq!(h.source.reads.get(), 4);
    assert!(h.layout().base_snapshot(Dimensionality::One).is_file());
    assert!(h.layout().base_snapshot(Dimensionality::Two).is_file());

    let second = cache.ensure_base_snapshot(Dimensionality::One, false).unwrap();
    assert_eq!(h.source.reads.get(), 4);
    assert_eq!(first, second);

    // The other dimensionality was written in the same pass.
    let grid = cache.ensure_base_snapshot(Dimensionality::Two, false).unwrap();
    assert_eq!(h.source.reads.get(), 4);
    assert_eq!(grid.dims(), Dimensionality::Two);
    assert_eq!(grid.train.samples().as_bytes(), first.train.samples().as_bytes());

    let mut written: Vec<String> = std::fs::read_dir(h.layout().base_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    written.sort();
    assert_eq!(written, vec!["1d_base.bin", "2d_base.bin"]);
}

#[test]
fn refetch_rebuilds_base_snapshot() {
    let h = Harness::new();
    let cache = h.orchestrator();
    cache.fetch(FetchOptions::default()).unwrap();
    cache.ensure_base_snapshot(Dimensionality::Two, false).unwrap();
    cache.ensure_base_snapshot(Dimensionality::Two, true).unwrap();
    assert_eq!(h.source.reads.get(), 8);
}

#[test]
fn existing_other_snapshot_is_left_alone() {
    let h = Harness::new();
    let cache = h.orchestrator();
    cache.fetch(FetchOptions::default()).unwrap();
    cache.ensure_base_snapshot(Dimensionality::One, false).unwrap();

    let two = h.layout().base_snapshot(Dimensionality::Two);
    std::fs::write(&two, b"sentinel").unwrap();
    std::fs::remove_file(h.layout().base_snapshot(Dimensionality::One)).unwrap();

    cache.ensure_base_snapshot(Dimensionality::One, false).unwrap();
    assert_eq!(std::fs::read(&two).unwrap(), b"sentinel");
}

#[test]
fn wrong_magic_in_raw_archive_fails() {
    let h = Harness::new();
    let raw = h.layout().raw_dir();
    std::fs::create_dir_all(&raw).unwrap();
    let files = raw_files();

    let mut bad = images(TRAIN_LABELS.len());
    bad[..4].copy_from_slice(&9999u32.to_be_bytes());
    std::fs::write(raw.join(&files.train_images.file_name), gz(&bad)).unwrap();
    std::fs::write(raw.join(&files.train_labels.file_name), gz(&encode_labels(&TRAIN_LABELS))).unwrap();
    std::fs::write(raw.join(&files.test_images.file_name), gz(&images(6))).unwrap();
    std::fs::write(raw.join(&files.test_labels.file_name), gz(&encode_labels(&TEST_LABELS))).unwrap();

    let err = h
        .orchestrator()
        .ensure_base_snapshot(Dimensionality::One, false)
        .unwrap_err();
    match err {
        Error::Format {
            path,
            expected,
            actual,
        } => {
            assert!(path.ends_with("train-images-idx3-ubyte.gz"));
            assert_eq!((expected, actual), (2051, 9999));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

#[test]
fn fetch_loads_base_snapshot_and_statistics() {
    let h = Harness::new();
    let mut mnist = h.mnist(2, None);
    mnist.fetch(false).unwrap();

    let train = mnist.train().unwrap();
    assert_eq!(train.len(), TRAIN_LABELS.len());
    assert_eq!(train.samples().sample_shape(), vec![SIDE, SIDE]);

    let stats = mnist.label_stats();
    assert_eq!(stats.num_labels(), 3);
    assert_eq!(stats.min_train_count, 3);
    assert_eq!(stats.min_test_count, 2);
}

#[test]
fn balanced_reduction_is_even_and_aligned() {
    let h = Harness::new();
    let mut mnist = h.mnist(1, Some(7));
    mnist.fetch(false).unwrap();
    mnist.reduce_dataset(3, 2, true).unwrap();

    let train = mnist.train().unwrap();
    assert_eq!(label_counts(train.labels()), BTreeMap::from([(0, 3), (1, 3), (2, 3)]));
    assert_aligned(train.samples(), train.labels(), &TRAIN_LABELS);

    let test = mnist.test().unwrap();
    assert_eq!(test.len(), 6);
    assert_aligned(test.samples(), test.labels(), &TEST_LABELS);

    // Original relative order is kept.
    let order: Vec<u8> = train.samples().iter().map(|s| s[0]).collect();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(order, sorted);
}

#[test]
fn over_quota_reduction_leaves_dataset_untouched() {
    let h = Harness::new();
    let mut mnist = h.mnist(1, None);
    mnist.fetch(false).unwrap();
    let before = mnist.dataset().cloned();

    let err = mnist.reduce_dataset(4, 1, true).unwrap_err();
    assert!(matches!(err, Error::SelectionRange { requested: 4, limit: 3, .. }));
    assert_eq!(mnist.dataset().cloned(), before);
}

#[test]
fn truncation_and_zero_targets() {
    let h = Harness::new();
    let mut mnist = h.mnist(1, None);
    mnist.fetch(false).unwrap();
    mnist.reduce_dataset(5, 0, false).unwrap();

    assert_eq!(mnist.train().unwrap().labels(), &TRAIN_LABELS[..5]);
    assert!(mnist.test().unwrap().is_empty());
    assert!(mnist.test().unwrap().samples().is_empty());
}

#[test]
fn shuffle_is_seeded_and_aligned() {
    let h = Harness::new();
    let mut a = h.mnist(1, Some(11));
    let mut b = h.mnist(1, Some(11));
    let mut c = h.mnist(1, Some(12));
    for m in [&mut a, &mut b, &mut c] {
        m.fetch(false).unwrap();
        m.shuffle().unwrap();
    }

    assert_eq!(a.dataset(), b.dataset());
    assert_ne!(a.train(), c.train());

    let train = a.train().unwrap();
    assert_aligned(train.samples(), train.labels(), &TRAIN_LABELS);
    let test = a.test().unwrap();
    assert_aligned(test.samples(), test.labels(), &TEST_LABELS);
}

#[test]
fn explicit_seeds_shuffle_splits_independently() {
    let h = Harness::new();
    let mut a = h.mnist(1, None);
    let mut b = h.mnist(1, None);
    a.fetch(false).unwrap();
    b.fetch(false).unwrap();

    a.shuffle_with(ShuffleSeeds::new(5, 6)).unwrap();
    b.shuffle_with(ShuffleSeeds::new(5, 99)).unwrap();
    assert_eq!(a.train(), b.train());
    assert_eq!(a.test().unwrap().len(), b.test().unwrap().len());
}

#[test]
fn save_and_load_user_snapshots() {
    let h = Harness::new();
    let mut mnist = h.mnist(1, Some(3));
    mnist.fetch(false).unwrap();
    mnist.reduce_dataset(2, 1, true).unwrap();
    mnist.save("small").unwrap();
    let saved = mnist.dataset().cloned();

    // Saving again under the same name overwrites.
    mnist.save("small").unwrap();
    assert_eq!(mnist.user_saves().unwrap(), vec!["small"]);

    let mut other = h.mnist(1, None);
    other.load(Some("small")).unwrap();
    assert_eq!(other.dataset().cloned(), saved);
    assert_eq!(other.label_stats().min_train_count, 2);

    // A 2-D facade sees the same bytes as a grid.
    let mut grid = h.mnist(2, None);
    grid.load(Some("small")).unwrap();
    assert_eq!(grid.dataset().unwrap().dims(), Dimensionality::Two);

    match other.load(Some("missing")).unwrap_err() {
        Error::UnknownSavedDataset { name, available } => {
            assert_eq!(name, "missing");
            assert_eq!(available, vec!["small"]);
        }
        e => panic!("unexpected error: {e}"),
    }
}

#[test]
fn snapshot_names_cannot_leave_user_dir() {
    let h = Harness::new();
    let mut mnist = h.mnist(1, None);
    mnist.fetch(false).unwrap();

    for name in ["../escaped", "nested/name"] {
        assert!(matches!(mnist.save(name), Err(Error::InvalidSnapshotName { .. })));
        assert!(matches!(mnist.load(Some(name)), Err(Error::InvalidSnapshotName { .. })));
    }
    assert!(!h.layout().root().join("escaped.bin").exists());
    assert!(mnist.user_saves().unwrap().is_empty());
}

#[test]
fn load_without_fetch_reports_missing_base() {
    let h = Harness::new();
    let mut mnist = h.mnist(1, None);
    assert!(matches!(mnist.load(None), Err(Error::MissingBaseSnapshot { .. })));
}

#[test]
fn csv_export_round_trips() {
    let h = Harness::new();
    let mut mnist = h.mnist(1, None);
    mnist.fetch(false).unwrap();

    let out = h.storage.base_dir.join("csv");
    mnist.dump_csv(&out, CsvOptions::default()).unwrap();

    let train = load_csv(&out.join("train.csv"), true).unwrap();
    let original = mnist.train().unwrap();
    assert_eq!(train.labels(), original.labels());
    assert_eq!(train.samples().as_bytes(), original.samples().as_bytes());
    assert_eq!(train.samples().width(), SIDE * SIDE);

    let test = load_csv(&out.join("test.csv"), true).unwrap();
    assert_eq!(test.labels(), &TEST_LABELS);
}

#[test]
fn blob_round_trips_through_facade() {
    let h = Harness::new();
    let mut mnist = h.mnist(2, Some(9));
    mnist.fetch(false).unwrap();
    mnist.shuffle().unwrap();

    let path = h.storage.base_dir.join("out").join("2d_mnist.bin");
    mnist.dump_blob(&path).unwrap();

    let mut copy = h.mnist(2, None);
    copy.load_blob(&path).unwrap();
    assert_eq!(copy.dataset(), mnist.dataset());
}
