use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which partition of a dataset an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitKind {
    Train,
    Test,
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitKind::Train => write!(f, "train"),
            SplitKind::Test => write!(f, "test"),
        }
    }
}

/// Every failure the library reports to its caller.
///
/// None of these are retried internally; they surface to the immediate
/// caller of the operation that produced them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("the file {path} had an expected magic number of {expected}, but the actual magic number was {actual}")]
    Format {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },

    #[error("the file {path} is truncated: expected {expected} bytes, found {actual}")]
    Truncated {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("image count {images} does not match label count {labels}")]
    Misaligned { images: usize, labels: usize },

    #[error("{0} dimensions were requested; data must be 1D or 2D only")]
    InvalidDimension(u8),

    #[error(
        "the requested number of {split} items, {requested}, is invalid; \
         the amount must be between 0 and {limit}{}",
        per_label(.balanced)
    )]
    SelectionRange {
        split: SplitKind,
        requested: usize,
        limit: usize,
        balanced: bool,
    },

    #[error("no dataset loaded; call fetch or load first")]
    NoData,

    #[error("CSV export only supports 1D data; use 1D data or dump a blob instead")]
    UnsupportedShape,

    #[error("the saved dataset {name:?} does not exist; the current saved datasets are [{}]", .available.join(", "))]
    UnknownSavedDataset { name: String, available: Vec<String> },

    #[error("{name:?} is not a valid snapshot name; use a plain name without path separators")]
    InvalidSnapshotName { name: String },

    #[error("no base snapshot at {path}; fetch the dataset first")]
    MissingBaseSnapshot { path: PathBuf },

    #[error("cannot identify the archive type of {path}")]
    UnsupportedArchive { path: PathBuf },

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("cannot set up the HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("CSV row {row}, column {column}: {value:?} is not a value in 0..=255")]
    CsvValue {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("snapshot encoding error: {0}")]
    Blob(#[from] bincode::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn per_label(balanced: &bool) -> &'static str {
    if *balanced {
        " per label"
    } else {
        ""
    }
}

/// Attach a human readable context to an `io::Result`, in the spirit of
/// `anyhow::Context` but producing a typed [`Error::Io`].
pub trait IoContext<T> {
    fn io_context<C: Into<String>>(self, context: C) -> Result<T>;

    fn with_io_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|source| Error::Io {
            context: context.into(),
            source,
        })
    }

    fn with_io_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|source| Error::Io {
            context: f().into(),
            source,
        })
    }
}
