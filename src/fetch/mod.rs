//! Collaborators that move archives from the network onto disk.

pub mod download;
pub mod extract;

pub use download::{Downloader, HttpDownloader};
pub use extract::{extract, extracted_path, ArchiveKind};
