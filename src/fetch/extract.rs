use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{Error, IoContext, Result};

/// Archive formats the extractor understands, identified by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// A single gzip-compressed file (`*.gz`).
    Gzip,
    /// A tarball (`*.tar`).
    Tar,
    /// A gzip-compressed tarball (`*.tar.gz`, `*.tgz`).
    TarGzip,
}

impl ArchiveKind {
    pub fn detect(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(ArchiveKind::TarGzip)
        } else if name.ends_with(".tar") {
            Ok(ArchiveKind::Tar)
        } else if name.ends_with(".gz") {
            Ok(ArchiveKind::Gzip)
        } else {
            Err(Error::UnsupportedArchive {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Where a single-file gzip archive extracts to: the same name minus `.gz`.
///
/// `None` for anything that is not a plain `.gz` file.
pub fn extracted_path(archive: &Path) -> Option<PathBuf> {
    match ArchiveKind::detect(archive) {
        Ok(ArchiveKind::Gzip) => Some(archive.with_extension("")),
        _ => None,
    }
}

/// Extract `archive` into `dest_dir`.
pub fn extract(archive: &Path, dest_dir: &Path) -> Result<()> {
    let kind = ArchiveKind::detect(archive)?;
    log::info!("extracting {} ({kind:?})", archive.display());

    let file = File::open(archive).with_io_context(|| format!("opening {}", archive.display()))?;
    let reader = BufReader::new(file);

    match kind {
        ArchiveKind::Gzip => {
            let out_name = archive.with_extension("");
            let out_name = out_name.file_name().unwrap_or(out_name.as_os_str());
            let out_path = dest_dir.join(out_name);
            let mut out = File::create(&out_path)
                .with_io_context(|| format!("creating {}", out_path.display()))?;
            io::copy(&mut GzDecoder::new(reader), &mut out)
                .with_io_context(|| format!("decompressing {}", archive.display()))?;
        }
        ArchiveKind::Tar => Archive::new(reader)
            .unpack(dest_dir)
            .with_io_context(|| format!("unpacking {}", archive.display()))?,
        ArchiveKind::TarGzip => Archive::new(GzDecoder::new(reader))
            .unpack(dest_dir)
            .with_io_context(|| format!("unpacking {}", archive.display()))?,
    }
    Ok(())
}
