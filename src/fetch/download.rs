use std::io;
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

use crate::cache::layout::write_replacing;
use crate::error::{Error, Result};

/// Fetches a remote file onto local disk.
///
/// Retry policy, if any, belongs to the implementation; callers propagate
/// the first error they see.
pub trait Downloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Blocking HTTP downloader with an optional console progress bar.
pub struct HttpDownloader {
    client: Client,
    verbose: bool,
}

impl HttpDownloader {
    /// Build the client; `verbose` shows a progress bar per file.
    pub fn new(verbose: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(concat!("rusty-digits/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self { client, verbose })
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    fn progress_bar(&self, total: Option<u64>, name: &str) -> ProgressBar {
        if !self.verbose {
            return ProgressBar::hidden();
        }
        let pb = match total {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ) {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(name.to_string());
        pb
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        log::info!("downloading {url} -> {}", dest.display());
        let failed = |reason: String| Error::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pb = self.progress_bar(response.content_length(), &name);

        // Partial transfers stay in `.part` until complete.
        let result = write_replacing(dest, |writer| {
            io::copy(&mut pb.wrap_read(response), writer)
                .map(drop)
                .map_err(|e| failed(e.to_string()))
        });
        match result {
            Ok(()) => {
                pb.finish_and_clear();
                log::debug!("finished {url}");
                Ok(())
            }
            Err(e) => {
                pb.abandon();
                Err(e)
            }
        }
    }
}
