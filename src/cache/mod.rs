//! Disk cache: three tiers per dataset.
//!
//! ```text
//!  <base_dir>/<dataset>/
//!      raw/    downloaded archives, kept until a refetch
//!      base/   1d_base.bin, 2d_base.bin – parsed once, reused after
//!      user/   <name>.bin – saved on demand, never removed
//! ```

pub mod layout;
pub mod orchestrator;

pub use layout::{ensure_dir, partial_path, remove_dir, write_replacing, CacheLayout};
pub use orchestrator::{CacheOrchestrator, FetchOptions, GzipSource, RawFiles, RawSource, RemoteFile};
