//! Storage root resolution.
//!
//! Precedence: explicit path, then `RUSTY_DIGITS_HOME`, then the
//! `base_dir` key of `~/.rusty_digits.json`, then `~/.rusty_digits`.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IoContext, Result};

/// Environment variable overriding the storage root.
pub const HOME_ENV: &str = "RUSTY_DIGITS_HOME";
/// File name of the optional user config in the home directory.
pub const USER_CONFIG_FILE: &str = ".rusty_digits.json";
const DEFAULT_DIR_NAME: &str = ".rusty_digits";

/// Contents of the user config file. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

impl UserConfig {
    /// Read a config file; a missing file is an empty config.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_io_context(|| format!("reading {}", path.display()))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Where all datasets keep their raw, base and user tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub base_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve the storage root from the environment and user config file.
    pub fn load() -> Result<Self> {
        let home = home_dir();
        let config_path = home.as_ref().map(|h| h.join(USER_CONFIG_FILE));
        Self::resolve(
            env::var_os(HOME_ENV).map(PathBuf::from),
            config_path.as_deref(),
            home.as_deref(),
        )
    }

    /// Apply the precedence rules to already gathered inputs.
    pub fn resolve(
        env_override: Option<PathBuf>,
        config_path: Option<&Path>,
        home: Option<&Path>,
    ) -> Result<Self> {
        if let Some(dir) = env_override.filter(|d| !d.as_os_str().is_empty()) {
            log::debug!("storage root from {HOME_ENV}: {}", dir.display());
            return Ok(Self::new(dir));
        }

        if let Some(path) = config_path {
            if let Some(dir) = UserConfig::read(path)?.base_dir {
                log::debug!("storage root from {}: {}", path.display(), dir.display());
                return Ok(Self::new(dir));
            }
        }

        let root = home.unwrap_or_else(|| Path::new("."));
        Ok(Self::new(root.join(DEFAULT_DIR_NAME)))
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}
