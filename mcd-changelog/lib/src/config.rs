//! Runtime configuration.
//!
//! Values come from the environment, with defaults for everything:
//!
//! | Variable | Default |
//! |---|---|
//! | `MCD_CHANGELOG_URL` | `https://changelog.makerdao.com` |
//! | `MCD_CHANGELOG_DIR` | `<data dir>/mcd-changelog` |
//! | `MCD_CHANGELOG_TIMEOUT_SECS` | `30` |

use crate::client::{ChangelogClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const URL_ENV: &str = "MCD_CHANGELOG_URL";
pub const DIR_ENV: &str = "MCD_CHANGELOG_DIR";
pub const TIMEOUT_ENV: &str = "MCD_CHANGELOG_TIMEOUT_SECS";

const INDEX_FILE: &str = "releases.json";
const ABI_DIR: &str = "abi";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of the changelog site
    pub base_url: String,
    /// Where the release index and ABI bundles are stored
    pub data_dir: PathBuf,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: default_data_dir(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Builds a configuration from the process environment.
    ///
    /// An unparseable timeout is ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(URL_ENV)
            && !url.trim().is_empty()
        {
            config.base_url = url.trim().to_string();
        }

        if let Ok(dir) = std::env::var(DIR_ENV)
            && !dir.is_empty()
        {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(secs) = std::env::var(TIMEOUT_ENV) {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => warn!(value = %secs, "Ignoring invalid {}", TIMEOUT_ENV),
            }
        }

        config
    }

    /// Path of the persisted release index.
    pub fn index_path(&self) -> PathBuf {
        self.root().join(INDEX_FILE)
    }

    /// Root directory ABI bundles are unpacked under.
    ///
    /// Always absolute, since bundle paths below it are persisted in the index.
    pub fn abi_root(&self) -> PathBuf {
        self.root().join(ABI_DIR)
    }

    /// `data_dir` resolved against the current directory.
    fn root(&self) -> PathBuf {
        std::path::absolute(&self.data_dir).unwrap_or_else(|_| self.data_dir.clone())
    }

    pub fn client(&self) -> ChangelogClient {
        ChangelogClient::new(self.base_url.clone()).with_timeout(self.timeout)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("mcd-changelog"))
        .unwrap_or_else(|| PathBuf::from(".mcd-changelog"))
}
