//! Store configuration — storage location and tuning knobs.
//!
//! The storage location is a DSN-like string, `file:<directory>`. A YAML
//! config file and environment variables can both supply it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Required scheme prefix of a storage location.
pub const DSN_PREFIX: &str = "file:";

pub const ENV_DSN: &str = "PROFILER_DSN";
pub const ENV_LOCK_TIMEOUT_MS: &str = "PROFILER_LOCK_TIMEOUT_MS";

// ---------------------------------------------------------------------------
// Dsn
// ---------------------------------------------------------------------------

/// A parsed `file:` storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    folder: PathBuf,
}

impl Dsn {
    /// Parse `file:/path/to/folder`.
    ///
    /// Fails when the prefix is missing or nothing follows it.
    pub fn parse(dsn: &str) -> Result<Dsn, StoreError> {
        let folder = dsn.strip_prefix(DSN_PREFIX).ok_or_else(|| {
            StoreError::Configuration(format!("DSN must start with {}: {:?}", DSN_PREFIX, dsn))
        })?;
        if folder.trim().is_empty() {
            return Err(StoreError::Configuration(format!(
                "DSN has no folder after {}: {:?}",
                DSN_PREFIX, dsn
            )));
        }
        Ok(Dsn {
            folder: PathBuf::from(folder),
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn into_folder(self) -> PathBuf {
        self.folder
    }
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    pub dsn: String,
    /// How long a writer waits for the index lock before giving up.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Result limit used by `find` when the caller gives none.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_lock_timeout_ms() -> u64 {
    10_000
}

fn default_limit() -> usize {
    10
}

impl StoreConfig {
    /// Config with defaults for everything but the location.
    pub fn new(dsn: impl Into<String>) -> Self {
        StoreConfig {
            dsn: dsn.into(),
            lock_timeout_ms: default_lock_timeout_ms(),
            default_limit: default_limit(),
        }
    }

    /// Load from a YAML file.
    pub fn load(path: &Path) -> Result<StoreConfig, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Self::parse(&content)
    }

    /// Parse from a YAML string.
    pub fn parse(content: &str) -> Result<StoreConfig, StoreError> {
        let config: StoreConfig = serde_yaml::from_str(content)?;
        Dsn::parse(&config.dsn)?;
        Ok(config)
    }

    /// Build from `PROFILER_DSN` / `PROFILER_LOCK_TIMEOUT_MS`.
    ///
    /// Returns `Ok(None)` when `PROFILER_DSN` is unset.
    pub fn from_env() -> Result<Option<StoreConfig>, StoreError> {
        let dsn = match std::env::var(ENV_DSN) {
            Ok(v) => v,
            Err(_) => return Ok(None),
        };
        let mut config = StoreConfig::new(dsn);
        if let Ok(raw) = std::env::var(ENV_LOCK_TIMEOUT_MS) {
            config.lock_timeout_ms = raw.trim().parse().map_err(|_| {
                StoreError::Configuration(format!("{} is not a number: {:?}", ENV_LOCK_TIMEOUT_MS, raw))
            })?;
        }
        Dsn::parse(&config.dsn)?;
        Ok(Some(config))
    }

    pub fn dsn(&self) -> Result<Dsn, StoreError> {
        Dsn::parse(&self.dsn)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
