//! Directory-tree profile storage.
//!
//! Layout under the root folder:
//!
//! ```text
//! index.csv                      one row per write, oldest first
//! <last 2>/<2 before those>/<token>   JSON blob per profile
//! ```
//!
//! Sharding on the token's trailing characters keeps directories small,
//! since tokens tend to share their leading characters.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use walkdir::WalkDir;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::index::{IndexEntry, ReverseLineReader, SearchFilter};
use crate::profile::{Profile, ProfileGraph};

use super::lock;
use super::ProfilerStorage;

pub const INDEX_FILENAME: &str = "index.csv";

// ---------------------------------------------------------------------------
// FileProfilerStorage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileProfilerStorage {
    folder: PathBuf,
    lock_timeout: Duration,
}

impl FileProfilerStorage {
    /// Open storage at a `file:<folder>` location, creating the folder.
    pub fn new(dsn: &str) -> Result<FileProfilerStorage, StoreError> {
        Self::from_config(&StoreConfig::new(dsn))
    }

    pub fn from_config(config: &StoreConfig) -> Result<FileProfilerStorage, StoreError> {
        let folder = config.dsn()?.into_folder();
        fs::create_dir_all(&folder).map_err(|e| StoreError::io(&folder, e))?;
        Ok(FileProfilerStorage {
            folder,
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
        })
    }

    pub fn root(&self) -> &Path {
        &self.folder
    }

    pub fn index_path(&self) -> PathBuf {
        self.folder.join(INDEX_FILENAME)
    }

    /// Where the blob for `token` lives.
    pub fn blob_path(&self, token: &str) -> Result<PathBuf, StoreError> {
        validate_token(token)?;
        let (outer, inner) = shard_dirs(token);
        Ok(self.folder.join(outer).join(inner).join(token))
    }

    /// The stored record for `token`, without following links.
    fn load_blob(&self, token: &str) -> Result<Option<Profile>, StoreError> {
        let path = match self.blob_path(token) {
            Ok(p) => p,
            Err(_) => return Ok(None),
        };
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Serialization { path, source })
    }

    fn append_index(&self, entry: &IndexEntry) -> Result<(), StoreError> {
        let path = self.index_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        let record = entry.to_record();

        let _lock = lock::lock_exclusive(&file, &path, self.lock_timeout)?;
        let mut writer = &file;
        writer
            .write_all(record.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| StoreError::io(&path, e))
    }
}

impl ProfilerStorage for FileProfilerStorage {
    fn find(&self, filter: &SearchFilter) -> Result<Vec<IndexEntry>, StoreError> {
        let path = self.index_path();
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        let mut reader = ReverseLineReader::new(file).map_err(|e| StoreError::io(&path, e))?;

        let mut result = Vec::new();
        while result.len() < filter.limit {
            let line = match reader.prev_line().map_err(|e| StoreError::io(&path, e))? {
                Some(l) => l,
                None => break,
            };
            match IndexEntry::from_record(&line) {
                Ok(entry) if filter.matches(&entry) => result.push(entry),
                Ok(_) => {}
                Err(reason) => {
                    log::warn!(
                        "skipping malformed row at byte {} of {}: {}",
                        reader.position(),
                        path.display(),
                        reason
                    );
                }
            }
        }
        Ok(result)
    }

    fn read(&self, token: &str) -> Result<Option<ProfileGraph>, StoreError> {
        let graph = ProfileGraph::load(token, |t| self.load_blob(t))?;
        if let Some(g) = &graph {
            log::debug!("read profile {} ({} nodes)", token, g.len());
        }
        Ok(graph)
    }

    fn try_write(&self, profile: &Profile) -> Result<(), StoreError> {
        let path = self.blob_path(profile.token())?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }

        let bytes = serde_json::to_vec(profile).map_err(|source| StoreError::Serialization {
            path: path.clone(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(StoreError::EmptyWrite(path));
        }
        fs::write(&path, &bytes).map_err(|e| StoreError::io(&path, e))?;

        self.append_index(&IndexEntry::from_profile(profile))?;
        log::debug!("wrote profile {} to {}", profile.token(), path.display());
        Ok(())
    }

    fn purge(&self) -> Result<(), StoreError> {
        let root_is_link = match fs::symlink_metadata(&self.folder) {
            Ok(meta) => meta.file_type().is_symlink(),
            Err(_) => return Ok(()),
        };
        let mut removed = 0usize;
        // The root is followed if it is a link; nothing below it is.
        for entry in WalkDir::new(&self.folder).min_depth(1).contents_first(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(self.folder.as_path()).to_path_buf();
                StoreError::io(path, io::Error::from(e))
            })?;
            let path = entry.path();
            if entry.file_type().is_dir() {
                fs::remove_dir(path).map_err(|e| StoreError::io(path, e))?;
            } else {
                fs::remove_file(path).map_err(|e| StoreError::io(path, e))?;
                removed += 1;
            }
        }
        let root = self.folder.as_path();
        if root_is_link {
            fs::remove_file(root).map_err(|e| StoreError::io(root, e))?;
        } else {
            fs::remove_dir(root).map_err(|e| StoreError::io(root, e))?;
        }
        log::info!("purged {} files from {}", removed, self.folder.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Tokens become file and directory names, so neither the token nor its
/// shard directories may be a separator-bearing or relative component.
pub(crate) fn validate_token(token: &str) -> Result<(), StoreError> {
    let relative = |part: &str| part == "." || part == "..";
    let (outer, inner) = shard_dirs(token);
    let bad = token.is_empty()
        || relative(token)
        || relative(&outer)
        || relative(&inner)
        || token.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidToken(token.to_string()));
    }
    Ok(())
}

/// The two shard directory names for `token`: its last two characters,
/// and the two before those (clamped to the start of short tokens).
fn shard_dirs(token: &str) -> (String, String) {
    let chars: Vec<char> = token.chars().collect();
    let n = chars.len();
    let outer: String = chars[n.saturating_sub(2)..].iter().collect();
    let start = n.saturating_sub(4);
    let inner: String = chars[start..(start + 2).min(n)].iter().collect();
    (outer, inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
