//! In-memory profile storage for testing.
//!
//! Same token rules, search and reconstruction semantics as the file
//! backend, without touching the filesystem.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::index::{IndexEntry, SearchFilter};
use crate::profile::{Profile, ProfileGraph};

use super::ProfilerStorage;

#[derive(Debug, Default)]
struct Inner {
    blobs: HashMap<String, Profile>,
    /// Oldest first.
    index: Vec<IndexEntry>,
}

/// A test-double that keeps blobs in a map and index rows in a vector.
#[derive(Debug, Default)]
pub struct MemoryProfilerStorage {
    inner: Mutex<Inner>,
}

impl MemoryProfilerStorage {
    pub fn new() -> Self {
        MemoryProfilerStorage::default()
    }

    /// Number of index rows recorded so far.
    pub fn index_len(&self) -> usize {
        self.lock().index.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProfilerStorage for MemoryProfilerStorage {
    fn find(&self, filter: &SearchFilter) -> Result<Vec<IndexEntry>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .index
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(filter.limit)
            .cloned()
            .collect())
    }

    fn read(&self, token: &str) -> Result<Option<ProfileGraph>, StoreError> {
        let inner = self.lock();
        ProfileGraph::load(token, |t| Ok(inner.blobs.get(t).cloned()))
    }

    fn try_write(&self, profile: &Profile) -> Result<(), StoreError> {
        super::file::validate_token(profile.token())?;
        let mut inner = self.lock();
        inner
            .blobs
            .insert(profile.token().to_string(), profile.clone());
        inner.index.push(IndexEntry::from_profile(profile));
        Ok(())
    }

    fn purge(&self) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.blobs.clear();
        inner.index.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
