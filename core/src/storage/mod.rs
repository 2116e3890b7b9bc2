//! Profile storage backends.
//!
//! Provides the `ProfilerStorage` trait and implementations backed by a
//! directory tree (production) and by memory (testing).

pub mod file;
pub mod lock;
pub mod memory;

pub use file::FileProfilerStorage;
pub use memory::MemoryProfilerStorage;

use crate::error::StoreError;
use crate::index::{IndexEntry, SearchFilter};
use crate::profile::{Profile, ProfileGraph};

/// Persistence for profiles, keyed by token.
pub trait ProfilerStorage: Send + Sync {
    /// Newest-first index rows matching `filter`, at most `filter.limit`.
    fn find(&self, filter: &SearchFilter) -> Result<Vec<IndexEntry>, StoreError>;

    /// Load `token` with its ancestors and descendants.
    ///
    /// A token that was never written yields `Ok(None)`.
    fn read(&self, token: &str) -> Result<Option<ProfileGraph>, StoreError>;

    /// Store the profile and record it in the index.
    fn try_write(&self, profile: &Profile) -> Result<(), StoreError>;

    /// `try_write`, with any failure logged and reported as `false`.
    #[must_use]
    fn write(&self, profile: &Profile) -> bool {
        match self.try_write(profile) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("failed to write profile {}: {}", profile.token(), e);
                false
            }
        }
    }

    /// Remove every stored profile and the index.
    fn purge(&self) -> Result<(), StoreError>;
}
