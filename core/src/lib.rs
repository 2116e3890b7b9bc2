//! Profile store — file-backed persistence for request profiles.
//!
//! Profiles are written as JSON blobs under a directory sharded by the
//! token's trailing characters, and summarized in an append-only
//! `index.csv` that `find` scans from newest to oldest. Reading a token
//! rebuilds the profile together with its parent chain and children.
//!
//! # Usage
//!
//! ```ignore
//! let storage = FileProfilerStorage::new("file:/var/cache/profiler")?;
//! if storage.write(&profile) {
//!     let latest = storage.find(&SearchFilter::latest(10).with_ip("127"))?;
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod index;
pub mod profile;
pub mod storage;

pub use config::{Dsn, StoreConfig};
pub use error::StoreError;
pub use index::{IndexEntry, SearchFilter};
pub use profile::{NodeId, Profile, ProfileGraph};
pub use storage::{FileProfilerStorage, MemoryProfilerStorage, ProfilerStorage};
