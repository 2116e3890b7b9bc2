use std::path::PathBuf;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors produced by profile storage backends.
///
/// Absence is never an error: a missing blob or a missing index file is
/// reported as `Ok(None)` / an empty result by the operations themselves.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage location could not be understood.
    #[error("invalid storage location: {0}")]
    Configuration(String),

    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A blob could not be encoded or decoded.
    #[error("malformed profile blob {}: {source}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The index lock was still held by another writer when the timeout expired.
    #[error("timed out acquiring lock on {} after {timeout_ms}ms", .path.display())]
    LockTimeout { path: PathBuf, timeout_ms: u64 },

    /// The token cannot be mapped onto a path inside the storage root.
    #[error("invalid token: {0:?}")]
    InvalidToken(String),

    /// Writing the blob produced no bytes.
    #[error("empty write to {}", .0.display())]
    EmptyWrite(PathBuf),

    /// The YAML configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
