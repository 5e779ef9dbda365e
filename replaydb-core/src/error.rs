use thiserror::Error;

/// Errors surfaced by the replay index engine.
///
/// Index-level problems (`ManifestVersionMismatch`, `ManifestConsistencyError`) are
/// fatal and meant to propagate out of `main`; replay-level problems
/// (`BinaryFormat`, `UnsupportedSuffix`) are tolerated by callers and never abort a
/// save.
#[derive(Error, Debug)]
pub enum ReplayDbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0:?} does not match the replay filename pattern")]
    NameFormat(String),

    #[error("malformed replay header in {path:?}: {reason}")]
    BinaryFormat { path: String, reason: String },

    #[error("unsupported replay suffix: {0:?}")]
    UnsupportedSuffix(String),

    #[error("manifest version mismatch: expected 1, found {0}")]
    ManifestVersionMismatch(u32),

    #[error("manifest consistency error: {0}")]
    ManifestConsistencyError(String),

    #[error("filesystem watcher lost its watch: {0}")]
    WatcherLost(String),
}

pub type Result<T> = std::result::Result<T, ReplayDbError>;
