use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::contract::{BoxError, StoreError};

/// Observed state of the remote bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Exists,
    NotFound,
}

impl fmt::Display for Existence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Existence::Exists => f.write_str("existing"),
            Existence::NotFound => f.write_str("absent"),
        }
    }
}

/// Every failure a deploy, or one of its steps, can report.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("bucket '{bucket}' not found")]
    NotFound { bucket: String },

    #[error("{operation} failed for bucket '{bucket}': {source}")]
    Remote {
        operation: &'static str,
        bucket: String,
        #[source]
        source: BoxError,
    },

    #[error("local I/O error at {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported filesystem entry at {}", .path.display())]
    UnsupportedEntry { path: PathBuf },

    #[error("path {} cannot be mapped to an object key", .path.display())]
    InvalidKey { path: PathBuf },

    #[error("bucket '{bucket}' did not become {expected} within {waited:?}")]
    NotConverged {
        bucket: String,
        expected: Existence,
        waited: Duration,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deploy timed out after {0:?}")]
    TimedOut(Duration),
}

impl DeployError {
    /// Attach operation and bucket context to a storage error.
    pub(crate) fn store(operation: &'static str, bucket: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound => DeployError::NotFound {
                bucket: bucket.to_string(),
            },
            StoreError::Remote(source) => DeployError::Remote {
                operation,
                bucket: bucket.to_string(),
                source,
            },
        }
    }

    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeployError::LocalIo {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DeployError::NotFound { .. })
    }
}
