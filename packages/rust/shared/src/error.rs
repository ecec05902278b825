//! Error types for halopub.
//!
//! Library crates use [`HaloPubError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` at the process boundary.

use std::path::PathBuf;

/// Which taxonomy resource a reconciliation step was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyKind {
    Tag,
    Category,
}

impl std::fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tag => write!(f, "tag"),
            Self::Category => write!(f, "category"),
        }
    }
}

/// Top-level error type for all halopub operations.
#[derive(Debug, thiserror::Error)]
pub enum HaloPubError {
    /// The backend answered with a non-success HTTP status.
    #[error("API request failed: {status} {status_text}")]
    RemoteApi { status: u16, status_text: String },

    /// A single tag or category could not be created during auto-generation.
    #[error("failed to create {kind} '{name}': {message}")]
    ReconciliationPartial {
        kind: TaxonomyKind,
        name: String,
        message: String,
    },

    /// Connection-level failure (DNS, refused, reset, ...).
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A resource or request failed validation at construction time.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Malformed tool-protocol traffic.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HaloPubError>;

impl HaloPubError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Record a failed lazy creation of a taxonomy entry.
    pub fn reconciliation(kind: TaxonomyKind, name: impl Into<String>, cause: &HaloPubError) -> Self {
        Self::ReconciliationPartial {
            kind,
            name: name.into(),
            message: cause.to_string(),
        }
    }

    /// HTTP status of a remote failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteApi { status, .. } => Some(*status),
            _ => None,
        }
    }
}
