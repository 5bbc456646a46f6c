//! Error types for kindling-kube

use kindling_core::{CoreError, ResourceKind};
use thiserror::Error;

/// Result type for kindling-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while applying kind policies
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Core type error (unknown priority, invalid manifest, ...)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Sort key with no comparator
    #[error("unsupported sort '{0}'\nHint: Use one of: age, size")]
    UnsupportedSort(String),

    /// Binding mode that does not exist
    #[error("unknown artifact binding '{0}'\nHint: Use one of: match-name-only, match-name-and-tag, match-exact")]
    UnknownBinding(String),

    /// Handler registration problem
    #[error(transparent)]
    Kind(#[from] KindError),

    /// Shard index outside `[0, count)`
    #[error("invalid shard {index}/{count}: index must be in [0, count) and count at least 1")]
    InvalidShard { index: usize, count: usize },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Cache key that could not be parsed
    #[error("invalid cache key '{key}': {reason}")]
    InvalidCacheKey { key: String, reason: String },

    /// Listing resources failed
    #[error("failed to list {kind} in {namespace}: {message}")]
    Lister {
        kind: ResourceKind,
        namespace: String,
        message: String,
    },

    /// Writing to the cache failed
    #[error("cache write failed: {0}")]
    Sink(String),

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Problems with the handler registration table
///
/// These are wiring mistakes, reported once at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KindError {
    #[error("no handler registered for kind '{0}'")]
    Unregistered(ResourceKind),

    #[error("kind '{0}' has more than one handler registered")]
    DuplicateHandler(ResourceKind),

    #[error("required kinds have no handler: {}", join(.0))]
    MissingHandlers(Vec<ResourceKind>),
}

fn join(kinds: &[ResourceKind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}
