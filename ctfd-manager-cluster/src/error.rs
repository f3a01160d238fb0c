//! Cluster error types.

use thiserror::Error;

/// Result type for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors that can occur while talking to the cluster.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("watch connection failed: {0}")]
    Connection(String),

    #[error("malformed value for {key} in {object}: {reason}")]
    Decode {
        object: String,
        key: String,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cluster unavailable: {0}")]
    Unavailable(String),
}
