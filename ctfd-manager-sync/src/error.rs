//! Sync error types.

use ctfd_manager_cluster::ClusterError;
use ctfd_manager_remote::RemoteError;
use ctfd_manager_types::ValidationError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The object is malformed; it stays unsynced until corrected.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("cluster store failed: {0}")]
    Cluster(#[from] ClusterError),

    #[error("watch connection failed: {0}")]
    Connection(String),

    #[error("object {0} is not a challenge or page config")]
    NotManaged(String),
}
