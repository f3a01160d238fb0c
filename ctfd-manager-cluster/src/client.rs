//! The cluster seam: list, read, merge-write and watch config objects.

use crate::error::ClusterResult;
use async_trait::async_trait;
use ctfd_manager_types::ConfigObject;
use futures::stream::BoxStream;
use std::collections::BTreeMap;

/// Stream of change notifications from an open watch.
///
/// An `Err` item means the transport failed; the stream is over after it.
pub type WatchStream = BoxStream<'static, ClusterResult<WatchEvent>>;

/// Label filter for list and watch calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSelector {
    Exists(String),
    Equals(String, String),
}

impl LabelSelector {
    /// Renders the selector in the API server's query syntax.
    pub fn to_query(&self) -> String {
        match self {
            Self::Exists(key) => key.clone(),
            Self::Equals(key, value) => format!("{key}={value}"),
        }
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Self::Exists(key) => labels.contains_key(key),
            Self::Equals(key, value) => labels.get(key) == Some(value),
        }
    }
}

/// A change notification for one config object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(ConfigObject),
    Modified(ConfigObject),
    Deleted(ConfigObject),
    /// Bookmarks, server-side error events and anything else without an object.
    Other { kind: String },
}

impl WatchEvent {
    pub fn kind(&self) -> &str {
        match self {
            Self::Added(_) => "Added",
            Self::Modified(_) => "Modified",
            Self::Deleted(_) => "Deleted",
            Self::Other { kind } => kind,
        }
    }
}

/// Access to config objects in the cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Lists objects in `namespace` matching `selector`.
    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> ClusterResult<Vec<ConfigObject>>;

    /// Reads one object; `Ok(None)` when it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> ClusterResult<Option<ConfigObject>>;

    /// Merges `entries` into the object's payload, creating the object when
    /// it does not exist yet.
    async fn update(
        &self,
        namespace: &str,
        name: &str,
        entries: BTreeMap<String, String>,
    ) -> ClusterResult<()>;

    /// Opens a change stream over objects matching `selector`.
    async fn watch(&self, namespace: &str, selector: &LabelSelector)
    -> ClusterResult<WatchStream>;

    /// Verifies the cluster is reachable and the namespace can be read.
    async fn check_access(&self, namespace: &str) -> ClusterResult<()>;
}
