//! Remote sync adapter: idempotent create/update/disable against the scoring
//! platform.
//!
//! Each challenge or page is either absent remotely or bound to a remote id.
//! Upsert walks `absent → bound` (create) or `bound → bound` (patch and replace
//! sub-resources); removal hides challenges and deletes pages. No call is
//! retried here; the next watch event for the object is the retry.

use ctfd_manager_cluster::{BindingStore, ClusterClient, FingerprintStore};
use ctfd_manager_remote::{ContentService, SourceControl};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Repository placeholders that are never uploaded.
pub const IGNORED_FILES: [&str; 2] = [".gitignore", ".gitkeep"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Namespace holding the binding, fingerprint and mapping objects.
    pub namespace: String,
    /// `owner/name` of the repository challenge files are read from.
    pub source_repository: String,
    pub source_branch: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            source_repository: String::new(),
            source_branch: "main".to_string(),
        }
    }
}

pub struct SyncAdapter {
    pub(crate) content: Arc<dyn ContentService>,
    pub(crate) source: Arc<dyn SourceControl>,
    pub(crate) cluster: Arc<dyn ClusterClient>,
    pub(crate) challenge_bindings: BindingStore,
    pub(crate) page_bindings: BindingStore,
    pub(crate) fingerprints: FingerprintStore,
    pub(crate) config: AdapterConfig,
}

impl SyncAdapter {
    pub fn new(
        content: Arc<dyn ContentService>,
        source: Arc<dyn SourceControl>,
        cluster: Arc<dyn ClusterClient>,
        config: AdapterConfig,
    ) -> Self {
        let namespace = config.namespace.clone();
        Self {
            challenge_bindings: BindingStore::challenges(cluster.clone(), namespace.clone()),
            page_bindings: BindingStore::pages(cluster.clone(), namespace.clone()),
            fingerprints: FingerprintStore::new(cluster.clone(), namespace),
            content,
            source,
            cluster,
            config,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn challenge_bindings(&self) -> &BindingStore {
        &self.challenge_bindings
    }

    pub fn page_bindings(&self) -> &BindingStore {
        &self.page_bindings
    }

    pub fn fingerprints(&self) -> &FingerprintStore {
        &self.fingerprints
    }
}
