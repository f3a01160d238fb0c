//! Content fingerprints used to suppress redundant syncs.

use crate::client::ClusterClient;
use crate::error::ClusterResult;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Backing object holding one fingerprint per config object name.
pub const FINGERPRINT_STORE: &str = "challenge-configmap-hashset";

/// SHA-256 over the sorted-key JSON encoding of a payload, hex encoded.
///
/// Two payloads with the same entries produce the same fingerprint no matter
/// the order they were inserted in.
pub fn compute_fingerprint<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let sorted: BTreeMap<&str, &str> = entries
        .into_iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    // A map of strings always serializes.
    let encoded = serde_json::to_vec(&sorted).unwrap_or_default();
    hex::encode(Sha256::digest(&encoded))
}

/// Persistent name → fingerprint map.
#[derive(Clone)]
pub struct FingerprintStore {
    cluster: Arc<dyn ClusterClient>,
    namespace: String,
}

impl FingerprintStore {
    pub fn new(cluster: Arc<dyn ClusterClient>, namespace: impl Into<String>) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
        }
    }

    /// Fingerprint last recorded for `name`, if any. An empty entry counts as
    /// none.
    pub async fn stored(&self, name: &str) -> ClusterResult<Option<String>> {
        let object = self.cluster.get(&self.namespace, FINGERPRINT_STORE).await?;
        Ok(object
            .and_then(|o| o.data.get(name).cloned())
            .filter(|fp| !fp.is_empty()))
    }

    pub async fn store(&self, name: &str, fingerprint: &str) -> ClusterResult<()> {
        self.write(name, fingerprint).await
    }

    /// Forgets the fingerprint so the next event for `name` syncs again.
    pub async fn clear(&self, name: &str) -> ClusterResult<()> {
        self.write(name, "").await
    }

    async fn write(&self, name: &str, value: &str) -> ClusterResult<()> {
        let entries = BTreeMap::from([(name.to_string(), value.to_string())]);
        self.cluster
            .update(&self.namespace, FINGERPRINT_STORE, entries)
            .await
    }
}
