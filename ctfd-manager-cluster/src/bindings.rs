//! Local identity → remote id bindings.

use crate::client::ClusterClient;
use crate::error::{ClusterError, ClusterResult};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Backing object for challenge bindings, keyed by challenge slug.
pub const CHALLENGE_BINDINGS: &str = "ctfd-challenges";

/// Backing object for page bindings, keyed by page slug.
pub const PAGE_BINDINGS: &str = "ctfd-pages";

/// Value written when a binding is released.
pub const UNBOUND_SENTINEL: &str = "0";

/// Binding state of one local identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Absent,
    Bound(i64),
}

impl Binding {
    pub fn id(self) -> Option<i64> {
        match self {
            Self::Absent => None,
            Self::Bound(id) => Some(id),
        }
    }

    fn parse(object: &str, key: &str, raw: &str) -> ClusterResult<Self> {
        if raw.is_empty() || raw == UNBOUND_SENTINEL {
            return Ok(Self::Absent);
        }
        raw.parse::<i64>()
            .map(Self::Bound)
            .map_err(|e| ClusterError::Decode {
                object: object.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Persistent map from a local identity to the remote id it was synced to.
#[derive(Clone)]
pub struct BindingStore {
    cluster: Arc<dyn ClusterClient>,
    namespace: String,
    object_name: &'static str,
}

impl BindingStore {
    pub fn challenges(cluster: Arc<dyn ClusterClient>, namespace: impl Into<String>) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
            object_name: CHALLENGE_BINDINGS,
        }
    }

    pub fn pages(cluster: Arc<dyn ClusterClient>, namespace: impl Into<String>) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
            object_name: PAGE_BINDINGS,
        }
    }

    pub async fn get(&self, key: &str) -> ClusterResult<Binding> {
        let object = self.cluster.get(&self.namespace, self.object_name).await?;
        match object.as_ref().and_then(|o| o.entry(key)) {
            Some(raw) => Binding::parse(self.object_name, key, raw),
            None => Ok(Binding::Absent),
        }
    }

    pub async fn bind(&self, key: &str, id: i64) -> ClusterResult<()> {
        self.write(key, id.to_string()).await
    }

    pub async fn unbind(&self, key: &str) -> ClusterResult<()> {
        self.write(key, UNBOUND_SENTINEL.to_string()).await
    }

    /// Every currently bound identity.
    pub async fn all(&self) -> ClusterResult<BTreeMap<String, i64>> {
        let Some(object) = self.cluster.get(&self.namespace, self.object_name).await? else {
            return Ok(BTreeMap::new());
        };

        let mut bound = BTreeMap::new();
        for (key, raw) in &object.data {
            if let Binding::Bound(id) = Binding::parse(self.object_name, key, raw)? {
                bound.insert(key.clone(), id);
            }
        }
        Ok(bound)
    }

    async fn write(&self, key: &str, value: String) -> ClusterResult<()> {
        let entries = BTreeMap::from([(key.to_string(), value)]);
        self.cluster
            .update(&self.namespace, self.object_name, entries)
            .await
    }
}
