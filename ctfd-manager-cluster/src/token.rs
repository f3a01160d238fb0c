//! Persisted remote access token.

use crate::client::ClusterClient;
use crate::error::ClusterResult;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const ACCESS_TOKEN_OBJECT: &str = "ctfd-access-token";
pub const ACCESS_TOKEN_KEY: &str = "access_token";

#[derive(Clone)]
pub struct AccessTokenStore {
    cluster: Arc<dyn ClusterClient>,
    namespace: String,
}

impl AccessTokenStore {
    pub fn new(cluster: Arc<dyn ClusterClient>, namespace: impl Into<String>) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
        }
    }

    /// The stored token, or `None` before setup has run.
    pub async fn load(&self) -> ClusterResult<Option<String>> {
        let object = self.cluster.get(&self.namespace, ACCESS_TOKEN_OBJECT).await?;
        Ok(object
            .and_then(|o| o.data.get(ACCESS_TOKEN_KEY).cloned())
            .filter(|token| !token.is_empty()))
    }

    pub async fn store(&self, token: &str) -> ClusterResult<()> {
        let entries = BTreeMap::from([(ACCESS_TOKEN_KEY.to_string(), token.to_string())]);
        self.cluster
            .update(&self.namespace, ACCESS_TOKEN_OBJECT, entries)
            .await
    }
}
