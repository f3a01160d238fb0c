//! [`ClusterClient`] backed by Kubernetes ConfigMaps.

use crate::client::{ClusterClient, LabelSelector, WatchEvent, WatchStream};
use crate::error::{ClusterError, ClusterResult};
use async_trait::async_trait;
use ctfd_manager_types::ConfigObject;
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Client;
use kube::api::{
    Api, ListParams, ObjectMeta, Patch, PatchParams, PostParams, WatchEvent as ApiWatchEvent,
    WatchParams,
};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Resource version that makes the API server replay current state first.
const WATCH_FROM_START: &str = "0";

/// Kubernetes-backed cluster access.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the in-cluster or local kube config and probes
    /// the API server version.
    pub async fn connect() -> ClusterResult<Self> {
        let client = Client::try_default().await?;
        let version = client.apiserver_version().await?;
        info!(
            version = %version.git_version,
            platform = %version.platform,
            "connected to cluster API server"
        );
        Ok(Self { client })
    }

    fn api(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn to_object(map: ConfigMap) -> ConfigObject {
    ConfigObject {
        namespace: map.metadata.namespace.unwrap_or_default(),
        name: map.metadata.name.unwrap_or_default(),
        labels: map.metadata.labels.unwrap_or_default(),
        data: map.data.unwrap_or_default(),
    }
}

fn to_event(event: ApiWatchEvent<ConfigMap>) -> WatchEvent {
    match event {
        ApiWatchEvent::Added(map) => WatchEvent::Added(to_object(map)),
        ApiWatchEvent::Modified(map) => WatchEvent::Modified(to_object(map)),
        ApiWatchEvent::Deleted(map) => WatchEvent::Deleted(to_object(map)),
        ApiWatchEvent::Bookmark(_) => WatchEvent::Other {
            kind: "Bookmark".to_string(),
        },
        ApiWatchEvent::Error(err) => {
            debug!(?err, "watch delivered an error event");
            WatchEvent::Other {
                kind: "Error".to_string(),
            }
        }
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> ClusterResult<Vec<ConfigObject>> {
        let params = ListParams::default().labels(&selector.to_query());
        let maps = self.api(namespace).list(&params).await?;
        Ok(maps.items.into_iter().map(to_object).collect())
    }

    async fn get(&self, namespace: &str, name: &str) -> ClusterResult<Option<ConfigObject>> {
        Ok(self.api(namespace).get_opt(name).await?.map(to_object))
    }

    async fn update(
        &self,
        namespace: &str,
        name: &str,
        entries: BTreeMap<String, String>,
    ) -> ClusterResult<()> {
        let api = self.api(namespace);

        if api.get_opt(name).await?.is_none() {
            let map = ConfigMap {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    namespace: Some(namespace.to_string()),
                    ..Default::default()
                },
                data: Some(entries),
                ..Default::default()
            };
            api.create(&PostParams::default(), &map).await?;
            debug!(namespace, name, "created backing config map");
            return Ok(());
        }

        let patch = json!({ "data": entries });
        api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn watch(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> ClusterResult<WatchStream> {
        let params = WatchParams::default().labels(&selector.to_query());
        let stream = self
            .api(namespace)
            .watch(&params, WATCH_FROM_START)
            .await
            .map_err(|e| ClusterError::Connection(e.to_string()))?;

        Ok(stream
            .map(|item| item.map(to_event).map_err(ClusterError::from))
            .boxed())
    }

    async fn check_access(&self, namespace: &str) -> ClusterResult<()> {
        self.api(namespace)
            .list(&ListParams::default().limit(1))
            .await
            .map_err(|e| ClusterError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
