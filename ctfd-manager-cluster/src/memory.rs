//! In-process [`ClusterClient`] with scripted watch streams.

use crate::client::{ClusterClient, LabelSelector, WatchEvent, WatchStream};
use crate::error::{ClusterError, ClusterResult};
use async_trait::async_trait;
use ctfd_manager_types::ConfigObject;
use futures::StreamExt;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

type ObjectKey = (String, String);

/// Config objects held in memory.
///
/// Each call to `watch` consumes the next queued script: either a finite list
/// of events (the stream closes after the last one) or a scripted open
/// failure. With nothing queued, opening a watch fails.
#[derive(Default)]
pub struct MemoryCluster {
    objects: Mutex<BTreeMap<ObjectKey, ConfigObject>>,
    watch_scripts: Mutex<VecDeque<Option<Vec<WatchEvent>>>>,
    watch_opens: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, object: ConfigObject) {
        let key = (object.namespace.clone(), object.name.clone());
        self.objects.lock().await.insert(key, object);
    }

    pub async fn remove(&self, namespace: &str, name: &str) -> Option<ConfigObject> {
        self.objects
            .lock()
            .await
            .remove(&(namespace.to_string(), name.to_string()))
    }

    /// Snapshot of one object, bypassing the availability switch.
    pub async fn object(&self, namespace: &str, name: &str) -> Option<ConfigObject> {
        self.objects
            .lock()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Queues a stream that yields `events` and then closes.
    pub async fn push_watch_script(&self, events: Vec<WatchEvent>) {
        self.watch_scripts.lock().await.push_back(Some(events));
    }

    /// Queues a failed watch open.
    pub async fn push_watch_failure(&self) {
        self.watch_scripts.lock().await.push_back(None);
    }

    /// Number of watch opens attempted so far.
    pub fn watch_opens(&self) -> usize {
        self.watch_opens.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail as if the API server were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> ClusterResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ClusterError::Unavailable(
                "memory cluster switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for MemoryCluster {
    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> ClusterResult<Vec<ConfigObject>> {
        self.ensure_available()?;
        Ok(self
            .objects
            .lock()
            .await
            .values()
            .filter(|o| o.namespace == namespace && selector.matches(&o.labels))
            .cloned()
            .collect())
    }

    async fn get(&self, namespace: &str, name: &str) -> ClusterResult<Option<ConfigObject>> {
        self.ensure_available()?;
        Ok(self.object(namespace, name).await)
    }

    async fn update(
        &self,
        namespace: &str,
        name: &str,
        entries: BTreeMap<String, String>,
    ) -> ClusterResult<()> {
        self.ensure_available()?;
        let mut objects = self.objects.lock().await;
        let object = objects
            .entry((namespace.to_string(), name.to_string()))
            .or_insert_with(|| ConfigObject::new(namespace, name));
        object.data.extend(entries);
        Ok(())
    }

    async fn watch(
        &self,
        _namespace: &str,
        _selector: &LabelSelector,
    ) -> ClusterResult<WatchStream> {
        self.watch_opens.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ClusterError::Connection("cluster unavailable".to_string()));
        }

        match self.watch_scripts.lock().await.pop_front() {
            Some(Some(events)) => Ok(futures::stream::iter(events.into_iter().map(Ok)).boxed()),
            Some(None) => Err(ClusterError::Connection("scripted open failure".to_string())),
            None => Err(ClusterError::Connection("no watch script queued".to_string())),
        }
    }

    async fn check_access(&self, _namespace: &str) -> ClusterResult<()> {
        self.ensure_available()
    }
}
