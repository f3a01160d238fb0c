use crate::config::ManagerConfig;
use ctfd_manager_cluster::ClusterClient;
use ctfd_manager_remote::{CtfdClient, SourceControl};
use ctfd_manager_sync::{HealthFlag, Reconciler, SyncAdapter};
use std::sync::Arc;

/// Shared handles for request handlers and the watch loop.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ManagerConfig>,
    pub cluster: Arc<dyn ClusterClient>,
    pub ctfd: Arc<CtfdClient>,
    pub source: Arc<dyn SourceControl>,
    pub reconciler: Arc<Reconciler>,
    pub health: HealthFlag,
}

impl AppState {
    /// Wires the sync engine on top of the given collaborators.
    pub fn new(
        config: ManagerConfig,
        cluster: Arc<dyn ClusterClient>,
        ctfd: Arc<CtfdClient>,
        source: Arc<dyn SourceControl>,
    ) -> Self {
        let health = HealthFlag::new();
        let adapter = Arc::new(SyncAdapter::new(
            ctfd.clone(),
            source.clone(),
            cluster.clone(),
            config.adapter_config(),
        ));
        let reconciler = Arc::new(Reconciler::new(
            cluster.clone(),
            adapter,
            health.clone(),
            config.reconciler_config(),
        ));

        Self {
            config: Arc::new(config),
            cluster,
            ctfd,
            source,
            reconciler,
            health,
        }
    }
}
