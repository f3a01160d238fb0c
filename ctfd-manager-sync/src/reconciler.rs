//! The reconciliation loop over the config-object watch.
//!
//! The loop is a small state machine: `Connecting` opens a watch, `Streaming`
//! drains it one event at a time, `Closed` marks the service unhealthy and
//! goes back to `Connecting`. Every reconnect replays the current objects, so
//! fingerprints are what keep a reconnect from re-uploading everything.

use crate::adapter::SyncAdapter;
use crate::error::{SyncError, SyncResult};
use crate::health::HealthFlag;
use ctfd_manager_cluster::{ClusterClient, LabelSelector, WatchEvent, WatchStream, compute_fingerprint};
use ctfd_manager_types::{
    CONFIG_OBJECT_LABEL, ConfigObject, ObjectKind, classify, extract_challenge, extract_page,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

// ── Configuration ──

/// Delay applied between reconnect attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Reconnect with no delay.
    Immediate,
    /// Double the delay per consecutive attempt, starting at `initial` and
    /// capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (zero based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Immediate => Duration::ZERO,
            Self::Exponential { initial, max } => {
                initial.saturating_mul(1 << attempt.min(16)).min(max)
            }
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    /// Namespace watched for config objects.
    pub namespace: String,
    pub reconnect: ReconnectPolicy,
    /// Consecutive failed watch opens before `run` gives up.
    pub max_connect_attempts: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            reconnect: ReconnectPolicy::default(),
            max_connect_attempts: 10,
        }
    }
}

// ── Outcomes ──

/// What processing one watch event did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// The object is not a challenge or page config.
    Skipped,
    /// Fingerprint matched; nothing was sent.
    Unchanged,
    /// Upserted; carries the remote id.
    Synced(i64),
    /// The object failed validation and stays unsynced.
    Invalid,
    /// A remote or store call failed; the next event is the retry.
    Failed,
    Removed,
    /// Not an add, modify or delete.
    Ignored,
}

enum WatchState {
    Connecting,
    Streaming(WatchStream),
    Closed { delivered: usize },
}

// ── Reconciler ──

pub struct Reconciler {
    cluster: Arc<dyn ClusterClient>,
    adapter: Arc<SyncAdapter>,
    health: HealthFlag,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        adapter: Arc<SyncAdapter>,
        health: HealthFlag,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            cluster,
            adapter,
            health,
            config,
        }
    }

    pub fn adapter(&self) -> &Arc<SyncAdapter> {
        &self.adapter
    }

    pub fn health(&self) -> &HealthFlag {
        &self.health
    }

    /// Watches config objects until the watch can no longer be opened.
    ///
    /// Only returns once `max_connect_attempts` consecutive opens have failed.
    pub async fn run(&self) -> SyncResult<()> {
        let selector = LabelSelector::Exists(CONFIG_OBJECT_LABEL.to_string());
        let namespace = self.config.namespace.as_str();
        let max_attempts = self.config.max_connect_attempts.max(1);

        let mut state = WatchState::Connecting;
        let mut failed_opens: u32 = 0;
        let mut idle_closes: u32 = 0;

        info!("[WATCH] Starting watch on namespace {namespace}");
        loop {
            state = match state {
                WatchState::Connecting => match self.cluster.watch(namespace, &selector).await {
                    Ok(stream) => {
                        if failed_opens > 0 {
                            info!("[WATCH] Watch reopened after {failed_opens} failed attempts");
                        }
                        failed_opens = 0;
                        self.health.set_healthy();
                        WatchState::Streaming(stream)
                    }
                    Err(e) => {
                        failed_opens += 1;
                        if failed_opens >= max_attempts {
                            error!("[WATCH] Giving up after {failed_opens} failed watch opens: {e}");
                            return Err(SyncError::Connection(e.to_string()));
                        }
                        let delay = self.config.reconnect.delay(failed_opens - 1);
                        warn!("[WATCH] Failed to open watch (attempt {failed_opens}): {e}, retrying in {delay:?}");
                        pause(delay).await;
                        WatchState::Connecting
                    }
                },
                WatchState::Streaming(mut stream) => {
                    let mut delivered = 0;
                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(event) => {
                                delivered += 1;
                                self.process_event(&event).await;
                            }
                            Err(e) => {
                                warn!("[WATCH] Watch stream failed: {e}");
                                break;
                            }
                        }
                    }
                    WatchState::Closed { delivered }
                }
                WatchState::Closed { delivered } => {
                    self.health.set_unhealthy();
                    if delivered == 0 {
                        let delay = self.config.reconnect.delay(idle_closes);
                        idle_closes = idle_closes.saturating_add(1);
                        info!("[WATCH] Watch closed without events, reconnecting in {delay:?}");
                        pause(delay).await;
                    } else {
                        idle_closes = 0;
                        info!("[WATCH] Watch closed after {delivered} events, reconnecting");
                    }
                    WatchState::Connecting
                }
            };
        }
    }

    /// Runs one watch event through the pipeline.
    pub async fn process_event(&self, event: &WatchEvent) -> EventOutcome {
        match event {
            WatchEvent::Added(object) | WatchEvent::Modified(object) => self.apply(object).await,
            WatchEvent::Deleted(object) => self.remove(object).await,
            WatchEvent::Other { kind } => {
                info!("[WATCH] Ignoring {kind} event");
                EventOutcome::Ignored
            }
        }
    }

    /// Syncs `object` regardless of its stored fingerprint.
    pub async fn force_sync(&self, object: &ConfigObject) -> SyncResult<i64> {
        let kind = classify(object);
        if kind == ObjectKind::Unknown {
            return Err(SyncError::NotManaged(object.name.clone()));
        }

        let id = self.sync_object(kind, object).await?;
        self.record_fingerprint(object).await;
        Ok(id)
    }

    async fn apply(&self, object: &ConfigObject) -> EventOutcome {
        let kind = classify(object);
        if kind == ObjectKind::Unknown {
            debug!("[SYNC] Skipping {}: not a managed config", object.name);
            return EventOutcome::Skipped;
        }

        let fingerprint = compute_fingerprint(&object.data);
        match self.adapter.fingerprints.stored(&object.name).await {
            Ok(Some(stored)) if stored == fingerprint => {
                info!("[SYNC] {} {} is already deployed", kind.as_str(), object.name);
                return EventOutcome::Unchanged;
            }
            Ok(_) => {}
            Err(e) => warn!("[SYNC] Could not read fingerprint for {}: {e}", object.name),
        }

        match self.sync_object(kind, object).await {
            Ok(id) => {
                self.store_fingerprint(&object.name, &fingerprint).await;
                info!("[SYNC] Synced {} {} ({id})", kind.as_str(), object.name);
                EventOutcome::Synced(id)
            }
            Err(SyncError::Validation(e)) => {
                error!("[SYNC] Invalid {} {}: {e}", kind.as_str(), object.name);
                EventOutcome::Invalid
            }
            Err(e) => {
                error!("[SYNC] Failed to sync {} {}: {e}", kind.as_str(), object.name);
                EventOutcome::Failed
            }
        }
    }

    async fn remove(&self, object: &ConfigObject) -> EventOutcome {
        let kind = classify(object);
        let result = match kind {
            ObjectKind::Unknown => {
                debug!("[SYNC] Skipping deletion of {}: not a managed config", object.name);
                return EventOutcome::Skipped;
            }
            ObjectKind::Challenge => match extract_challenge(object) {
                Ok(record) => self.adapter.disable_challenge(&object.name, &record).await,
                Err(e) => {
                    warn!("[SYNC] Cannot read deleted challenge {}: {e}", object.name);
                    Ok(())
                }
            },
            ObjectKind::Page => match extract_page(object) {
                Ok(record) => self.adapter.delete_page(&record.slug).await.map(|_| ()),
                Err(e) => {
                    warn!("[SYNC] Cannot read deleted page {}: {e}", object.name);
                    Ok(())
                }
            },
        };

        if let Err(e) = self.adapter.fingerprints.clear(&object.name).await {
            warn!("[SYNC] Failed to clear fingerprint for {}: {e}", object.name);
        }

        match result {
            Ok(()) => {
                info!("[SYNC] Removed {} {}", kind.as_str(), object.name);
                EventOutcome::Removed
            }
            Err(e) => {
                error!("[SYNC] Failed to remove {} {}: {e}", kind.as_str(), object.name);
                EventOutcome::Failed
            }
        }
    }

    async fn sync_object(&self, kind: ObjectKind, object: &ConfigObject) -> SyncResult<i64> {
        match kind {
            ObjectKind::Challenge => {
                let record = extract_challenge(object)?;
                self.adapter.upsert_challenge(&record).await
            }
            ObjectKind::Page => {
                let record = extract_page(object)?;
                self.adapter.upsert_page(&record).await
            }
            ObjectKind::Unknown => Err(SyncError::NotManaged(object.name.clone())),
        }
    }

    async fn record_fingerprint(&self, object: &ConfigObject) {
        let fingerprint = compute_fingerprint(&object.data);
        self.store_fingerprint(&object.name, &fingerprint).await;
    }

    // A lost fingerprint only costs a redundant sync on the next event.
    async fn store_fingerprint(&self, name: &str, fingerprint: &str) {
        if let Err(e) = self.adapter.fingerprints.store(name, fingerprint).await {
            warn!("[SYNC] Failed to store fingerprint for {name}: {e}");
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
