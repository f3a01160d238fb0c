use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Process-wide liveness flag shared by the watch loop and the HTTP surface.
#[derive(Clone, Debug)]
pub struct HealthFlag(Arc<AtomicBool>);

impl HealthFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_healthy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set_healthy(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn set_unhealthy(&self) {
        if self.0.swap(false, Ordering::SeqCst) {
            warn!("Service marked as unhealthy");
        }
    }
}

impl Default for HealthFlag {
    fn default() -> Self {
        Self::new()
    }
}
