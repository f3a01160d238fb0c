//! Reconciliation engine for the CTFd manager.
//!
//! [`Reconciler`] owns the watch over labeled config objects and feeds every
//! event through classify → fingerprint check → extract → [`SyncAdapter`] →
//! fingerprint store, strictly one event at a time.

pub mod adapter;
mod challenges;
pub mod error;
pub mod health;
mod pages;
pub mod reconciler;

pub use adapter::{AdapterConfig, IGNORED_FILES, SyncAdapter};
pub use error::{SyncError, SyncResult};
pub use health::HealthFlag;
pub use reconciler::{EventOutcome, Reconciler, ReconcilerConfig, ReconnectPolicy};
