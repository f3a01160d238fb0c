//! Cluster access for the CTFd manager.
//!
//! Everything the manager reads from or persists to the orchestration cluster
//! goes through [`ClusterClient`]. On top of it sit the small persisted maps:
//! fingerprints, remote bindings, the mapping table and the access token.

pub mod bindings;
pub mod client;
pub mod error;
pub mod fingerprint;
pub mod k8s;
pub mod mapping;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod token;

pub use bindings::{Binding, BindingStore, CHALLENGE_BINDINGS, PAGE_BINDINGS, UNBOUND_SENTINEL};
pub use client::{ClusterClient, LabelSelector, WatchEvent, WatchStream};
pub use error::{ClusterError, ClusterResult};
pub use fingerprint::{FINGERPRINT_STORE, FingerprintStore, compute_fingerprint};
pub use k8s::KubeCluster;
pub use mapping::{MAPPING_OBJECT, load_mapping_table};
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryCluster;
pub use token::{ACCESS_TOKEN_KEY, ACCESS_TOKEN_OBJECT, AccessTokenStore};
