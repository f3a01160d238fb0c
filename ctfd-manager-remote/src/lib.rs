//! Remote collaborators for the CTFd manager.
//!
//! - [`ContentService`] / [`CtfdClient`]: the CTF scoring platform's REST API
//! - [`SourceControl`] / [`GithubClient`]: file listings and contents from the
//!   challenge repository

pub mod config;
pub mod ctfd;
pub mod error;
pub mod github;
pub mod service;
pub mod source;
pub mod types;

pub use config::{CtfdConfig, GithubConfig};
pub use ctfd::CtfdClient;
pub use error::{RemoteError, RemoteResult};
pub use github::GithubClient;
pub use service::ContentService;
pub use source::{EntryKind, RepoEntry, SourceControl};
pub use types::*;
