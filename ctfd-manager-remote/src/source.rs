use crate::error::RemoteResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// One entry of a repository directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Read access to a source-control repository at a given branch.
///
/// `repo` is `owner/name`. A missing path is reported as
/// [`RemoteError::NotFound`](crate::RemoteError::NotFound).
#[async_trait]
pub trait SourceControl: Send + Sync {
    async fn list_dir(&self, repo: &str, branch: &str, path: &str) -> RemoteResult<Vec<RepoEntry>>;
    async fn fetch_file(&self, repo: &str, branch: &str, path: &str) -> RemoteResult<Vec<u8>>;
}
