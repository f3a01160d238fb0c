//! [`SourceControl`] over the GitHub contents API.

use crate::config::GithubConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::source::{RepoEntry, SourceControl};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Files above this size come back without inline content.
pub const INLINE_CONTENT_LIMIT: u64 = 1024 * 1024;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

#[derive(Deserialize)]
struct FileContents {
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

pub struct GithubClient {
    client: Client,
    config: GithubConfig,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("ctfd-manager/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// Probes the configured user. Failures are logged; the client stays
    /// usable since public repositories work without a token.
    pub async fn check_access(&self) {
        let Some(user) = self.config.user.as_deref() else {
            warn!("no GitHub user configured, skipping access check");
            return;
        };

        let url = format!("{}/users/{user}", self.base_url());
        match self.get(&url, JSON_MEDIA_TYPE).send().await {
            Ok(resp) if resp.status().is_success() => info!(user, "GitHub access verified"),
            Ok(resp) => warn!(user, status = %resp.status(), "GitHub access check failed"),
            Err(e) => warn!(user, error = %e, "GitHub access check failed"),
        }
    }

    fn base_url(&self) -> &str {
        self.config.api_base_url.trim_end_matches('/')
    }

    fn contents_url(&self, repo: &str, branch: &str, path: &str) -> RemoteResult<String> {
        let (owner, name) = split_repo(repo)?;
        Ok(format!(
            "{}/repos/{owner}/{name}/contents/{}?ref={branch}",
            self.base_url(),
            path.trim_matches('/')
        ))
    }

    fn get(&self, url: &str, media_type: &str) -> RequestBuilder {
        let request = self.client.get(url).header(ACCEPT, media_type);
        match self.config.token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn split_repo(repo: &str) -> RemoteResult<(&str, &str)> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(RemoteError::InvalidRepository(repo.to_string())),
    }
}

async fn check(resp: Response, path: &str) -> RemoteResult<Response> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound(path.to_string()));
    }
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(RemoteError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}

/// Collects a raw download chunk by chunk into a buffer sized from the
/// contents metadata, so large files are not copied twice.
async fn read_raw_body(resp: Response, expected_size: u64) -> RemoteResult<Vec<u8>> {
    let mut body = Vec::with_capacity(usize::try_from(expected_size).unwrap_or(0));
    let mut chunks = resp.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        body.extend_from_slice(&chunk?);
    }
    Ok(body)
}

#[async_trait]
impl SourceControl for GithubClient {
    async fn list_dir(&self, repo: &str, branch: &str, path: &str) -> RemoteResult<Vec<RepoEntry>> {
        let url = self.contents_url(repo, branch, path)?;
        let resp = check(self.get(&url, JSON_MEDIA_TYPE).send().await?, path).await?;
        Ok(resp.json().await?)
    }

    async fn fetch_file(&self, repo: &str, branch: &str, path: &str) -> RemoteResult<Vec<u8>> {
        let url = self.contents_url(repo, branch, path)?;
        let resp = check(self.get(&url, JSON_MEDIA_TYPE).send().await?, path).await?;
        let file: FileContents = resp.json().await?;

        if file.size > INLINE_CONTENT_LIMIT || file.encoding == "none" {
            debug!(path, size = file.size, "downloading raw file contents");
            let resp = check(self.get(&url, RAW_MEDIA_TYPE).send().await?, path).await?;
            return read_raw_body(resp, file.size).await;
        }

        let cleaned: String = file
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        STANDARD
            .decode(cleaned)
            .map_err(|e| RemoteError::Decode(format!("{path}: {e}")))
    }
}
