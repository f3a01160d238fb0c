#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use ctfd_manager_cluster::MemoryCluster;
use ctfd_manager_remote::{
    CtfdClient, CtfdConfig, EntryKind, RemoteError, RemoteResult, RepoEntry, SourceControl,
};
use ctfd_manager_server::{AppState, ManagerConfig, router};
use ctfd_manager_types::{CHALLENGE_LABEL_VALUE, CONFIG_OBJECT_LABEL, ConfigObject};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const NS: &str = "ctf";
pub const PASSWORD: &str = "hunter2";
pub const FOO_FILES: &str = "/foo/k8s/files";

// --- Fake source control ---

#[derive(Default)]
pub struct FakeSource {
    files: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl FakeSource {
    pub fn add_file(&self, dir: &str, name: &str, content: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .entry(dir.to_string())
            .or_default()
            .insert(name.to_string(), content.to_vec());
    }
}

#[async_trait]
impl SourceControl for FakeSource {
    async fn list_dir(&self, _repo: &str, _branch: &str, path: &str) -> RemoteResult<Vec<RepoEntry>> {
        let files = self.files.lock().unwrap();
        let dir = files
            .get(path)
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))?;
        Ok(dir
            .iter()
            .map(|(name, content)| RepoEntry {
                name: name.clone(),
                path: format!("{path}/{name}"),
                size: content.len() as u64,
                kind: EntryKind::File,
                download_url: None,
            })
            .collect())
    }

    async fn fetch_file(&self, _repo: &str, _branch: &str, path: &str) -> RemoteResult<Vec<u8>> {
        let (dir, name) = path
            .rsplit_once('/')
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))?;
        self.files
            .lock()
            .unwrap()
            .get(dir)
            .and_then(|files| files.get(name))
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))
    }
}

// --- App ---

pub struct TestApp {
    pub state: AppState,
    pub cluster: Arc<MemoryCluster>,
    pub source: Arc<FakeSource>,
}

pub fn config(ctfd_url: &str) -> ManagerConfig {
    ManagerConfig::from_lookup(|key| match key {
        "PASSWORD" => Some(PASSWORD.to_string()),
        "VERSION" => Some("1.2.3".to_string()),
        "NAMESPACE" => Some(NS.to_string()),
        "CTFD_URL" => Some(ctfd_url.to_string()),
        "GITHUB_REPO" => Some("org/repo".to_string()),
        _ => None,
    })
    .unwrap()
}

impl TestApp {
    /// App whose CTFd client points at `ctfd_url`.
    pub fn new(ctfd_url: &str) -> Self {
        let config = config(ctfd_url);
        let cluster = Arc::new(MemoryCluster::new());
        let source = Arc::new(FakeSource::default());
        let ctfd = Arc::new(CtfdClient::new(CtfdConfig {
            base_url: ctfd_url.to_string(),
            timeout_secs: 5,
        })
        .unwrap());
        let state = AppState::new(config, cluster.clone(), ctfd, source.clone());
        Self {
            state,
            cluster,
            source,
        }
    }

    /// App that never talks to CTFd.
    pub fn offline() -> Self {
        Self::new("http://127.0.0.1:9")
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", token);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> Reply {
        self.call(Method::GET, uri, Some(&format!("Bearer {PASSWORD}")), None)
            .await
    }

    pub async fn get_anonymous(&self, uri: &str) -> Reply {
        self.call(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Option<Value>) -> Reply {
        self.call(Method::POST, uri, Some(&format!("Bearer {PASSWORD}")), body)
            .await
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

// --- Fixtures ---

pub fn challenge_object(name: &str, slug: &str) -> ConfigObject {
    let blob = json!({
        "enabled": true,
        "name": "Foo",
        "slug": slug,
        "category": "web",
        "difficulty": "easy",
        "tags": ["intro"],
        "type": "static",
        "flag": [{"flag": "CTF{foo}", "case_sensitive": false}],
        "points": 500,
        "min_points": 100
    });
    ConfigObject::new(NS, name)
        .with_label(CONFIG_OBJECT_LABEL, CHALLENGE_LABEL_VALUE)
        .with_entry("name", "Foo")
        .with_entry("path", "/foo")
        .with_entry("repository", "org/repo")
        .with_entry("challenge", blob.to_string())
        .with_entry("description", "l1\nl2\nBody")
}
