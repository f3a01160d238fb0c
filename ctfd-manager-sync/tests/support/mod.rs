#![allow(dead_code)]

use async_trait::async_trait;
use ctfd_manager_cluster::{
    ClusterClient, ClusterError, ClusterResult, FINGERPRINT_STORE, LabelSelector, MemoryCluster,
    WatchStream,
};
use ctfd_manager_remote::*;
use ctfd_manager_sync::{
    AdapterConfig, HealthFlag, Reconciler, ReconcilerConfig, ReconnectPolicy, SyncAdapter,
};
use ctfd_manager_types::{CHALLENGE_LABEL_VALUE, CONFIG_OBJECT_LABEL, ConfigObject, PAGE_LABEL_VALUE};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

pub const NS: &str = "ctf";
pub const REPO: &str = "org/repo";

// --- Fake content service ---

#[derive(Clone, Debug)]
pub struct StoredChallenge {
    pub params: ChallengeParams,
    pub state: ChallengeState,
}

#[derive(Default)]
pub struct ContentState {
    pub challenges: BTreeMap<i64, StoredChallenge>,
    pub files: BTreeMap<i64, (i64, String)>,
    pub flags: BTreeMap<i64, FlagParams>,
    pub tags: BTreeMap<i64, TagParams>,
    pub pages: BTreeMap<i64, PageParams>,
    pub calls: Vec<String>,
    failing: BTreeSet<&'static str>,
    next_id: i64,
}

impl ContentState {
    fn record(&mut self, op: &'static str) -> RemoteResult<()> {
        self.calls.push(op.to_string());
        if self.failing.contains(op) {
            return Err(RemoteError::Api {
                status: 500,
                message: format!("{op} failed"),
            });
        }
        Ok(())
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory scoring platform that records every call by operation name.
#[derive(Default)]
pub struct FakeContent {
    state: Mutex<ContentState>,
}

impl FakeContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, ContentState> {
        self.state.lock().unwrap()
    }

    /// Makes every later call to `op` fail with a 500.
    pub fn fail(&self, op: &'static str) {
        self.state().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.state().failing.remove(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.state().calls.iter().filter(|c| *c == op).count()
    }

    pub fn challenge(&self, id: i64) -> Option<StoredChallenge> {
        self.state().challenges.get(&id).cloned()
    }

    pub fn page(&self, id: i64) -> Option<PageParams> {
        self.state().pages.get(&id).cloned()
    }

    pub fn flags_of(&self, challenge: i64) -> Vec<FlagParams> {
        self.state()
            .flags
            .values()
            .filter(|f| f.challenge == challenge)
            .cloned()
            .collect()
    }

    pub fn tags_of(&self, challenge: i64) -> Vec<String> {
        self.state()
            .tags
            .values()
            .filter(|t| t.challenge == challenge)
            .map(|t| t.value.clone())
            .collect()
    }

    pub fn files_of(&self, challenge: i64) -> Vec<String> {
        self.state()
            .files
            .values()
            .filter(|(c, _)| *c == challenge)
            .map(|(_, name)| name.clone())
            .collect()
    }
}

fn remote_challenge(id: i64, stored: &StoredChallenge) -> RemoteChallenge {
    RemoteChallenge {
        id,
        name: stored.params.name.clone(),
        category: stored.params.category.clone(),
        state: Some(format!("{:?}", stored.state).to_lowercase()),
        challenge_type: stored.params.challenge_type.clone().unwrap_or_default(),
        value: Some(stored.params.value),
    }
}

fn remote_page(id: i64, page: &PageParams) -> RemotePage {
    RemotePage {
        id,
        title: page.title.clone(),
        route: page.route.clone(),
    }
}

#[async_trait]
impl ContentService for FakeContent {
    async fn list_challenges(&self) -> RemoteResult<Vec<RemoteChallenge>> {
        let mut state = self.state();
        state.record("list_challenges")?;
        Ok(state
            .challenges
            .iter()
            .map(|(id, c)| remote_challenge(*id, c))
            .collect())
    }

    async fn create_challenge(&self, params: &ChallengeParams) -> RemoteResult<RemoteChallenge> {
        let mut state = self.state();
        state.record("create_challenge")?;
        let id = state.next_id();
        let stored = StoredChallenge {
            params: params.clone(),
            state: params.state,
        };
        let remote = remote_challenge(id, &stored);
        state.challenges.insert(id, stored);
        Ok(remote)
    }

    async fn patch_challenge(
        &self,
        id: i64,
        params: &ChallengeParams,
    ) -> RemoteResult<RemoteChallenge> {
        let mut state = self.state();
        state.record("patch_challenge")?;
        let stored = state
            .challenges
            .get_mut(&id)
            .ok_or_else(|| RemoteError::NotFound(format!("challenge {id}")))?;
        let challenge_type = stored.params.challenge_type.clone();
        stored.params = params.clone();
        stored.params.challenge_type = challenge_type;
        stored.state = params.state;
        Ok(remote_challenge(id, stored))
    }

    async fn set_challenge_state(&self, id: i64, new_state: ChallengeState) -> RemoteResult<()> {
        let mut state = self.state();
        state.record("set_challenge_state")?;
        let stored = state
            .challenges
            .get_mut(&id)
            .ok_or_else(|| RemoteError::NotFound(format!("challenge {id}")))?;
        stored.state = new_state;
        Ok(())
    }

    async fn list_challenge_files(&self, challenge_id: i64) -> RemoteResult<Vec<RemoteFile>> {
        let mut state = self.state();
        state.record("list_challenge_files")?;
        Ok(state
            .files
            .iter()
            .filter(|(_, (c, _))| *c == challenge_id)
            .map(|(id, (_, name))| RemoteFile {
                id: *id,
                file_type: "challenge".to_string(),
                location: name.clone(),
            })
            .collect())
    }

    async fn upload_challenge_files(
        &self,
        challenge_id: i64,
        files: &[FileUpload],
    ) -> RemoteResult<Vec<RemoteFile>> {
        let mut state = self.state();
        state.record("upload_challenge_files")?;
        let mut uploaded = Vec::new();
        for file in files {
            let id = state.next_id();
            state.files.insert(id, (challenge_id, file.name.clone()));
            uploaded.push(RemoteFile {
                id,
                file_type: "challenge".to_string(),
                location: file.name.clone(),
            });
        }
        Ok(uploaded)
    }

    async fn delete_file(&self, id: i64) -> RemoteResult<()> {
        let mut state = self.state();
        state.record("delete_file")?;
        state.files.remove(&id);
        Ok(())
    }

    async fn list_challenge_flags(&self, challenge_id: i64) -> RemoteResult<Vec<RemoteFlag>> {
        let mut state = self.state();
        state.record("list_challenge_flags")?;
        Ok(state
            .flags
            .iter()
            .filter(|(_, f)| f.challenge == challenge_id)
            .map(|(id, f)| RemoteFlag {
                id: *id,
                content: f.content.clone(),
                flag_type: f.flag_type.clone(),
            })
            .collect())
    }

    async fn create_flag(&self, params: &FlagParams) -> RemoteResult<RemoteFlag> {
        let mut state = self.state();
        state.record("create_flag")?;
        let id = state.next_id();
        state.flags.insert(id, params.clone());
        Ok(RemoteFlag {
            id,
            content: params.content.clone(),
            flag_type: params.flag_type.clone(),
        })
    }

    async fn delete_flag(&self, id: i64) -> RemoteResult<()> {
        let mut state = self.state();
        state.record("delete_flag")?;
        state.flags.remove(&id);
        Ok(())
    }

    async fn list_challenge_tags(&self, challenge_id: i64) -> RemoteResult<Vec<RemoteTag>> {
        let mut state = self.state();
        state.record("list_challenge_tags")?;
        Ok(state
            .tags
            .iter()
            .filter(|(_, t)| t.challenge == challenge_id)
            .map(|(id, t)| RemoteTag {
                id: *id,
                value: t.value.clone(),
            })
            .collect())
    }

    async fn create_tag(&self, params: &TagParams) -> RemoteResult<RemoteTag> {
        let mut state = self.state();
        state.record("create_tag")?;
        let id = state.next_id();
        state.tags.insert(id, params.clone());
        Ok(RemoteTag {
            id,
            value: params.value.clone(),
        })
    }

    async fn delete_tag(&self, id: i64) -> RemoteResult<()> {
        let mut state = self.state();
        state.record("delete_tag")?;
        state.tags.remove(&id);
        Ok(())
    }

    async fn list_pages(&self) -> RemoteResult<Vec<RemotePage>> {
        let mut state = self.state();
        state.record("list_pages")?;
        Ok(state.pages.iter().map(|(id, p)| remote_page(*id, p)).collect())
    }

    async fn create_page(&self, params: &PageParams) -> RemoteResult<RemotePage> {
        let mut state = self.state();
        state.record("create_page")?;
        let id = state.next_id();
        state.pages.insert(id, params.clone());
        Ok(remote_page(id, params))
    }

    async fn patch_page(&self, id: i64, params: &PageParams) -> RemoteResult<RemotePage> {
        let mut state = self.state();
        state.record("patch_page")?;
        if !state.pages.contains_key(&id) {
            return Err(RemoteError::NotFound(format!("page {id}")));
        }
        state.pages.insert(id, params.clone());
        Ok(remote_page(id, params))
    }

    async fn delete_page(&self, id: i64) -> RemoteResult<()> {
        let mut state = self.state();
        state.record("delete_page")?;
        state
            .pages
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(format!("page {id}")))
    }
}

// --- Fake source control ---

/// Repository contents keyed by full path.
#[derive(Default)]
pub struct FakeSource {
    dirs: Mutex<BTreeMap<String, Vec<RepoEntry>>>,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, dir: &str, name: &str, content: &[u8]) {
        let path = format!("{dir}/{name}");
        self.dirs
            .lock()
            .unwrap()
            .entry(dir.to_string())
            .or_default()
            .push(RepoEntry {
                name: name.to_string(),
                path: path.clone(),
                size: content.len() as u64,
                kind: EntryKind::File,
                download_url: None,
            });
        self.files.lock().unwrap().insert(path, content.to_vec());
    }

    /// Lists a file whose contents cannot be fetched.
    pub fn add_broken_file(&self, dir: &str, name: &str) {
        self.dirs
            .lock()
            .unwrap()
            .entry(dir.to_string())
            .or_default()
            .push(RepoEntry {
                name: name.to_string(),
                path: format!("{dir}/{name}"),
                size: 1,
                kind: EntryKind::File,
                download_url: None,
            });
    }

    pub fn add_subdir(&self, dir: &str, name: &str) {
        self.dirs
            .lock()
            .unwrap()
            .entry(dir.to_string())
            .or_default()
            .push(RepoEntry {
                name: name.to_string(),
                path: format!("{dir}/{name}"),
                size: 0,
                kind: EntryKind::Dir,
                download_url: None,
            });
    }
}

#[async_trait]
impl SourceControl for FakeSource {
    async fn list_dir(&self, repo: &str, _branch: &str, path: &str) -> RemoteResult<Vec<RepoEntry>> {
        assert_eq!(repo, REPO);
        self.dirs
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))
    }

    async fn fetch_file(&self, repo: &str, _branch: &str, path: &str) -> RemoteResult<Vec<u8>> {
        assert_eq!(repo, REPO);
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))
    }
}

// --- Fixtures ---

pub fn challenge_blob(slug: &str) -> serde_json::Value {
    json!({
        "enabled": true,
        "name": "Foo",
        "slug": slug,
        "category": "web",
        "difficulty": "easy",
        "tags": ["intro", ""],
        "type": "static",
        "flag": [
            {"flag": "CTF{foo}", "case_sensitive": true},
            {"flag": "ctf{FOO}", "case_sensitive": false}
        ],
        "points": 500,
        "decay": 10,
        "min_points": 100
    })
}

pub fn challenge_object(name: &str, blob: &serde_json::Value) -> ConfigObject {
    ConfigObject::new(NS, name)
        .with_label(CONFIG_OBJECT_LABEL, CHALLENGE_LABEL_VALUE)
        .with_entry("name", "Foo")
        .with_entry("path", "/foo")
        .with_entry("repository", REPO)
        .with_entry("challenge", blob.to_string())
        .with_entry("description", "l1\nl2\nBody")
}

pub fn page_blob(enabled: bool) -> serde_json::Value {
    json!({
        "title": "Rules",
        "route": "rules",
        "auth_required": false,
        "draft": false,
        "format": "markdown",
        "enabled": enabled,
        "content": "Be nice"
    })
}

pub fn page_object(name: &str, slug: &str, blob: &serde_json::Value) -> ConfigObject {
    ConfigObject::new(NS, name)
        .with_label(CONFIG_OBJECT_LABEL, PAGE_LABEL_VALUE)
        .with_entry("slug", slug)
        .with_entry("name", "Rules")
        .with_entry("path", "/pages/rules")
        .with_entry("repository", REPO)
        .with_entry("page", blob.to_string())
}

pub const FOO_FILES: &str = "/foo/k8s/files";

// --- Harness ---

pub struct Harness {
    pub cluster: Arc<MemoryCluster>,
    pub content: Arc<FakeContent>,
    pub source: Arc<FakeSource>,
    pub adapter: Arc<SyncAdapter>,
    pub health: HealthFlag,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(ReconnectPolicy::Immediate, 3)
    }

    pub fn with_policy(reconnect: ReconnectPolicy, max_connect_attempts: u32) -> Self {
        let cluster = Arc::new(MemoryCluster::new());
        Self::build(cluster.clone(), cluster, reconnect, max_connect_attempts)
    }

    /// Harness whose fingerprint store can be written but never read.
    pub fn with_unreadable_fingerprints() -> Self {
        let cluster = Arc::new(MemoryCluster::new());
        let client = Arc::new(UnreadableFingerprints {
            inner: cluster.clone(),
        });
        Self::build(client, cluster, ReconnectPolicy::Immediate, 3)
    }

    fn build(
        client: Arc<dyn ClusterClient>,
        cluster: Arc<MemoryCluster>,
        reconnect: ReconnectPolicy,
        max_connect_attempts: u32,
    ) -> Self {
        let content = Arc::new(FakeContent::new());
        let source = Arc::new(FakeSource::new());
        let adapter = Arc::new(SyncAdapter::new(
            content.clone(),
            source.clone(),
            client.clone(),
            AdapterConfig {
                namespace: NS.to_string(),
                source_repository: REPO.to_string(),
                source_branch: "main".to_string(),
            },
        ));
        let health = HealthFlag::new();
        let reconciler = Reconciler::new(
            client,
            adapter.clone(),
            health.clone(),
            ReconcilerConfig {
                namespace: NS.to_string(),
                reconnect,
                max_connect_attempts,
            },
        );

        Self {
            cluster,
            content,
            source,
            adapter,
            health,
            reconciler,
        }
    }
}

/// Delegates to [`MemoryCluster`] except that reading the fingerprint store
/// always fails.
pub struct UnreadableFingerprints {
    inner: Arc<MemoryCluster>,
}

#[async_trait]
impl ClusterClient for UnreadableFingerprints {
    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> ClusterResult<Vec<ConfigObject>> {
        self.inner.list(namespace, selector).await
    }

    async fn get(&self, namespace: &str, name: &str) -> ClusterResult<Option<ConfigObject>> {
        if name == FINGERPRINT_STORE {
            return Err(ClusterError::Unavailable("fingerprint store read refused".into()));
        }
        self.inner.get(namespace, name).await
    }

    async fn update(
        &self,
        namespace: &str,
        name: &str,
        entries: BTreeMap<String, String>,
    ) -> ClusterResult<()> {
        self.inner.update(namespace, name, entries).await
    }

    async fn watch(&self, namespace: &str, selector: &LabelSelector) -> ClusterResult<WatchStream> {
        self.inner.watch(namespace, selector).await
    }

    async fn check_access(&self, namespace: &str) -> ClusterResult<()> {
        self.inner.check_access(namespace).await
    }
}
