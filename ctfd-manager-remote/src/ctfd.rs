//! HTTP client for the CTFd REST API.
//!
//! Authenticated calls carry the session's CSRF nonce and, once setup has
//! produced one, the long-lived access token. A 401 or 403 re-bootstraps the
//! session once and replays the request.

use crate::config::CtfdConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::service::ContentService;
use crate::types::*;
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

const CSRF_HEADER: &str = "CSRF-Token";
const NONCE_PATTERN: &str = r#"csrfNonce': "([^"]+)""#;

/// Session state shared across requests.
struct SessionState {
    nonce: Option<String>,
    access_token: Option<String>,
    /// Bumped on every bootstrap; lets concurrent 401s share one refresh.
    generation: u64,
}

/// REST client for a CTFd instance.
pub struct CtfdClient {
    client: Client,
    /// Does not follow redirects, so `/setup` can be probed.
    probe: Client,
    config: CtfdConfig,
    session: Arc<RwLock<SessionState>>,
    bootstrap_lock: Arc<Mutex<()>>,
}

impl CtfdClient {
    pub fn new(config: CtfdConfig) -> RemoteResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;
        let probe = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            probe,
            config,
            session: Arc::new(RwLock::new(SessionState {
                nonce: None,
                access_token: None,
                generation: 0,
            })),
            bootstrap_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Installs (or clears) the access token used for `Authorization: Token`.
    pub async fn set_access_token(&self, token: Option<String>) {
        self.session.write().await.access_token = token;
    }

    pub async fn has_access_token(&self) -> bool {
        self.session.read().await.access_token.is_some()
    }

    // ── Session ──

    /// Starts a session and reads its CSRF nonce from the setup page (which
    /// redirects to the index once setup is done).
    pub async fn bootstrap(&self) -> RemoteResult<()> {
        let body = self
            .client
            .get(self.url("/setup"))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| RemoteError::Session(e.to_string()))?
            .text()
            .await?;

        let nonce = extract_nonce(&body)?;
        let mut session = self.session.write().await;
        session.nonce = Some(nonce);
        session.generation += 1;
        debug!(generation = session.generation, "CTFd session bootstrapped");
        Ok(())
    }

    async fn rebootstrap(&self, seen_generation: u64) -> RemoteResult<()> {
        let _guard = self.bootstrap_lock.lock().await;
        if self.session.read().await.generation > seen_generation {
            return Ok(());
        }
        self.bootstrap().await
    }

    async fn send_once<F>(
        &self,
        method: &Method,
        url: &str,
        build: &F,
    ) -> RemoteResult<(Response, u64)>
    where
        F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync,
    {
        let (nonce, token, generation) = {
            let session = self.session.read().await;
            (
                session.nonce.clone(),
                session.access_token.clone(),
                session.generation,
            )
        };

        let mut request = self.client.request(method.clone(), url);
        if let Some(nonce) = nonce {
            request = request.header(CSRF_HEADER, nonce);
        }
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Token {token}"));
        }

        Ok((build(request).send().await?, generation))
    }

    /// Sends an API request, re-bootstrapping the session once on 401/403.
    async fn send<F>(&self, method: Method, path: &str, build: F) -> RemoteResult<Response>
    where
        F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync,
    {
        let url = self.url(&format!("/api/v1{path}"));
        let (resp, generation) = self.send_once(&method, &url, &build).await?;

        if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::FORBIDDEN {
            debug!("{} on {method} {path}, refreshing session", resp.status());
            self.rebootstrap(generation).await?;
            let (resp, _) = self.send_once(&method, &url, &build).await?;
            return Ok(resp);
        }

        Ok(resp)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    // ── Setup ──

    /// Whether the instance still serves its first-run setup page.
    pub async fn setup_available(&self) -> RemoteResult<bool> {
        let resp = self.probe.get(self.url("/setup")).send().await?;
        debug!(status = %resp.status(), "probed CTFd setup page");
        Ok(resp.status() == StatusCode::OK)
    }

    /// Submits the first-run setup form. The admin session it creates is kept
    /// in the cookie store for the calls that follow.
    pub async fn setup(&self, form: &SetupForm) -> RemoteResult<()> {
        self.bootstrap().await?;
        let nonce = self.session.read().await.nonce.clone().unwrap_or_default();

        let mut multipart = Form::new()
            .text("ctf_name", form.ctf_name.clone())
            .text("ctf_description", form.ctf_description.clone())
            .text("start", form.start.clone())
            .text("end", form.end.clone())
            .text("user_mode", form.user_mode.clone())
            .text("challenge_visibility", form.challenge_visibility.clone())
            .text("account_visibility", form.account_visibility.clone())
            .text("score_visibility", form.score_visibility.clone())
            .text("registration_visibility", form.registration_visibility.clone())
            .text("verify_emails", form.verify_emails.to_string())
            .text("ctf_theme", form.ctf_theme.clone())
            .text("theme_color", form.theme_color.clone())
            .text("name", form.name.clone())
            .text("email", form.email.clone())
            .text("password", form.password.clone())
            .text("_submit", "Finish")
            .text("nonce", nonce);

        if let Some(size) = form.team_size {
            multipart = multipart.text("team_size", size.to_string());
        }
        for (field, file) in [
            ("ctf_logo", &form.ctf_logo),
            ("ctf_banner", &form.ctf_banner),
            ("ctf_small_icon", &form.ctf_small_icon),
        ] {
            if let Some(file) = file {
                multipart = multipart.part(
                    field,
                    Part::bytes(file.content.clone()).file_name(file.name.clone()),
                );
            }
        }

        let resp = self
            .client
            .post(self.url("/setup"))
            .multipart(multipart)
            .send()
            .await?;
        check(resp, "setup").await?;
        info!("CTFd setup form accepted");

        // Logging in regenerates the session, and with it the nonce.
        self.bootstrap().await
    }

    pub async fn create_bracket(&self, params: &BracketParams) -> RemoteResult<RemoteBracket> {
        let resp = self
            .send(Method::POST, "/brackets", |rb| rb.json(params))
            .await?;
        data(resp, "create bracket").await
    }

    pub async fn patch_configs(
        &self,
        configs: &BTreeMap<String, serde_json::Value>,
    ) -> RemoteResult<()> {
        let resp = self
            .send(Method::PATCH, "/configs", |rb| rb.json(configs))
            .await?;
        check(resp, "patch configs").await?;
        Ok(())
    }

    pub async fn create_token(&self, params: &TokenParams) -> RemoteResult<RemoteToken> {
        let resp = self
            .send(Method::POST, "/tokens", |rb| rb.json(params))
            .await?;
        data(resp, "create token").await
    }
}

fn extract_nonce(body: &str) -> RemoteResult<String> {
    let pattern = Regex::new(NONCE_PATTERN).map_err(|e| RemoteError::Session(e.to_string()))?;
    pattern
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| RemoteError::Session("no CSRF nonce in page".to_string()))
}

async fn check(resp: Response, what: &str) -> RemoteResult<Response> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(RemoteError::Api {
            status: status.as_u16(),
            message: format!("{what}: {message}"),
        });
    }
    Ok(resp)
}

async fn data<T: DeserializeOwned>(resp: Response, what: &str) -> RemoteResult<T> {
    let envelope: Envelope<T> = check(resp, what).await?.json().await?;
    Ok(envelope.data)
}

#[async_trait]
impl ContentService for CtfdClient {
    // ── Challenges ──

    async fn list_challenges(&self) -> RemoteResult<Vec<RemoteChallenge>> {
        let resp = self
            .send(Method::GET, "/challenges?view=admin", |rb| rb)
            .await?;
        data(resp, "list challenges").await
    }

    async fn create_challenge(&self, params: &ChallengeParams) -> RemoteResult<RemoteChallenge> {
        let resp = self
            .send(Method::POST, "/challenges", |rb| rb.json(params))
            .await?;
        data(resp, "create challenge").await
    }

    async fn patch_challenge(
        &self,
        id: i64,
        params: &ChallengeParams,
    ) -> RemoteResult<RemoteChallenge> {
        let resp = self
            .send(Method::PATCH, &format!("/challenges/{id}"), |rb| {
                rb.json(params)
            })
            .await?;
        data(resp, "patch challenge").await
    }

    async fn set_challenge_state(&self, id: i64, state: ChallengeState) -> RemoteResult<()> {
        let body = serde_json::json!({ "state": state });
        let resp = self
            .send(Method::PATCH, &format!("/challenges/{id}"), |rb| {
                rb.json(&body)
            })
            .await?;
        check(resp, "set challenge state").await?;
        Ok(())
    }

    // ── Files ──

    async fn list_challenge_files(&self, challenge_id: i64) -> RemoteResult<Vec<RemoteFile>> {
        let resp = self
            .send(Method::GET, &format!("/challenges/{challenge_id}/files"), |rb| rb)
            .await?;
        data(resp, "list challenge files").await
    }

    async fn upload_challenge_files(
        &self,
        challenge_id: i64,
        files: &[FileUpload],
    ) -> RemoteResult<Vec<RemoteFile>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        // No form nonce: `send` attaches the current CSRF header, including on
        // the replay after a re-bootstrap.
        let resp = self
            .send(Method::POST, "/files", |rb| {
                let mut form = Form::new()
                    .text("challenge", challenge_id.to_string())
                    .text("type", "challenge");
                for file in files {
                    form = form.part(
                        "file",
                        Part::bytes(file.content.clone()).file_name(file.name.clone()),
                    );
                }
                rb.multipart(form)
            })
            .await?;
        data(resp, "upload files").await
    }

    async fn delete_file(&self, id: i64) -> RemoteResult<()> {
        let resp = self
            .send(Method::DELETE, &format!("/files/{id}"), |rb| rb)
            .await?;
        check(resp, "delete file").await?;
        Ok(())
    }

    // ── Flags ──

    async fn list_challenge_flags(&self, challenge_id: i64) -> RemoteResult<Vec<RemoteFlag>> {
        let resp = self
            .send(Method::GET, &format!("/challenges/{challenge_id}/flags"), |rb| rb)
            .await?;
        data(resp, "list challenge flags").await
    }

    async fn create_flag(&self, params: &FlagParams) -> RemoteResult<RemoteFlag> {
        let resp = self
            .send(Method::POST, "/flags", |rb| rb.json(params))
            .await?;
        data(resp, "create flag").await
    }

    async fn delete_flag(&self, id: i64) -> RemoteResult<()> {
        let resp = self
            .send(Method::DELETE, &format!("/flags/{id}"), |rb| rb)
            .await?;
        check(resp, "delete flag").await?;
        Ok(())
    }

    // ── Tags ──

    async fn list_challenge_tags(&self, challenge_id: i64) -> RemoteResult<Vec<RemoteTag>> {
        let resp = self
            .send(Method::GET, &format!("/challenges/{challenge_id}/tags"), |rb| rb)
            .await?;
        data(resp, "list challenge tags").await
    }

    async fn create_tag(&self, params: &TagParams) -> RemoteResult<RemoteTag> {
        let resp = self
            .send(Method::POST, "/tags", |rb| rb.json(params))
            .await?;
        data(resp, "create tag").await
    }

    async fn delete_tag(&self, id: i64) -> RemoteResult<()> {
        let resp = self
            .send(Method::DELETE, &format!("/tags/{id}"), |rb| rb)
            .await?;
        check(resp, "delete tag").await?;
        Ok(())
    }

    // ── Pages ──

    async fn list_pages(&self) -> RemoteResult<Vec<RemotePage>> {
        let resp = self.send(Method::GET, "/pages", |rb| rb).await?;
        data(resp, "list pages").await
    }

    async fn create_page(&self, params: &PageParams) -> RemoteResult<RemotePage> {
        let resp = self
            .send(Method::POST, "/pages", |rb| rb.json(params))
            .await?;
        data(resp, "create page").await
    }

    async fn patch_page(&self, id: i64, params: &PageParams) -> RemoteResult<RemotePage> {
        let resp = self
            .send(Method::PATCH, &format!("/pages/{id}"), |rb| rb.json(params))
            .await?;
        data(resp, "patch page").await
    }

    async fn delete_page(&self, id: i64) -> RemoteResult<()> {
        let resp = self
            .send(Method::DELETE, &format!("/pages/{id}"), |rb| rb)
            .await?;
        check(resp, "delete page").await?;
        Ok(())
    }
}
