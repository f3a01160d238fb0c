//! HTTP routes.
//!
//! - `GET /`, `GET /status`, `GET /api/status`: health
//! - `GET /api/version`
//! - `GET /api/challenges[/{id}[/files[/{file}]]]`: challenge configs and their files
//! - `POST /api/ctfd/setup`: first-run setup wizard
//! - `POST /api/ctfd/challenges/init`: force-sync every challenge
//! - `GET /api/ctfd/challenges[/uploaded]`: remote challenges and bindings
//!
//! Everything under `/api` except version and status needs the bearer secret.

use crate::auth;
use crate::error::{AppError, Result};
use crate::setup;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use ctfd_manager_cluster::LabelSelector;
use ctfd_manager_remote::{ContentService, EntryKind, RepoEntry};
use ctfd_manager_types::{
    CHALLENGE_LABEL_VALUE, CONFIG_OBJECT_LABEL, ChallengeRecord, ConfigObject, ObjectKind,
    classify, extract_challenge,
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/challenges", get(list_challenges))
        .route("/challenges/{id}", get(get_challenge))
        .route("/challenges/{id}/files", get(list_challenge_files))
        .route("/challenges/{id}/files/{file}", get(get_challenge_file))
        .route("/ctfd/setup", post(setup::post_setup))
        .route("/ctfd/challenges", get(list_remote_challenges))
        .route("/ctfd/challenges/init", post(init_challenges))
        .route("/ctfd/challenges/uploaded", get(list_uploaded_challenges))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_password,
        ));

    let api = Router::new()
        .route("/version", get(version))
        .route("/status", get(status))
        .merge(protected);

    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──

async fn healthy(state: &AppState) -> bool {
    let namespace = &state.config.namespace;
    if let Err(e) = state.cluster.check_access(namespace).await {
        warn!("Cluster access check failed: {e}");
        return false;
    }

    let selector = LabelSelector::Exists(CONFIG_OBJECT_LABEL.to_string());
    if let Err(e) = state.cluster.list(namespace, &selector).await {
        warn!("Error listing config objects: {e}");
        return false;
    }

    if !state.health.is_healthy() {
        warn!("Service deemed unhealthy by the watch loop");
        return false;
    }
    true
}

fn health_status(ok: bool) -> (StatusCode, &'static str) {
    if ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "error")
    }
}

async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let (code, status) = health_status(healthy(&state).await);
    (code, Json(json!({ "name": "CTFd manager", "status": status })))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let (code, status) = health_status(healthy(&state).await);
    (code, Json(json!({ "status": status })))
}

async fn version(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "version": state.config.version }))
}

// ── Challenge configs ──

fn challenge_selector() -> LabelSelector {
    LabelSelector::Equals(
        CONFIG_OBJECT_LABEL.to_string(),
        CHALLENGE_LABEL_VALUE.to_string(),
    )
}

async fn challenge_objects(state: &AppState) -> Result<Vec<ConfigObject>> {
    state
        .cluster
        .list(&state.config.namespace, &challenge_selector())
        .await
        .map_err(|e| AppError::internal("Error getting challenges", e))
}

async fn load_challenge(state: &AppState, id: &str) -> Result<ChallengeRecord> {
    let object = state
        .cluster
        .get(&state.config.namespace, id)
        .await
        .map_err(|e| AppError::internal("Error getting challenge", e))?
        .filter(|object| classify(object) == ObjectKind::Challenge)
        .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;

    extract_challenge(&object).map_err(|e| AppError::internal("Invalid challenge config", e))
}

async fn list_challenges(State(state): State<AppState>) -> Result<Json<Value>> {
    let names: Vec<Value> = challenge_objects(&state)
        .await?
        .into_iter()
        .map(|object| json!({ "name": object.name }))
        .collect();
    Ok(Json(json!({ "challenges": names })))
}

async fn get_challenge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let record = load_challenge(&state, &id).await?;
    Ok(Json(json!({ "config": record })))
}

async fn challenge_files(state: &AppState, record: &ChallengeRecord) -> Result<Vec<RepoEntry>> {
    let config = &state.config;
    state
        .source
        .list_dir(&config.github_repo, &config.github_branch, &record.files_dir())
        .await
        .map_err(|e| {
            if e.is_not_found() {
                AppError::NotFound("Directory not found".to_string())
            } else {
                AppError::internal("Error getting directory contents", e)
            }
        })
}

async fn list_challenge_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let record = load_challenge(&state, &id).await?;
    let files = challenge_files(&state, &record).await?;
    Ok(Json(json!({ "files": files })))
}

async fn get_challenge_file(
    State(state): State<AppState>,
    Path((id, file)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let record = load_challenge(&state, &id).await?;
    let listed = challenge_files(&state, &record)
        .await?
        .into_iter()
        .any(|entry| entry.kind == EntryKind::File && entry.name == file);
    if !listed {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    let config = &state.config;
    let path = format!("{}/{file}", record.files_dir());
    let bytes = state
        .source
        .fetch_file(&config.github_repo, &config.github_branch, &path)
        .await
        .map_err(|e| AppError::internal("Error getting file contents", e))?;

    info!("File {file} sent ({} bytes)", bytes.len());
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file}\""),
            ),
        ],
        bytes,
    ))
}

// ── CTFd ──

async fn init_challenges(State(state): State<AppState>) -> Result<Json<Value>> {
    for object in challenge_objects(&state).await? {
        let id = state
            .reconciler
            .force_sync(&object)
            .await
            .map_err(|e| AppError::internal(format!("Error uploading challenge {}", object.name), e))?;
        info!("Uploaded challenge {} ({id})", object.name);
    }
    Ok(Json(json!({ "status": "ok" })))
}

async fn list_remote_challenges(State(state): State<AppState>) -> Result<Json<Value>> {
    let challenges = state
        .ctfd
        .list_challenges()
        .await
        .map_err(|e| AppError::internal("Error getting challenges", e))?;
    Ok(Json(json!({ "challenges": challenges })))
}

async fn list_uploaded_challenges(State(state): State<AppState>) -> Result<Json<Value>> {
    let uploaded = state
        .reconciler
        .adapter()
        .challenge_bindings()
        .all()
        .await
        .map_err(|e| AppError::internal("Error getting uploaded challenges", e))?;
    Ok(Json(json!({ "uploaded_challenges": uploaded })))
}
