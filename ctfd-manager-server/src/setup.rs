//! First-run setup of a fresh CTFd instance.
//!
//! Validation is an explicit field-by-field check that reports every
//! violation at once. The flow then submits the setup form, creates brackets,
//! applies mail and registration settings, mints an access token for the
//! manager, and deletes the default pages.

use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{Json, extract::State};
use base64::{Engine, engine::general_purpose::STANDARD};
use ctfd_manager_cluster::AccessTokenStore;
use ctfd_manager_remote::{BracketParams, ContentService, FileUpload, SetupForm, TokenParams};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

const TOKEN_EXPIRATION: &str = "2222-02-02";
const TOKEN_DESCRIPTION: &str = "Auto generated access token for CTFd manager";
const MAX_BRACKET_DESCRIPTION: usize = 255;

const USER_MODES: &[&str] = &["users", "teams"];
const VISIBILITIES: &[&str] = &["public", "private", "admins"];
const SCORE_VISIBILITIES: &[&str] = &["public", "private", "hidden", "admins"];
const REGISTRATION_VISIBILITIES: &[&str] = &["public", "private", "mlc"];
const BRACKET_TYPES: &[&str] = &["", "users", "teams"];

/// A file sent as base64 in the setup body.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct InputFile {
    pub name: String,
    pub content: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct BracketInput {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub bracket_type: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetupParams {
    pub ctf_name: String,
    pub ctf_description: String,
    /// Unix timestamps as strings.
    pub start: String,
    pub end: String,

    pub user_mode: String,
    pub challenge_visibility: String,
    pub account_visibility: String,
    pub score_visibility: String,
    pub registration_visibility: String,
    pub verify_emails: bool,
    /// 0 means unset.
    pub team_size: i64,
    pub brackets: Vec<BracketInput>,

    pub ctf_logo: Option<InputFile>,
    pub ctf_banner: Option<InputFile>,
    pub ctf_smallicon: Option<InputFile>,
    pub ctf_theme: String,
    pub theme_color: String,

    pub name: String,
    pub email: String,
    pub password: String,

    pub mail_server: String,
    /// 0 means unset.
    pub mail_port: i64,
    pub mail_username: String,
    pub mail_password: String,
    pub mail_ssl: bool,
    pub mail_tls: bool,
    pub mail_from: String,

    pub registration_code: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SetupViolation {
    pub field: String,
    pub message: String,
}

impl SetupViolation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SetupViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// ── Validation ──

fn check_required(violations: &mut Vec<SetupViolation>, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        violations.push(SetupViolation::new(field, "missing required field"));
        return false;
    }
    true
}

fn check_choice(violations: &mut Vec<SetupViolation>, field: &str, value: &str, allowed: &[&str]) {
    if check_required(violations, field, value) && !allowed.contains(&value.trim()) {
        violations.push(SetupViolation::new(
            field,
            format!("invalid value {:?}, valid values are: {}", value.trim(), allowed.join(", ")),
        ));
    }
}

fn parse_timestamp(violations: &mut Vec<SetupViolation>, field: &str, value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<i64>() {
        Ok(ts) => Some(ts),
        Err(e) => {
            violations.push(SetupViolation::new(field, format!("invalid timestamp: {e}")));
            None
        }
    }
}

/// Checks every field and returns all violations found.
pub fn validate_setup(params: &SetupParams) -> Vec<SetupViolation> {
    let mut violations = Vec::new();
    let v = &mut violations;

    check_required(v, "ctf_name", &params.ctf_name);
    check_required(v, "ctf_description", &params.ctf_description);
    check_choice(v, "user_mode", &params.user_mode, USER_MODES);
    check_choice(v, "challenge_visibility", &params.challenge_visibility, VISIBILITIES);
    check_choice(v, "account_visibility", &params.account_visibility, VISIBILITIES);
    check_choice(v, "score_visibility", &params.score_visibility, SCORE_VISIBILITIES);
    check_choice(
        v,
        "registration_visibility",
        &params.registration_visibility,
        REGISTRATION_VISIBILITIES,
    );
    check_required(v, "ctf_theme", &params.ctf_theme);
    check_required(v, "name", &params.name);
    check_required(v, "email", &params.email);
    check_required(v, "password", &params.password);

    let start = parse_timestamp(v, "start", &params.start);
    let end = parse_timestamp(v, "end", &params.end);
    if let Some(start) = start {
        if start < 0 {
            v.push(SetupViolation::new("start", "start timestamp must not be negative"));
        }
        if end.is_some_and(|end| start >= end) {
            v.push(SetupViolation::new("start", "start timestamp must be less than end timestamp"));
        }
    }

    if params.team_size < 0 {
        v.push(SetupViolation::new("team_size", "team size must be greater than 0"));
    }
    if params.mail_port != 0 && !(1..=65535).contains(&params.mail_port) {
        v.push(SetupViolation::new("mail_port", "mail port must be between 1 and 65535"));
    }

    for (i, bracket) in params.brackets.iter().enumerate() {
        let field = format!("brackets[{i}]");
        if bracket.name.trim().is_empty() {
            v.push(SetupViolation::new(&field, "bracket name cannot be empty"));
        }
        if !BRACKET_TYPES.contains(&bracket.bracket_type.as_str()) {
            v.push(SetupViolation::new(
                &field,
                format!(
                    "invalid bracket type {:?}, valid values are: \"\", users, teams",
                    bracket.bracket_type
                ),
            ));
        }
        if bracket.description.chars().count() > MAX_BRACKET_DESCRIPTION {
            v.push(SetupViolation::new(
                &field,
                format!("bracket description cannot exceed {MAX_BRACKET_DESCRIPTION} characters"),
            ));
        }
    }

    violations
}

// ── Conversion ──

/// Decodes an uploaded image. Incomplete or undecodable files are dropped.
fn decode_file(file: Option<&InputFile>) -> Option<FileUpload> {
    let file = file?;
    if file.name.is_empty() || file.content.is_empty() {
        return None;
    }
    match STANDARD.decode(file.content.trim()) {
        Ok(content) if !content.is_empty() => Some(FileUpload {
            name: file.name.clone(),
            content,
        }),
        Ok(_) => None,
        Err(e) => {
            warn!("Dropping setup file {}: {e}", file.name);
            None
        }
    }
}

impl SetupParams {
    pub fn to_form(&self) -> SetupForm {
        SetupForm {
            ctf_name: self.ctf_name.trim().to_string(),
            ctf_description: self.ctf_description.trim().to_string(),
            start: self.start.trim().to_string(),
            end: self.end.trim().to_string(),
            user_mode: self.user_mode.trim().to_string(),
            challenge_visibility: self.challenge_visibility.trim().to_string(),
            account_visibility: self.account_visibility.trim().to_string(),
            score_visibility: self.score_visibility.trim().to_string(),
            registration_visibility: self.registration_visibility.trim().to_string(),
            verify_emails: self.verify_emails,
            team_size: u32::try_from(self.team_size).ok().filter(|size| *size > 0),
            ctf_logo: decode_file(self.ctf_logo.as_ref()),
            ctf_banner: decode_file(self.ctf_banner.as_ref()),
            ctf_small_icon: decode_file(self.ctf_smallicon.as_ref()),
            ctf_theme: self.ctf_theme.trim().to_string(),
            theme_color: self.theme_color.trim().to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.trim().to_string(),
        }
    }

    /// Mail settings patch; the platform expects the port as a string.
    pub fn mail_configs(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("mail_server".to_string(), json!(self.mail_server)),
            ("mail_port".to_string(), json!(self.mail_port.to_string())),
            ("mail_useauth".to_string(), json!(true)),
            ("mail_username".to_string(), json!(self.mail_username)),
            ("mail_password".to_string(), json!(self.mail_password)),
            ("mail_from_addr".to_string(), json!(self.mail_from)),
            ("mail_ssl".to_string(), json!(self.mail_ssl)),
            ("mail_tls".to_string(), json!(self.mail_tls)),
        ])
    }
}

// ── Flow ──

pub async fn post_setup(
    State(state): State<AppState>,
    Json(params): Json<SetupParams>,
) -> Result<Json<Value>> {
    run_setup(&state, &params).await?;
    Ok(Json(json!({ "status": "success" })))
}

pub async fn run_setup(state: &AppState, params: &SetupParams) -> Result<()> {
    let violations = validate_setup(params);
    if !violations.is_empty() {
        let message = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(AppError::BadRequest(message));
    }

    let ctfd = &state.ctfd;
    let ready = ctfd
        .setup_available()
        .await
        .map_err(|e| AppError::internal("Failed to connect to CTFd", e))?;
    if !ready {
        return Err(AppError::Conflict("CTFd is not ready for setup".to_string()));
    }

    info!("Setting up CTFd");
    ctfd.setup(&params.to_form())
        .await
        .map_err(|e| AppError::internal("Error setting up CTFd", e))?;

    for bracket in &params.brackets {
        let created = ctfd
            .create_bracket(&BracketParams {
                name: bracket.name.trim().to_string(),
                description: bracket.description.clone(),
                bracket_type: bracket.bracket_type.clone(),
            })
            .await
            .map_err(|e| AppError::internal(format!("Error setting up bracket {:?}", bracket.name), e))?;
        info!("Bracket {:?} created with id {}", created.name, created.id);
    }

    if !params.mail_server.trim().is_empty() {
        ctfd.patch_configs(&params.mail_configs())
            .await
            .map_err(|e| AppError::internal("Error setting up mail settings", e))?;
        info!("Mail settings applied");
    }

    if !params.registration_code.trim().is_empty() {
        let configs = BTreeMap::from([(
            "registration_code".to_string(),
            json!(params.registration_code),
        )]);
        ctfd.patch_configs(&configs)
            .await
            .map_err(|e| AppError::internal("Error setting up registration code", e))?;
        info!("Registration code applied");
    }

    let token = ctfd
        .create_token(&TokenParams {
            expiration: TOKEN_EXPIRATION.to_string(),
            description: TOKEN_DESCRIPTION.to_string(),
        })
        .await
        .map_err(|e| AppError::internal("Error creating access token", e))?
        .value
        .ok_or_else(|| AppError::Internal("Error creating access token: no token value".to_string()))?;

    AccessTokenStore::new(state.cluster.clone(), state.config.namespace.clone())
        .store(&token)
        .await
        .map_err(|e| AppError::internal("Error storing access token", e))?;
    ctfd.set_access_token(Some(token)).await;
    info!("Access token stored");

    let pages = ctfd
        .list_pages()
        .await
        .map_err(|e| AppError::internal("Error getting pages", e))?;
    for page in pages.iter().filter(|page| page.id != 0) {
        ctfd.delete_page(page.id)
            .await
            .map_err(|e| AppError::internal(format!("Error deleting page {}", page.id), e))?;
        info!("Deleted default page {}", page.id);
    }

    info!("CTFd setup completed");
    Ok(())
}
