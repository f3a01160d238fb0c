//! Request and response shapes for the CTFd API.

use serde::{Deserialize, Serialize};

/// Standard `{success, data}` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeState {
    Visible,
    Hidden,
}

impl ChallengeState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::Visible } else { Self::Hidden }
    }
}

/// Core challenge fields for create and patch.
///
/// `challenge_type` is only sent on create; the platform does not allow
/// changing it afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChallengeParams {
    pub name: String,
    pub category: String,
    pub description: String,
    pub value: i64,
    pub initial: i64,
    pub decay: i64,
    pub minimum: i64,
    pub state: ChallengeState,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub challenge_type: Option<String>,
    pub connection_info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlagParams {
    pub challenge: i64,
    pub content: String,
    #[serde(rename = "type")]
    pub flag_type: String,
    pub data: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagParams {
    pub challenge: i64,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PageParams {
    pub title: String,
    pub route: String,
    pub content: String,
    pub format: String,
    pub auth_required: bool,
    pub draft: bool,
    pub hidden: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BracketParams {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub bracket_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenParams {
    pub expiration: String,
    pub description: String,
}

/// A named file payload for multipart uploads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub content: Vec<u8>,
}

/// Fields of the platform's first-run setup form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetupForm {
    pub ctf_name: String,
    pub ctf_description: String,
    pub start: String,
    pub end: String,
    pub user_mode: String,
    pub challenge_visibility: String,
    pub account_visibility: String,
    pub score_visibility: String,
    pub registration_visibility: String,
    pub verify_emails: bool,
    pub team_size: Option<u32>,
    pub ctf_logo: Option<FileUpload>,
    pub ctf_banner: Option<FileUpload>,
    pub ctf_small_icon: Option<FileUpload>,
    pub ctf_theme: String,
    pub theme_color: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

// ── Remote entities ──

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteChallenge {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(rename = "type", default)]
    pub challenge_type: String,
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFlag {
    pub id: i64,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub flag_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTag {
    pub id: i64,
    #[serde(default)]
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePage {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub route: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBracket {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteToken {
    pub id: i64,
    #[serde(default)]
    pub value: Option<String>,
}
