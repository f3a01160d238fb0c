//! Remote client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the CTFd client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CtfdConfig {
    /// Base URL of the CTFd instance (e.g., "http://ctfd:8000").
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CtfdConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Configuration for the GitHub contents client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GithubConfig {
    /// REST API root; overridden in tests.
    pub api_base_url: String,

    /// Personal access token. Unauthenticated requests are heavily rate limited.
    pub token: Option<String>,

    /// Account probed at startup to check the token works.
    pub user: Option<String>,

    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            token: None,
            user: None,
            timeout_secs: 30,
        }
    }
}
