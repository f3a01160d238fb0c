//! Process configuration, read once from the environment at startup.

use ctfd_manager_remote::{CtfdConfig, GithubConfig};
use ctfd_manager_sync::{AdapterConfig, ReconcilerConfig};
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Shared secret expected as the bearer token on `/api` routes.
    pub password: String,
    pub version: String,
    pub namespace: String,
    pub ctfd_url: String,
    pub github_token: Option<String>,
    pub github_user: Option<String>,
    /// `owner/name` of the challenge repository.
    pub github_repo: String,
    pub github_branch: String,
    pub github_api_url: String,
    pub listen_addr: SocketAddr,
}

impl ManagerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`. Values are trimmed and an
    /// empty value counts as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let password = var("PASSWORD").ok_or(ConfigError::Missing("PASSWORD"))?;
        let listen_addr = or("LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "LISTEN_ADDR",
                reason: e.to_string(),
            })?;

        Ok(Self {
            password,
            version: or("VERSION", "0.0.0"),
            namespace: or("NAMESPACE", "default"),
            ctfd_url: or("CTFD_URL", "http://localhost:8000"),
            github_token: var("GITHUB_TOKEN"),
            github_user: var("GITHUB_USER"),
            github_repo: or("GITHUB_REPO", ""),
            github_branch: or("GITHUB_BRANCH", "main"),
            github_api_url: or("GITHUB_API_URL", "https://api.github.com"),
            listen_addr,
        })
    }

    pub fn ctfd_config(&self) -> CtfdConfig {
        CtfdConfig {
            base_url: self.ctfd_url.clone(),
            ..CtfdConfig::default()
        }
    }

    pub fn github_config(&self) -> GithubConfig {
        GithubConfig {
            api_base_url: self.github_api_url.clone(),
            token: self.github_token.clone(),
            user: self.github_user.clone(),
            ..GithubConfig::default()
        }
    }

    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            namespace: self.namespace.clone(),
            source_repository: self.github_repo.clone(),
            source_branch: self.github_branch.clone(),
        }
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            namespace: self.namespace.clone(),
            ..ReconcilerConfig::default()
        }
    }
}
