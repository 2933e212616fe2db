use std::env;
use std::fs::read_to_string;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::connection::DbConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "GithubConfig::default_oauth_url")]
    pub oauth_url: String,
    #[serde(default = "GithubConfig::default_api_url")]
    pub api_url: String,
    #[serde(default = "GithubConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GithubConfig {
    fn default_oauth_url() -> String {
        "https://github.com/login/oauth/access_token".to_string()
    }

    fn default_api_url() -> String {
        "https://api.github.com".to_string()
    }

    fn default_timeout_secs() -> u64 {
        10
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            oauth_url: Self::default_oauth_url(),
            api_url: Self::default_api_url(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "AuthConfig::default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl AuthConfig {
    fn default_token_ttl_secs() -> u64 {
        24 * 60 * 60
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: Self::default_token_ttl_secs(),
        }
    }
}

/// Directories holding files served next to the catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilesConfig {
    pub readme_dir: PathBuf,
    pub manifest_dir: PathBuf,
    pub tasks_dir: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            readme_dir: PathBuf::from("readme"),
            manifest_dir: PathBuf::from("tekton"),
            tasks_dir: PathBuf::from("catalog"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Falls back to the in-memory store when absent.
    #[serde(default)]
    pub database: Option<DbConfig>,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

impl AppConfig {
    pub fn from_yaml_file<P: Into<PathBuf>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.into();
        let content = read_to_string(&path).with_context(|| format!("path: {path:?}"))?;
        Self::from_yaml_str(&content).with_context(|| format!("path: {path:?}"))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, anyhow::Error> {
        let mut config: Self = serde_yaml::from_str(content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Secrets are usually injected through the environment rather than the file.
    fn apply_env_overrides(&mut self) {
        let overrides = [
            ("GITHUB_CLIENT_ID", &mut self.github.client_id),
            ("GITHUB_CLIENT_SECRET", &mut self.github.client_secret),
            ("JWT_SECRET", &mut self.auth.jwt_secret),
        ];
        for (key, target) in overrides {
            if let Ok(value) = env::var(key) {
                debug!("config value overridden from `{key}`");
                *target = value;
            }
        }
    }
}
