//! Thin GitHub clients: OAuth login and repository file retrieval.

use std::time::Duration;

use reqwest::StatusCode;

use crate::config::GithubConfig;
use crate::error::RequestError;

pub mod contents;
pub mod oauth;

const USER_AGENT: &str = "taskhub-server";

pub fn http_client(config: &GithubConfig) -> Result<reqwest::Client, RequestError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(USER_AGENT)
        .build()?)
}

/// Maps a non-success GitHub status to the error kind callers act on.
fn upstream_failure(status: StatusCode, what: &str) -> RequestError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RequestError::BadCredentials,
        status => RequestError::Transient(format!("{what} returned {status}")),
    }
}
