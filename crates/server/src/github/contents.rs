use async_trait::async_trait;
use base64::prelude::BASE64_STANDARD as BASE64;
use base64::Engine;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::instrument;

use crate::config::GithubConfig;
use crate::error::{Entity, RequestError};
use crate::github::{http_client, upstream_failure};

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Raw bytes of `path` on the default branch of `owner/repo`.
    async fn fetch_file(&self, owner: &str, repo: &str, path: &str)
        -> Result<Vec<u8>, RequestError>;
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    encoding: String,
}

impl ContentsResponse {
    fn decode(self) -> Result<Vec<u8>, RequestError> {
        match self.encoding.as_str() {
            "base64" => {
                let compact: String = self
                    .content
                    .chars()
                    .filter(|ch| !ch.is_ascii_whitespace())
                    .collect();
                BASE64.decode(compact).map_err(|e| {
                    RequestError::Transient(format!("contents payload is not base64: {e}"))
                })
            }
            "utf-8" | "" => Ok(self.content.into_bytes()),
            other => Err(RequestError::Transient(format!(
                "unsupported contents encoding `{other}`"
            ))),
        }
    }
}

/// Reads files through the GitHub contents API.
pub struct GithubContents {
    client: reqwest::Client,
    api_url: String,
}

impl GithubContents {
    pub fn new(config: &GithubConfig) -> Result<Self, RequestError> {
        Ok(Self {
            client: http_client(config)?,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl SourceFetcher for GithubContents {
    #[instrument(skip(self))]
    async fn fetch_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<u8>, RequestError> {
        let response = self
            .client
            .get(format!("{}/repos/{owner}/{repo}/contents/{path}", self.api_url))
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => response.json::<ContentsResponse>().await?.decode(),
            StatusCode::NOT_FOUND => Err(RequestError::not_found(
                Entity::SourceFile,
                format!("{owner}/{repo}/{path}"),
            )),
            status => Err(upstream_failure(status, "contents lookup")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake;

    #[tokio::test]
    async fn file_content_is_decoded() {
        let config = fake::spawn().await;
        let fetcher = GithubContents::new(&config).unwrap();
        let bytes = fetcher
            .fetch_file("tektoncd", "catalog", "task/git-clone/git-clone.yaml")
            .await
            .unwrap();
        assert_eq!(bytes, fake::FILE.as_bytes());
    }

    #[tokio::test]
    async fn missing_and_failing_files_are_distinguished() {
        let config = fake::spawn().await;
        let fetcher = GithubContents::new(&config).unwrap();

        let err = fetcher
            .fetch_file("tektoncd", "catalog", "task/nope.yaml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RequestError::NotFound {
                entity: Entity::SourceFile,
                ..
            }
        ));

        let err = fetcher
            .fetch_file("tektoncd", "flaky", "task/git.yaml")
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let response = ContentsResponse {
            content: "x".to_string(),
            encoding: "none".to_string(),
        };
        assert!(response.decode().is_err());
    }
}
