use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::error::RequestError;
use crate::models::resource::{CreateResource, GithubPointer, ResourceId, ResourceView};
use crate::storage::SharedStorage;

/// Resource records plus the side files keyed by resource id.
#[derive(Clone)]
pub struct ResourceStore {
    storage: SharedStorage,
    readme_dir: PathBuf,
    manifest_dir: PathBuf,
}

impl ResourceStore {
    pub fn new(storage: SharedStorage, readme_dir: PathBuf, manifest_dir: PathBuf) -> Self {
        Self {
            storage,
            readme_dir,
            manifest_dir,
        }
    }

    pub async fn create_resource(
        &self,
        resource: &CreateResource,
    ) -> Result<ResourceId, RequestError> {
        self.storage.create_resource(resource).await
    }

    pub async fn increment_downloads(&self, resource_id: ResourceId) -> Result<i64, RequestError> {
        self.storage.increment_downloads(resource_id).await
    }

    pub async fn get_by_id(&self, resource_id: ResourceId) -> Result<ResourceView, RequestError> {
        self.storage.resource(resource_id).await
    }

    pub async fn get_github_details(
        &self,
        resource_id: ResourceId,
    ) -> Result<GithubPointer, RequestError> {
        self.storage.github_details(resource_id).await
    }

    pub fn readme_path(&self, resource_id: ResourceId) -> PathBuf {
        self.readme_dir.join(format!("{resource_id}.md"))
    }

    pub fn manifest_path(&self, resource_id: ResourceId) -> PathBuf {
        self.manifest_dir.join(format!("{resource_id}.yaml"))
    }

    pub async fn does_readme_exist(&self, resource_id: ResourceId) -> bool {
        is_file(&self.readme_path(resource_id)).await
    }

    #[instrument(skip(self))]
    pub async fn readme(&self, resource_id: ResourceId) -> Result<Option<String>, RequestError> {
        if !self.does_readme_exist(resource_id).await {
            debug!("no readme stored for resource {resource_id}");
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(self.readme_path(resource_id)).await?;
        Ok(Some(content))
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}
