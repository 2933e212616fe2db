use tracing::{info, instrument};

use crate::catalog::store::ResourceStore;
use crate::error::RequestError;
use crate::models::resource::{
    normalize_tags, validate_github_pointer, validate_resource_description,
    validate_resource_kind, validate_resource_name, CreateResource, NewUpload, ResourceId,
};
use crate::models::user::UserId;

#[derive(Clone)]
pub struct UploadPipeline {
    store: ResourceStore,
}

impl UploadPipeline {
    pub fn new(store: ResourceStore) -> Self {
        Self { store }
    }

    /// Validates the whole upload before anything is written.
    pub fn validate(upload: &NewUpload, user_id: UserId) -> Result<CreateResource, RequestError> {
        Ok(CreateResource {
            name: validate_resource_name(&upload.name)?,
            description: validate_resource_description(&upload.description)?,
            kind: validate_resource_kind(&upload.kind)?,
            tags: normalize_tags(&upload.tags)?,
            github: validate_github_pointer(&upload.github)?,
            uploader_id: user_id,
        })
    }

    #[instrument(skip_all, fields(user_id = user_id, name = %upload.name))]
    pub async fn new_upload(
        &self,
        upload: &NewUpload,
        user_id: UserId,
    ) -> Result<ResourceId, RequestError> {
        let resource = Self::validate(upload, user_id)?;
        let resource_id = self.store.create_resource(&resource).await?;
        info!(
            "user {user_id} uploaded {} `{}` as resource {resource_id}",
            resource.kind, resource.name
        );
        Ok(resource_id)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::catalog::registry::RegistryQuery;
    use crate::error::{Entity, ValidationError};
    use crate::models::resource::{GithubPointer, ResourceKind};
    use crate::models::user::UpsertUser;
    use crate::storage::memory::MemoryStore;
    use crate::storage::{SharedStorage, Storage};

    fn upload(name: &str, kind: &str, tags: &[&str]) -> NewUpload {
        NewUpload {
            name: name.to_string(),
            description: "a task".to_string(),
            kind: kind.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            github: GithubPointer {
                owner: "tektoncd".to_string(),
                repository: "catalog".to_string(),
                path: format!("task/{name}/{name}.yaml"),
            },
        }
    }

    async fn pipeline() -> (UploadPipeline, RegistryQuery) {
        let storage: SharedStorage = Arc::new(MemoryStore::new());
        storage
            .upsert_user(&UpsertUser {
                id: 7,
                username: "octocat".to_string(),
                access_token: "gho_token".to_string(),
            })
            .await
            .unwrap();
        let store = ResourceStore::new(
            Arc::clone(&storage),
            PathBuf::from("readme"),
            PathBuf::from("tekton"),
        );
        (UploadPipeline::new(store), RegistryQuery::new(storage))
    }

    #[tokio::test]
    async fn upload_stores_deduplicated_tags() {
        let (pipeline, registry) = pipeline().await;
        let id = pipeline
            .new_upload(&upload("git-clone", "Task", &["git", "git", " vcs "]), 7)
            .await
            .unwrap();

        let all = registry.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
        assert_eq!(all[0].kind, ResourceKind::Task);
        assert_eq!(all[0].tags, vec!["git".to_string(), "vcs".to_string()]);
        assert_eq!(all[0].download_count, 0);
        assert_eq!(all[0].rating.count, 0);
    }

    #[tokio::test]
    async fn invalid_uploads_create_nothing() {
        let (pipeline, registry) = pipeline().await;

        let err = pipeline
            .new_upload(&upload("git-clone", "workflow", &[]), 7)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RequestError::Validation(ValidationError::InvalidResourceType(_))
        ));

        let err = pipeline.new_upload(&upload(" ", "task", &[]), 7).await.unwrap_err();
        assert!(matches!(
            err,
            RequestError::Validation(ValidationError::InvalidInput { .. })
        ));

        let mut bad_pointer = upload("lint", "task", &[]);
        bad_pointer.github.owner = String::new();
        let err = pipeline.new_upload(&bad_pointer, 7).await.unwrap_err();
        assert!(matches!(
            err,
            RequestError::Validation(ValidationError::MalformedGithubPointer { .. })
        ));

        let mut long_path = upload("lint", "task", &["lint"]);
        long_path.github.path = format!("task/{}.yaml", "a".repeat(300));
        let err = pipeline.new_upload(&long_path, 7).await.unwrap_err();
        assert!(matches!(
            err,
            RequestError::Validation(ValidationError::InvalidInput { .. })
        ));

        let err = pipeline
            .new_upload(&upload("lint", "task", &["ok", ""]), 7)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Validation(_)));

        let err = pipeline
            .new_upload(&upload("lint", "task", &[]), 99)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RequestError::NotFound {
                entity: Entity::User,
                ..
            }
        ));

        assert!(registry.get_all().await.unwrap().is_empty());
        assert!(registry.get_all_tags().await.unwrap().is_empty());
    }
}
