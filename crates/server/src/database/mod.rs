use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::debug;

use crate::database::commands::{
    apply_rating_delta, create_resource, increment_downloads, insert_user_rating,
    lock_rating_aggregate, replace_user_rating, upsert_user,
};
use crate::database::connection::DbConnection;
use crate::database::queries::{
    all_tags, github_details, list_resource_views, rating_aggregate, resource_exists,
    resource_view, user_stars,
};
use crate::database::utils::map_foreign_key_violation;
use crate::error::{ConflictError, Entity, RequestError};
use crate::models::rating::{RatingAggregate, Stars, UserRating};
use crate::models::resource::{
    CreateResource, GithubPointer, ResourceFilter, ResourceId, ResourceView,
};
use crate::models::user::{UpsertUser, UserId};
use crate::storage::Storage;

pub mod commands;
pub mod connection;
pub mod queries;
pub mod schema;
pub mod utils;

fn stored_stars(value: Option<i16>) -> Result<Option<Stars>, RequestError> {
    Ok(value.map(|v| Stars::new(v.into())).transpose()?)
}

#[async_trait]
impl Storage for DbConnection {
    async fn upsert_user(&self, user: &UpsertUser) -> Result<UserId, RequestError> {
        Ok(upsert_user(self.pool(), user).await?)
    }

    async fn create_resource(
        &self,
        resource: &CreateResource,
    ) -> Result<ResourceId, RequestError> {
        let mut transaction = self.pool().begin().await?;
        let id = create_resource(&mut transaction, resource)
            .await
            .map_err(map_foreign_key_violation(Entity::User, resource.uploader_id))?;
        transaction.commit().await?;
        Ok(id)
    }

    async fn increment_downloads(&self, resource_id: ResourceId) -> Result<i64, RequestError> {
        increment_downloads(self.pool(), resource_id)
            .await?
            .ok_or_else(|| RequestError::not_found(Entity::Resource, resource_id))
    }

    async fn resource(&self, resource_id: ResourceId) -> Result<ResourceView, RequestError> {
        resource_view(self.pool(), resource_id)
            .await?
            .ok_or_else(|| RequestError::not_found(Entity::Resource, resource_id))
    }

    async fn github_details(
        &self,
        resource_id: ResourceId,
    ) -> Result<GithubPointer, RequestError> {
        github_details(self.pool(), resource_id)
            .await?
            .ok_or_else(|| RequestError::not_found(Entity::Resource, resource_id))
    }

    async fn list_resources(
        &self,
        filter: &ResourceFilter,
    ) -> Result<Vec<ResourceView>, RequestError> {
        Ok(list_resource_views(self.pool(), filter).await?)
    }

    async fn all_tags(&self) -> Result<BTreeSet<String>, RequestError> {
        Ok(all_tags(self.pool()).await?.into_iter().collect())
    }

    async fn user_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
    ) -> Result<UserRating, RequestError> {
        if !resource_exists(self.pool(), resource_id).await? {
            return Err(RequestError::not_found(Entity::Resource, resource_id));
        }
        let stars = user_stars(self.pool(), user_id, resource_id).await?;
        Ok(stored_stars(stars)?.into())
    }

    async fn add_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        stars: Stars,
    ) -> Result<RatingAggregate, RequestError> {
        let mut transaction = self.pool().begin().await?;
        if lock_rating_aggregate(&mut transaction, resource_id)
            .await?
            .is_none()
        {
            return Err(RequestError::not_found(Entity::Resource, resource_id));
        }
        let inserted = insert_user_rating(transaction.as_mut(), user_id, resource_id, stars)
            .await
            .map_err(map_foreign_key_violation(Entity::User, user_id))?;
        if !inserted {
            debug!("user {user_id} already rated resource {resource_id}");
            return Err(ConflictError::AlreadyRated.into());
        }
        let aggregate =
            apply_rating_delta(transaction.as_mut(), resource_id, 1, stars.get().into()).await?;
        transaction.commit().await?;
        Ok(aggregate)
    }

    async fn update_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        stars: Stars,
        prev: Stars,
    ) -> Result<RatingAggregate, RequestError> {
        let mut transaction = self.pool().begin().await?;
        if lock_rating_aggregate(&mut transaction, resource_id)
            .await?
            .is_none()
        {
            return Err(RequestError::not_found(Entity::Resource, resource_id));
        }
        let replaced =
            replace_user_rating(transaction.as_mut(), user_id, resource_id, stars, prev).await?;
        if !replaced {
            let current = user_stars(transaction.as_mut(), user_id, resource_id).await?;
            return Err(ConflictError::StaleRating {
                supplied: prev,
                current: stored_stars(current)?,
            }
            .into());
        }
        let delta = i64::from(stars.get()) - i64::from(prev.get());
        let aggregate = apply_rating_delta(transaction.as_mut(), resource_id, 0, delta).await?;
        transaction.commit().await?;
        Ok(aggregate)
    }

    async fn rating_details(
        &self,
        resource_id: ResourceId,
    ) -> Result<RatingAggregate, RequestError> {
        rating_aggregate(self.pool(), resource_id)
            .await?
            .ok_or_else(|| RequestError::not_found(Entity::Resource, resource_id))
    }
}
