//! Persistence seam shared by the catalog components.
//!
//! Every implementation must apply rating writes for one resource as a single
//! serializable unit: the per-user value and the resource aggregate are read,
//! compared and written without another writer for the same resource
//! interleaving. Writes to different resources must not block each other.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RequestError;
use crate::models::rating::{RatingAggregate, Stars, UserRating};
use crate::models::resource::{
    CreateResource, GithubPointer, ResourceFilter, ResourceId, ResourceView,
};
use crate::models::user::{UpsertUser, UserId};

pub mod memory;

pub type SharedStorage = Arc<dyn Storage>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Inserts the user or refreshes its username and token.
    async fn upsert_user(&self, user: &UpsertUser) -> Result<UserId, RequestError>;

    /// Persists the resource together with its tags.
    async fn create_resource(&self, resource: &CreateResource)
        -> Result<ResourceId, RequestError>;

    /// Returns the download count after the increment.
    async fn increment_downloads(&self, resource_id: ResourceId) -> Result<i64, RequestError>;

    async fn resource(&self, resource_id: ResourceId) -> Result<ResourceView, RequestError>;

    async fn github_details(&self, resource_id: ResourceId)
        -> Result<GithubPointer, RequestError>;

    /// Matching resources in ascending id order.
    async fn list_resources(
        &self,
        filter: &ResourceFilter,
    ) -> Result<Vec<ResourceView>, RequestError>;

    async fn all_tags(&self) -> Result<BTreeSet<String>, RequestError>;

    async fn user_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
    ) -> Result<UserRating, RequestError>;

    /// Records a first vote; fails with `ConflictError::AlreadyRated` if one exists.
    async fn add_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        stars: Stars,
    ) -> Result<RatingAggregate, RequestError>;

    /// Replaces `prev` with `stars`; fails with `ConflictError::StaleRating`
    /// unless `prev` is the stored value.
    async fn update_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        stars: Stars,
        prev: Stars,
    ) -> Result<RatingAggregate, RequestError>;

    async fn rating_details(&self, resource_id: ResourceId)
        -> Result<RatingAggregate, RequestError>;
}
