use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::{ConflictError, Entity, RequestError};
use crate::models::rating::{RatingAggregate, Stars, UserRating};
use crate::models::resource::{
    CreateResource, GithubPointer, ResourceFilter, ResourceId, ResourceKind, ResourceView,
};
use crate::models::user::{UpsertUser, UserId};
use crate::storage::Storage;

#[derive(Clone, Debug)]
struct UserRecord {
    username: String,
    access_token: String,
}

/// Fields fixed at creation, readable without locking.
#[derive(Clone, Debug)]
struct ResourceRecord {
    id: ResourceId,
    name: String,
    description: String,
    kind: ResourceKind,
    tags: BTreeSet<String>,
    github: GithubPointer,
    uploader_id: UserId,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RatingState {
    aggregate: RatingAggregate,
    votes: HashMap<UserId, Stars>,
}

#[derive(Debug)]
struct ResourceSlot {
    record: ResourceRecord,
    downloads: AtomicI64,
    ratings: Mutex<RatingState>,
}

impl ResourceSlot {
    async fn view(&self) -> ResourceView {
        let aggregate = self.ratings.lock().await.aggregate;
        let record = &self.record;
        ResourceView {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            kind: record.kind,
            tags: record.tags.iter().cloned().collect(),
            github: record.github.clone(),
            uploader_id: record.uploader_id,
            download_count: self.downloads.load(Ordering::SeqCst),
            rating: aggregate,
            created_at: record.created_at,
        }
    }

    fn matches(&self, filter: &ResourceFilter) -> bool {
        match filter {
            ResourceFilter::All => true,
            ResourceFilter::Tags(tags) => !self.record.tags.is_disjoint(tags),
            ResourceFilter::Uploader(user_id) => self.record.uploader_id == *user_id,
        }
    }
}

/// In-process store. Each resource owns its own rating mutex, the map is only
/// used to find the slot.
#[derive(Debug)]
pub struct MemoryStore {
    next_resource_id: AtomicI64,
    users: DashMap<UserId, UserRecord>,
    resources: DashMap<ResourceId, Arc<ResourceSlot>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_resource_id: AtomicI64::new(1),
            users: DashMap::new(),
            resources: DashMap::new(),
        }
    }

    fn slot(&self, resource_id: ResourceId) -> Result<Arc<ResourceSlot>, RequestError> {
        self.resources
            .get(&resource_id)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or_else(|| RequestError::not_found(Entity::Resource, resource_id))
    }

    fn ensure_user(&self, user_id: UserId) -> Result<(), RequestError> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(RequestError::not_found(Entity::User, user_id))
        }
    }

    #[cfg(test)]
    pub(crate) fn access_token(&self, user_id: UserId) -> Option<String> {
        self.users
            .get(&user_id)
            .map(|user| user.access_token.clone())
    }
}

#[async_trait]
impl Storage for MemoryStore {
    #[instrument(skip_all)]
    async fn upsert_user(&self, user: &UpsertUser) -> Result<UserId, RequestError> {
        let previous = self.users.insert(
            user.id,
            UserRecord {
                username: user.username.clone(),
                access_token: user.access_token.clone(),
            },
        );
        if let Some(previous) = previous {
            debug!(
                "refreshed user {} (previously known as {}), token rotated: {}",
                user.id,
                previous.username,
                previous.access_token != user.access_token
            );
        } else {
            info!("created user with id: {}", user.id);
        }
        Ok(user.id)
    }

    #[instrument(skip_all)]
    async fn create_resource(
        &self,
        resource: &CreateResource,
    ) -> Result<ResourceId, RequestError> {
        self.ensure_user(resource.uploader_id)?;
        let id = self.next_resource_id.fetch_add(1, Ordering::SeqCst);
        let slot = ResourceSlot {
            record: ResourceRecord {
                id,
                name: resource.name.clone(),
                description: resource.description.clone(),
                kind: resource.kind,
                tags: resource.tags.clone(),
                github: resource.github.clone(),
                uploader_id: resource.uploader_id,
                created_at: Utc::now(),
            },
            downloads: AtomicI64::new(0),
            ratings: Mutex::new(RatingState::default()),
        };
        self.resources.insert(id, Arc::new(slot));
        info!("created resource with id: {}", id);
        Ok(id)
    }

    async fn increment_downloads(&self, resource_id: ResourceId) -> Result<i64, RequestError> {
        let slot = self.slot(resource_id)?;
        Ok(slot.downloads.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn resource(&self, resource_id: ResourceId) -> Result<ResourceView, RequestError> {
        Ok(self.slot(resource_id)?.view().await)
    }

    async fn github_details(
        &self,
        resource_id: ResourceId,
    ) -> Result<GithubPointer, RequestError> {
        Ok(self.slot(resource_id)?.record.github.clone())
    }

    async fn list_resources(
        &self,
        filter: &ResourceFilter,
    ) -> Result<Vec<ResourceView>, RequestError> {
        let mut slots: Vec<Arc<ResourceSlot>> = self
            .resources
            .iter()
            .filter(|entry| entry.value().matches(filter))
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        slots.sort_by_key(|slot| slot.record.id);
        let views = futures::future::join_all(slots.iter().map(|slot| slot.view())).await;
        Ok(views)
    }

    async fn all_tags(&self) -> Result<BTreeSet<String>, RequestError> {
        Ok(self
            .resources
            .iter()
            .flat_map(|entry| entry.value().record.tags.clone())
            .collect())
    }

    async fn user_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
    ) -> Result<UserRating, RequestError> {
        let slot = self.slot(resource_id)?;
        let ratings = slot.ratings.lock().await;
        Ok(ratings.votes.get(&user_id).copied().into())
    }

    #[instrument(skip(self))]
    async fn add_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        stars: Stars,
    ) -> Result<RatingAggregate, RequestError> {
        let slot = self.slot(resource_id)?;
        self.ensure_user(user_id)?;
        let mut ratings = slot.ratings.lock().await;
        if ratings.votes.contains_key(&user_id) {
            return Err(ConflictError::AlreadyRated.into());
        }
        let aggregate = ratings.aggregate.with_added(stars);
        ratings.votes.insert(user_id, stars);
        ratings.aggregate = aggregate;
        Ok(aggregate)
    }

    #[instrument(skip(self))]
    async fn update_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        stars: Stars,
        prev: Stars,
    ) -> Result<RatingAggregate, RequestError> {
        let slot = self.slot(resource_id)?;
        let mut ratings = slot.ratings.lock().await;
        let current = ratings.votes.get(&user_id).copied();
        if current != Some(prev) {
            return Err(ConflictError::StaleRating {
                supplied: prev,
                current,
            }
            .into());
        }
        let aggregate = ratings.aggregate.with_replaced(prev, stars);
        ratings.votes.insert(user_id, stars);
        ratings.aggregate = aggregate;
        Ok(aggregate)
    }

    async fn rating_details(
        &self,
        resource_id: ResourceId,
    ) -> Result<RatingAggregate, RequestError> {
        let slot = self.slot(resource_id)?;
        let aggregate = slot.ratings.lock().await.aggregate;
        Ok(aggregate)
    }
}
