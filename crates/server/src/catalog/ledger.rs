//! Per-user votes and the running aggregate of every resource.
//!
//! The aggregate is maintained incrementally: a first vote adds one to the
//! count and its stars to the sum, a revision swaps the previous stars for
//! the new ones. Callers pass back the value they read with
//! [`RatingLedger::get_user_rating`] when revising, and the storage refuses
//! the write if that value is no longer current.

use tracing::{info, instrument};

use crate::error::RequestError;
use crate::models::rating::{RatingAggregate, Stars, UserRating};
use crate::models::resource::ResourceId;
use crate::models::user::UserId;
use crate::storage::SharedStorage;

#[derive(Clone)]
pub struct RatingLedger {
    storage: SharedStorage,
}

impl RatingLedger {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    pub async fn get_user_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
    ) -> Result<UserRating, RequestError> {
        self.storage.user_rating(user_id, resource_id).await
    }

    #[instrument(skip(self))]
    pub async fn add_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        stars: i64,
    ) -> Result<RatingAggregate, RequestError> {
        let stars = Stars::new(stars)?;
        let aggregate = self.storage.add_rating(user_id, resource_id, stars).await?;
        info!(
            "user {user_id} rated resource {resource_id} with {stars}, {} votes now",
            aggregate.count
        );
        Ok(aggregate)
    }

    #[instrument(skip(self))]
    pub async fn update_rating(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        stars: i64,
        prev_stars: i64,
    ) -> Result<RatingAggregate, RequestError> {
        let stars = Stars::new(stars)?;
        let prev_stars = Stars::new(prev_stars)?;
        let aggregate = self
            .storage
            .update_rating(user_id, resource_id, stars, prev_stars)
            .await?;
        info!("user {user_id} revised rating of resource {resource_id} from {prev_stars} to {stars}");
        Ok(aggregate)
    }

    /// `None` for `prev_stars` records a first vote, `Some` revises it.
    pub async fn rate(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        stars: i64,
        prev_stars: Option<i64>,
    ) -> Result<RatingAggregate, RequestError> {
        match prev_stars {
            None => self.add_rating(user_id, resource_id, stars).await,
            Some(prev_stars) => {
                self.update_rating(user_id, resource_id, stars, prev_stars)
                    .await
            }
        }
    }

    pub async fn get_rating_details(
        &self,
        resource_id: ResourceId,
    ) -> Result<RatingAggregate, RequestError> {
        self.storage.rating_details(resource_id).await
    }
}
