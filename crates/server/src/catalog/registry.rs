use std::collections::BTreeSet;

use crate::error::RequestError;
use crate::models::resource::{ResourceFilter, ResourceView};
use crate::models::user::UserId;
use crate::storage::SharedStorage;

/// Read side of the catalog. Views carry counters read together with the record.
#[derive(Clone)]
pub struct RegistryQuery {
    storage: SharedStorage,
}

impl RegistryQuery {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    pub async fn get_all(&self) -> Result<Vec<ResourceView>, RequestError> {
        self.storage.list_resources(&ResourceFilter::All).await
    }

    /// Resources carrying at least one of `tags`.
    pub async fn get_by_tags(
        &self,
        tags: BTreeSet<String>,
    ) -> Result<Vec<ResourceView>, RequestError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        self.storage
            .list_resources(&ResourceFilter::Tags(tags))
            .await
    }

    pub async fn get_all_tags(&self) -> Result<BTreeSet<String>, RequestError> {
        self.storage.all_tags().await
    }

    pub async fn get_all_by_user(&self, user_id: UserId) -> Result<Vec<ResourceView>, RequestError> {
        self.storage
            .list_resources(&ResourceFilter::Uploader(user_id))
            .await
    }
}

/// Splits a `a|b|c` query value into a tag set, dropping blanks.
pub fn parse_tag_query(query: &str) -> BTreeSet<String> {
    query
        .split('|')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
