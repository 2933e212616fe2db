use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::ValidationError;
use crate::models::rating::RatingAggregate;
use crate::models::user::UserId;

pub type ResourceId = i64;

const RESOURCE_NAME_LENGTH_LIMIT: usize = 100;
const RESOURCE_DESCRIPTION_LENGTH_LIMIT: usize = 1000;
const TAG_LENGTH_LIMIT: usize = 50;
const GITHUB_OWNER_LENGTH_LIMIT: usize = 100;
const GITHUB_REPOSITORY_LENGTH_LIMIT: usize = 100;
const GITHUB_PATH_LENGTH_LIMIT: usize = 255;

#[derive(
    Clone, Debug, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "resource_kind")]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ResourceKind {
    Task,
    Pipeline,
}

/// Location of the file backing a resource inside a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GithubPointer {
    pub owner: String,
    pub repository: String,
    pub path: String,
}

/// Upload body as received from a client, before validation.
#[derive(Clone, Debug, Deserialize)]
pub struct NewUpload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub github: GithubPointer,
}

/// Validated resource ready to be persisted.
#[derive(Clone, Debug)]
pub struct CreateResource {
    pub name: String,
    pub description: String,
    pub kind: ResourceKind,
    pub tags: BTreeSet<String>,
    pub github: GithubPointer,
    pub uploader_id: UserId,
}

#[derive(Clone, Debug, Serialize)]
pub struct UploadResponse {
    pub resource_id: ResourceId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceFilter {
    All,
    Tags(BTreeSet<String>),
    Uploader(UserId),
}

/// Catalog view of a resource, static fields joined with its counters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceView {
    pub id: ResourceId,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub tags: Vec<String>,
    pub github: GithubPointer,
    pub uploader_id: UserId,
    pub download_count: i64,
    #[serde(flatten)]
    pub rating: RatingAggregate,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ResourceRow {
    pub id: ResourceId,
    pub name: String,
    pub description: String,
    pub kind: ResourceKind,
    pub tags: Vec<String>,
    pub github_owner: String,
    pub github_repository: String,
    pub github_path: String,
    pub uploader_id: UserId,
    pub download_count: i64,
    pub rating_count: i64,
    pub rating_sum: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ResourceRow> for ResourceView {
    fn from(row: ResourceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            kind: row.kind,
            tags: row.tags,
            github: GithubPointer {
                owner: row.github_owner,
                repository: row.github_repository,
                path: row.github_path,
            },
            uploader_id: row.uploader_id,
            download_count: row.download_count,
            rating: RatingAggregate::new(row.rating_count, row.rating_sum),
            created_at: row.created_at,
        }
    }
}

pub fn validate_resource_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::InvalidInput {
            value: name.to_string(),
            reason: "resource name cannot be empty".to_string(),
        });
    }
    if name.chars().count() > RESOURCE_NAME_LENGTH_LIMIT {
        return Err(ValidationError::InvalidInput {
            value: name.to_string(),
            reason: format!(
                "resource name cannot be longer than {} chars",
                RESOURCE_NAME_LENGTH_LIMIT
            ),
        });
    }
    Ok(name.to_string())
}

pub fn validate_resource_description(description: &str) -> Result<String, ValidationError> {
    let description = description.trim();
    if description.chars().count() > RESOURCE_DESCRIPTION_LENGTH_LIMIT {
        return Err(ValidationError::InvalidInput {
            value: "<description>".to_string(),
            reason: format!(
                "resource description cannot be longer than {} chars",
                RESOURCE_DESCRIPTION_LENGTH_LIMIT
            ),
        });
    }
    Ok(description.to_string())
}

pub fn validate_resource_kind(kind: &str) -> Result<ResourceKind, ValidationError> {
    ResourceKind::from_str(kind.trim())
        .map_err(|_| ValidationError::InvalidResourceType(kind.to_string()))
}

pub fn validate_github_pointer(github: &GithubPointer) -> Result<GithubPointer, ValidationError> {
    let pointer = GithubPointer {
        owner: github.owner.trim().to_string(),
        repository: github.repository.trim().to_string(),
        path: github.path.trim().trim_start_matches('/').to_string(),
    };
    let fields = [
        ("owner", &pointer.owner, GITHUB_OWNER_LENGTH_LIMIT),
        ("repository", &pointer.repository, GITHUB_REPOSITORY_LENGTH_LIMIT),
        ("path", &pointer.path, GITHUB_PATH_LENGTH_LIMIT),
    ];
    for (field, value, limit) in fields {
        if value.is_empty() {
            return Err(ValidationError::MalformedGithubPointer {
                field: field.to_string(),
            });
        }
        if value.chars().count() > limit {
            return Err(ValidationError::InvalidInput {
                value: format!("<github.{field}>"),
                reason: format!("github {field} cannot be longer than {limit} chars"),
            });
        }
    }
    Ok(pointer)
}

/// Trims every tag and collapses duplicates.
pub fn normalize_tags<I, S>(tags: I) -> Result<BTreeSet<String>, ValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized = BTreeSet::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            return Err(ValidationError::InvalidInput {
                value: tag.to_string(),
                reason: "tag cannot be empty".to_string(),
            });
        }
        if tag.chars().count() > TAG_LENGTH_LIMIT {
            return Err(ValidationError::InvalidInput {
                value: tag.to_string(),
                reason: format!("tag cannot be longer than {} chars", TAG_LENGTH_LIMIT),
            });
        }
        normalized.insert(tag.to_string());
    }
    Ok(normalized)
}
