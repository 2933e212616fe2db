use sqlx::{Error as SqlxError, PgExecutor, Postgres, Row, Transaction};
use tracing::{info, instrument};

use crate::models::rating::{RatingAggregate, Stars};
use crate::models::resource::{CreateResource, ResourceId};
use crate::models::user::{UpsertUser, UserId};

#[instrument(skip_all)]
pub async fn upsert_user<'a, E: PgExecutor<'a>>(
    executor: E,
    user: &UpsertUser,
) -> Result<UserId, SqlxError> {
    let result = sqlx::query(
        "
            INSERT INTO users (id, username, access_token, created_at)
            VALUES ($1, $2, $3, current_timestamp)
            ON CONFLICT (id) DO UPDATE
                SET username = EXCLUDED.username, access_token = EXCLUDED.access_token
            RETURNING id;
        ",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.access_token)
    .fetch_one(executor)
    .await?
    .try_get("id")?;
    info!("upserted user with id: {}", result);
    Ok(result)
}

#[instrument(skip_all)]
pub async fn create_resource(
    transaction: &mut Transaction<'_, Postgres>,
    resource: &CreateResource,
) -> Result<ResourceId, SqlxError> {
    let id: ResourceId = sqlx::query(
        "
            INSERT INTO resources (name, description, kind, uploader_id, github_owner, github_repository, github_path, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, current_timestamp) RETURNING id;
        ",
    )
        .bind(&resource.name)
        .bind(&resource.description)
        .bind(resource.kind)
        .bind(resource.uploader_id)
        .bind(&resource.github.owner)
        .bind(&resource.github.repository)
        .bind(&resource.github.path)
        .fetch_one(transaction.as_mut())
        .await?
        .try_get("id")?;
    let tags: Vec<String> = resource.tags.iter().cloned().collect();
    sqlx::query(
        "INSERT INTO resource_tags (resource_id, tag) SELECT $1, UNNEST($2::text[]);",
    )
    .bind(id)
    .bind(tags)
    .execute(transaction.as_mut())
    .await?;
    info!("created resource with id: {}", id);
    Ok(id)
}

#[instrument(skip(executor))]
pub async fn increment_downloads<'a, E: PgExecutor<'a>>(
    executor: E,
    resource_id: ResourceId,
) -> Result<Option<i64>, SqlxError> {
    sqlx::query_scalar(
        "UPDATE resources SET download_count = download_count + 1 WHERE id = $1 RETURNING download_count;",
    )
    .bind(resource_id)
    .fetch_optional(executor)
    .await
}

/// Takes the row lock that serializes rating writes for one resource.
#[instrument(skip(transaction))]
pub async fn lock_rating_aggregate(
    transaction: &mut Transaction<'_, Postgres>,
    resource_id: ResourceId,
) -> Result<Option<RatingAggregate>, SqlxError> {
    let row = sqlx::query(
        "SELECT rating_count, rating_sum FROM resources WHERE id = $1 FOR UPDATE;",
    )
    .bind(resource_id)
    .fetch_optional(transaction.as_mut())
    .await?;
    row.map(|row| {
        Ok(RatingAggregate::new(
            row.try_get("rating_count")?,
            row.try_get("rating_sum")?,
        ))
    })
    .transpose()
}

/// Returns `false` when the user already holds a rating for the resource.
#[instrument(skip(executor))]
pub async fn insert_user_rating<'a, E: PgExecutor<'a>>(
    executor: E,
    user_id: UserId,
    resource_id: ResourceId,
    stars: Stars,
) -> Result<bool, SqlxError> {
    let result = sqlx::query(
        "
            INSERT INTO ratings (user_id, resource_id, stars, rated_at)
            VALUES ($1, $2, $3, current_timestamp)
            ON CONFLICT (user_id, resource_id) DO NOTHING;
        ",
    )
    .bind(user_id)
    .bind(resource_id)
    .bind(stars.get())
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Compare-and-set of the stored rating, `false` when `prev` is not the stored value.
#[instrument(skip(executor))]
pub async fn replace_user_rating<'a, E: PgExecutor<'a>>(
    executor: E,
    user_id: UserId,
    resource_id: ResourceId,
    stars: Stars,
    prev: Stars,
) -> Result<bool, SqlxError> {
    let result = sqlx::query(
        "
            UPDATE ratings SET stars = $3, rated_at = current_timestamp
            WHERE user_id = $1 AND resource_id = $2 AND stars = $4;
        ",
    )
    .bind(user_id)
    .bind(resource_id)
    .bind(stars.get())
    .bind(prev.get())
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

#[instrument(skip(executor))]
pub async fn apply_rating_delta<'a, E: PgExecutor<'a>>(
    executor: E,
    resource_id: ResourceId,
    count_delta: i64,
    sum_delta: i64,
) -> Result<RatingAggregate, SqlxError> {
    let row = sqlx::query(
        "
            UPDATE resources
            SET rating_count = rating_count + $2, rating_sum = rating_sum + $3
            WHERE id = $1
            RETURNING rating_count, rating_sum;
        ",
    )
    .bind(resource_id)
    .bind(count_delta)
    .bind(sum_delta)
    .fetch_one(executor)
    .await?;
    Ok(RatingAggregate::new(
        row.try_get("rating_count")?,
        row.try_get("rating_sum")?,
    ))
}
