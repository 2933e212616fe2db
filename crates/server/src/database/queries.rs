use sqlx::{Error as SqlxError, PgExecutor};
use tracing::instrument;

use crate::database::utils::map_not_found_as_none;
use crate::models::rating::RatingAggregate;
use crate::models::resource::{
    GithubPointer, ResourceFilter, ResourceId, ResourceRow, ResourceView,
};
use crate::models::user::UserId;

const RESOURCE_VIEW_SELECT: &str = "
    SELECT
        resources.id AS id, resources.name AS name, resources.description AS description,
        resources.kind AS kind, resources.uploader_id AS uploader_id,
        resources.github_owner AS github_owner, resources.github_repository AS github_repository,
        resources.github_path AS github_path, resources.download_count AS download_count,
        resources.rating_count AS rating_count, resources.rating_sum AS rating_sum,
        resources.created_at AS created_at,
        COALESCE(
            ARRAY_AGG(resource_tags.tag ORDER BY resource_tags.tag)
                FILTER (WHERE resource_tags.tag IS NOT NULL),
            '{}'
        ) AS tags
    FROM
        resources LEFT JOIN resource_tags ON resource_tags.resource_id = resources.id
";

const RESOURCE_VIEW_GROUPING: &str = "
    GROUP BY
        resources.id
    ORDER BY
        resources.id
";

#[instrument(skip(executor))]
pub async fn resource_view<'a, E: PgExecutor<'a>>(
    executor: E,
    resource_id: ResourceId,
) -> Result<Option<ResourceView>, SqlxError> {
    let sql = format!("{RESOURCE_VIEW_SELECT} WHERE resources.id = $1 {RESOURCE_VIEW_GROUPING}");
    let row: Result<ResourceRow, SqlxError> = sqlx::query_as(&sql)
        .bind(resource_id)
        .fetch_one(executor)
        .await;
    Ok(map_not_found_as_none(row)?.map(ResourceView::from))
}

#[instrument(skip(executor))]
pub async fn list_resource_views<'a, E: PgExecutor<'a>>(
    executor: E,
    filter: &ResourceFilter,
) -> Result<Vec<ResourceView>, SqlxError> {
    let rows: Vec<ResourceRow> = match filter {
        ResourceFilter::All => {
            let sql = format!("{RESOURCE_VIEW_SELECT} {RESOURCE_VIEW_GROUPING}");
            sqlx::query_as(&sql).fetch_all(executor).await?
        }
        ResourceFilter::Tags(tags) => {
            let sql = format!(
                "{RESOURCE_VIEW_SELECT}
                WHERE resources.id IN (SELECT resource_id FROM resource_tags WHERE tag = ANY($1))
                {RESOURCE_VIEW_GROUPING}"
            );
            let tags: Vec<String> = tags.iter().cloned().collect();
            sqlx::query_as(&sql).bind(tags).fetch_all(executor).await?
        }
        ResourceFilter::Uploader(user_id) => {
            let sql = format!(
                "{RESOURCE_VIEW_SELECT} WHERE resources.uploader_id = $1 {RESOURCE_VIEW_GROUPING}"
            );
            sqlx::query_as(&sql).bind(user_id).fetch_all(executor).await?
        }
    };
    Ok(rows.into_iter().map(ResourceView::from).collect())
}

#[instrument(skip(executor))]
pub async fn github_details<'a, E: PgExecutor<'a>>(
    executor: E,
    resource_id: ResourceId,
) -> Result<Option<GithubPointer>, SqlxError> {
    sqlx::query_as(
        "
    SELECT
        github_owner AS owner, github_repository AS repository, github_path AS path
    FROM
        resources
    WHERE
        id = $1;
    ",
    )
    .bind(resource_id)
    .fetch_optional(executor)
    .await
}

#[instrument(skip(executor))]
pub async fn all_tags<'a, E: PgExecutor<'a>>(executor: E) -> Result<Vec<String>, SqlxError> {
    sqlx::query_scalar("SELECT DISTINCT tag FROM resource_tags ORDER BY tag;")
        .fetch_all(executor)
        .await
}

#[instrument(skip(executor))]
pub async fn resource_exists<'a, E: PgExecutor<'a>>(
    executor: E,
    resource_id: ResourceId,
) -> Result<bool, SqlxError> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM resources WHERE id = $1);")
        .bind(resource_id)
        .fetch_one(executor)
        .await
}

#[instrument(skip(executor))]
pub async fn user_stars<'a, E: PgExecutor<'a>>(
    executor: E,
    user_id: UserId,
    resource_id: ResourceId,
) -> Result<Option<i16>, SqlxError> {
    sqlx::query_scalar("SELECT stars FROM ratings WHERE user_id = $1 AND resource_id = $2;")
        .bind(user_id)
        .bind(resource_id)
        .fetch_optional(executor)
        .await
}

#[instrument(skip(executor))]
pub async fn rating_aggregate<'a, E: PgExecutor<'a>>(
    executor: E,
    resource_id: ResourceId,
) -> Result<Option<RatingAggregate>, SqlxError> {
    let row: Option<(i64, i64)> =
        sqlx::query_as("SELECT rating_count, rating_sum FROM resources WHERE id = $1;")
            .bind(resource_id)
            .fetch_optional(executor)
            .await?;
    Ok(row.map(|(count, sum)| RatingAggregate::new(count, sum)))
}
