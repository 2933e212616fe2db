use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::auth::token::Claims;
use crate::catalog::registry::parse_tag_query;
use crate::error::{Entity, RequestError};
use crate::models::rating::{AddRatingRequest, RatingAggregate, UpdateRatingRequest, UserRating};
use crate::models::resource::{NewUpload, ResourceId, ResourceView, UploadResponse};
use crate::models::user::{LoginRequest, LoginResponse, UserId, WhoAmIResponse};
use crate::server::state::AppState;

type Shared = State<Arc<AppState>>;

#[derive(Debug, Deserialize)]
pub struct TagQuery {
    #[serde(default)]
    pub tags: String,
}

pub async fn list_resources(
    State(state): Shared,
) -> Result<Json<Vec<ResourceView>>, RequestError> {
    Ok(Json(state.catalog.registry.get_all().await?))
}

pub async fn get_resource(
    State(state): Shared,
    Path(id): Path<ResourceId>,
) -> Result<Json<ResourceView>, RequestError> {
    Ok(Json(state.catalog.resources.get_by_id(id).await?))
}

pub async fn filter_resources(
    State(state): Shared,
    Query(query): Query<TagQuery>,
) -> Result<Json<Vec<ResourceView>>, RequestError> {
    let tags = parse_tag_query(&query.tags);
    Ok(Json(state.catalog.registry.get_by_tags(tags).await?))
}

pub async fn list_tags(State(state): Shared) -> Result<Json<BTreeSet<String>>, RequestError> {
    Ok(Json(state.catalog.registry.get_all_tags().await?))
}

pub async fn user_resources(
    State(state): Shared,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<ResourceView>>, RequestError> {
    Ok(Json(state.catalog.registry.get_all_by_user(user_id).await?))
}

/// Proxies the resource's backing file from GitHub.
pub async fn resource_source(
    State(state): Shared,
    Path(id): Path<ResourceId>,
) -> Result<Response, RequestError> {
    let github = state.catalog.resources.get_github_details(id).await?;
    let content = state
        .sources
        .fetch_file(&github.owner, &github.repository, &github.path)
        .await?;
    Ok(([(CONTENT_TYPE, "text/yaml; charset=utf-8")], content).into_response())
}

pub async fn resource_readme(
    State(state): Shared,
    Path(id): Path<ResourceId>,
) -> Result<Response, RequestError> {
    let response = match state.catalog.resources.readme(id).await? {
        Some(readme) => ([(CONTENT_TYPE, "text/markdown; charset=utf-8")], readme).into_response(),
        None => Json("noreadme").into_response(),
    };
    Ok(response)
}

/// Serves the stored manifest; only a successful read counts as a download.
pub async fn download_resource(
    State(state): Shared,
    Path(id): Path<ResourceId>,
) -> Result<Response, RequestError> {
    let path = state.catalog.resources.manifest_path(id);
    let content = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => RequestError::not_found(Entity::Manifest, id),
        _ => e.into(),
    })?;
    state.catalog.resources.increment_downloads(id).await?;
    let disposition = format!("attachment; filename=\"{id}.yaml\"");
    Ok((
        [
            (CONTENT_TYPE, "application/x-yaml".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

pub async fn task_archive(
    State(state): Shared,
    Path(name): Path<String>,
) -> Result<Response, RequestError> {
    let archive = state.archives.build_archive(&name).await?;
    let disposition = format!("attachment; filename=\"{name}.zip\"");
    Ok((
        [
            (CONTENT_TYPE, "application/zip".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        archive,
    )
        .into_response())
}

pub async fn rating_details(
    State(state): Shared,
    Path(id): Path<ResourceId>,
) -> Result<Json<RatingAggregate>, RequestError> {
    Ok(Json(state.catalog.ratings.get_rating_details(id).await?))
}

pub async fn my_rating(
    claims: Claims,
    State(state): Shared,
    Path(id): Path<ResourceId>,
) -> Result<Json<UserRating>, RequestError> {
    Ok(Json(
        state
            .catalog
            .ratings
            .get_user_rating(claims.user_id, id)
            .await?,
    ))
}

pub async fn add_rating(
    claims: Claims,
    State(state): Shared,
    Path(id): Path<ResourceId>,
    Json(payload): Json<AddRatingRequest>,
) -> Result<Json<RatingAggregate>, RequestError> {
    let aggregate = state
        .catalog
        .ratings
        .rate(claims.user_id, id, payload.stars, None)
        .await?;
    Ok(Json(aggregate))
}

pub async fn update_rating(
    claims: Claims,
    State(state): Shared,
    Path(id): Path<ResourceId>,
    Json(payload): Json<UpdateRatingRequest>,
) -> Result<Json<RatingAggregate>, RequestError> {
    let aggregate = state
        .catalog
        .ratings
        .rate(claims.user_id, id, payload.stars, Some(payload.prev_stars))
        .await?;
    Ok(Json(aggregate))
}

pub async fn upload(
    claims: Claims,
    State(state): Shared,
    Json(payload): Json<NewUpload>,
) -> Result<(StatusCode, Json<UploadResponse>), RequestError> {
    let resource_id = state
        .catalog
        .uploads
        .new_upload(&payload, claims.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { resource_id })))
}

pub async fn login(
    State(state): Shared,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, RequestError> {
    Ok(Json(state.login.login(&payload.code).await?))
}

pub async fn whoami(claims: Claims) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        user_id: claims.user_id,
    })
}
