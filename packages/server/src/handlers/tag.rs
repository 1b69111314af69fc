use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use sea_orm::*;
use tracing::instrument;

use crate::entity::tag;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::tag::{TagResponse, validate_tag_name};
use crate::services::tag as tags;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Tags",
    operation_id = "listTags",
    summary = "List all tags",
    responses(
        (status = 200, description = "Every tag in the system", body = Vec<TagResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_tags(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TagResponse>>, AppError> {
    let rows = tag::Entity::find()
        .order_by_asc(tag::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(TagResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/{name}",
    tag = "Tags",
    operation_id = "createOrGetTag",
    summary = "Create a tag, or fetch it if it exists",
    params(("name" = String, Path, description = "Tag name")),
    responses(
        (status = 200, description = "The tag", body = TagResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(tag_name = %name))]
pub async fn create_or_get_tag(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TagResponse>, AppError> {
    validate_tag_name(&name)?;
    let name = name.trim().to_string();

    let existing = tag::Entity::find()
        .filter(tag::Column::Name.eq(&name))
        .one(&state.db)
        .await?;

    let row = match existing {
        Some(row) => row,
        None => {
            tag::ActiveModel {
                name: Set(name),
                ..Default::default()
            }
            .insert(&state.db)
            .await?
        }
    };

    Ok(Json(TagResponse::from(row)))
}

#[utoipa::path(
    delete,
    path = "/{name}",
    tag = "Tags",
    operation_id = "deleteTag",
    summary = "Delete a tag everywhere",
    description = "Removes the tag from every photo carrying it, then deletes the tag itself.",
    params(("name" = String, Path, description = "Tag name")),
    responses(
        (status = 204, description = "Tag deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Tag not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(tag_name = %name))]
pub async fn delete_tag(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tags::detach_tag(&state.db, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}
