use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{comment, photo, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::comment::{
    CommentResponse, CreateCommentRequest, UpdateCommentRequest, validate_comment_text,
};
use crate::state::AppState;

async fn find_comment<C: ConnectionTrait>(
    conn: &C,
    comment_id: i32,
) -> Result<comment::Model, AppError> {
    comment::Entity::find_by_id(comment_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Comments",
    operation_id = "addComment",
    summary = "Comment on a photo",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Photo not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(photo_id = payload.photo_id))]
pub async fn add_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_comment_text(&payload.text)?;

    photo::Entity::find_by_id(payload.photo_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Photo not found".into()))?;

    let now = chrono::Utc::now();
    let created = comment::ActiveModel {
        text: Set(payload.text.trim().to_string()),
        photo_id: Set(payload.photo_id),
        user_id: Set(auth_user.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/photo/{photo_id}",
    tag = "Comments",
    operation_id = "listPhotoComments",
    summary = "List a photo's comments",
    params(("photo_id" = i32, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Comments, oldest first", body = Vec<CommentResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Photo not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(photo_id))]
pub async fn list_photo_comments(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(photo_id): Path<i32>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    photo::Entity::find_by_id(photo_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Photo not found".into()))?;

    let rows = comment::Entity::find()
        .filter(comment::Column::PhotoId.eq(photo_id))
        .order_by_asc(comment::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(CommentResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/{comment_id}",
    tag = "Comments",
    operation_id = "editComment",
    summary = "Edit a comment",
    description = "Only the comment's author may edit it.",
    params(("comment_id" = i32, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated comment", body = CommentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(comment_id))]
pub async fn edit_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<i32>,
    AppJson(payload): AppJson<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    validate_comment_text(&payload.text)?;

    let target = find_comment(&state.db, comment_id).await?;
    if target.user_id != auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }

    let mut active: comment::ActiveModel = target.into();
    active.text = Set(payload.text.trim().to_string());
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&state.db).await?;

    Ok(Json(CommentResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/{comment_id}",
    tag = "Comments",
    operation_id = "removeComment",
    summary = "Delete a comment",
    description = "Admin/moderator only.",
    params(("comment_id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(comment_id))]
pub async fn remove_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_role(&[user::ROLE_ADMIN, user::ROLE_MODERATOR])?;

    let target = find_comment(&state.db, comment_id).await?;
    comment::Entity::delete_by_id(target.id).exec(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}
