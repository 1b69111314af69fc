use axum::extract::{Multipart, Path, State};
use axum::Json;
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::auth::UserResponse;
use crate::state::AppState;

async fn find_user<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    operation_id = "currentUser",
    summary = "Current user's profile",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn current_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let account = find_user(&state.db, auth_user.user_id).await?;
    Ok(Json(UserResponse::from(account)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Look up a user",
    description = "Admin only.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(target_id = user_id))]
pub async fn get_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_role(&[user::ROLE_ADMIN])?;

    let account = find_user(&state.db, user_id).await?;
    Ok(Json(UserResponse::from(account)))
}

#[utoipa::path(
    patch,
    path = "/avatar",
    tag = "Users",
    operation_id = "updateAvatar",
    summary = "Upload a new avatar",
    description = "Multipart upload with a single `file` field (JPEG or PNG).",
    request_body(content_type = "multipart/form-data", description = "Avatar image"),
    responses(
        (status = 200, description = "Profile with the new avatar", body = UserResponse),
        (status = 400, description = "Validation or upload error \
            (VALIDATION_ERROR, UPLOAD_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn update_avatar(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UserResponse>, AppError> {
    let mut file: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("file") {
            let content_type = field
                .content_type()
                .ok_or_else(|| AppError::Validation("File field must have a content type".into()))?
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
            file = Some((data.to_vec(), content_type));
        }
    }

    let (data, content_type) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let uploaded = state.media.upload_image(data, &content_type).await?;

    let account = find_user(&state.db, auth_user.user_id).await?;
    let mut active: user::ActiveModel = account.into();
    active.avatar = Set(Some(uploaded.url));
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&state.db).await?;

    Ok(Json(UserResponse::from(updated)))
}
