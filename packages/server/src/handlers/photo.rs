use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use common::media::{MediaHost, UploadedImage};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{comment, like, photo, photo_tag, photo_transfer, tag, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::photo::*;
use crate::models::shared::{clamp_limit, validate_description};
use crate::services::{rating, search, tag as tags};
use crate::state::AppState;

pub fn photo_upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(16 * 1024 * 1024) // 16 MB
}

async fn find_photo<C: ConnectionTrait>(conn: &C, photo_id: i32) -> Result<photo::Model, AppError> {
    rating::find_photo(conn, photo_id).await
}

/// Owner-or-admin gate used by the mutating photo endpoints.
fn require_owner_or_admin(auth_user: &AuthUser, target: &photo::Model) -> Result<(), AppError> {
    if target.user_id == auth_user.user_id || auth_user.role == user::ROLE_ADMIN {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

/// Tag sets for a page of photos, fetched in one round trip.
async fn tags_for_photos<C: ConnectionTrait>(
    conn: &C,
    photo_ids: &[i32],
) -> Result<HashMap<i32, Vec<tag::Model>>, AppError> {
    let mut by_photo: HashMap<i32, Vec<tag::Model>> = HashMap::new();
    if photo_ids.is_empty() {
        return Ok(by_photo);
    }

    let rows = photo_tag::Entity::find()
        .filter(photo_tag::Column::PhotoId.is_in(photo_ids.iter().copied()))
        .find_also_related(tag::Entity)
        .all(conn)
        .await?;

    for (link, tag_row) in rows {
        if let Some(tag_row) = tag_row {
            by_photo.entry(link.photo_id).or_default().push(tag_row);
        }
    }
    Ok(by_photo)
}

async fn photo_responses<C: ConnectionTrait>(
    conn: &C,
    photos: Vec<photo::Model>,
) -> Result<Vec<PhotoResponse>, AppError> {
    let ids: Vec<i32> = photos.iter().map(|p| p.id).collect();
    let mut by_photo = tags_for_photos(conn, &ids).await?;

    Ok(photos
        .into_iter()
        .map(|p| {
            let tag_rows = by_photo.remove(&p.id).unwrap_or_default();
            PhotoResponse::new(p, tag_rows)
        })
        .collect())
}

async fn photo_response<C: ConnectionTrait>(
    conn: &C,
    photo: photo::Model,
) -> Result<PhotoResponse, AppError> {
    let tag_rows = tags::tags_of_photo(conn, photo.id).await?;
    Ok(PhotoResponse::new(photo, tag_rows))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Photos",
    operation_id = "uploadPhoto",
    summary = "Upload a photo",
    description = "Multipart upload. The `file` field is required and must be JPEG or PNG; \
        `description` and a comma-separated `tags` field (max 5 distinct names) are optional.",
    request_body(content_type = "multipart/form-data", description = "Image with optional metadata"),
    responses(
        (status = 201, description = "Photo created", body = PhotoResponse),
        (status = 400, description = "Validation or upload error \
            (VALIDATION_ERROR, TAG_LIMIT_EXCEEDED, UPLOAD_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_photo(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<(Vec<u8>, String)> = None;
    let mut description: Option<String> = None;
    let mut tag_names: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
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
            Some("description") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read description: {e}")))?;
                if !text.trim().is_empty() {
                    description = Some(text);
                }
            }
            Some("tags") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read tags: {e}")))?;
                tag_names.extend(text.split(',').map(|s| s.trim().to_string()));
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let (data, content_type) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    validate_description(description.as_deref())?;

    let uploaded = state.media.upload_image(data, &content_type).await?;

    let (created, tag_rows) = persist_or_discard(
        &state.db,
        state.media.as_ref(),
        auth_user.user_id,
        uploaded,
        description,
        &tag_names,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(PhotoResponse::new(created, tag_rows))))
}

/// Store the uploaded image as a photo row with its tags. If anything fails
/// between the upload and the commit, the row never lands, so the hosted
/// object is deleted rather than orphaned.
async fn persist_or_discard(
    db: &DatabaseConnection,
    media: &dyn MediaHost,
    owner_id: i32,
    uploaded: UploadedImage,
    description: Option<String>,
    tag_names: &[String],
) -> Result<(photo::Model, Vec<tag::Model>), AppError> {
    match persist_photo(db, owner_id, &uploaded, description, tag_names).await {
        Ok(created) => Ok(created),
        Err(e) => {
            if let Err(del) = media.delete_image(&uploaded.public_id).await {
                tracing::warn!("Orphaned media object {}: {del}", uploaded.public_id);
            }
            Err(e)
        }
    }
}

async fn persist_photo(
    db: &DatabaseConnection,
    owner_id: i32,
    uploaded: &UploadedImage,
    description: Option<String>,
    tag_names: &[String],
) -> Result<(photo::Model, Vec<tag::Model>), AppError> {
    let now = chrono::Utc::now();
    let txn = db.begin().await?;

    let created = photo::ActiveModel {
        image: Set(uploaded.url.clone()),
        public_id: Set(uploaded.public_id.clone()),
        description: Set(description),
        rating: Set(None),
        user_id: Set(owner_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let tag_rows = tags::attach_tags(&txn, created.id, tag_names).await?;
    txn.commit().await?;

    Ok((created, tag_rows))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Photos",
    operation_id = "listOwnPhotos",
    summary = "List your photos",
    params(PhotoListQuery),
    responses(
        (status = 200, description = "Paginated photo list", body = PhotoListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_own_photos(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PhotoListQuery>,
) -> Result<Json<PhotoListResponse>, AppError> {
    let select = photo::Entity::find().filter(photo::Column::UserId.eq(auth_user.user_id));
    paginated_photos(&state.db, select, query).await
}

#[utoipa::path(
    get,
    path = "/all",
    tag = "Photos",
    operation_id = "listAllPhotos",
    summary = "List everyone's photos",
    params(PhotoListQuery),
    responses(
        (status = 200, description = "Paginated photo list", body = PhotoListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_all_photos(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PhotoListQuery>,
) -> Result<Json<PhotoListResponse>, AppError> {
    paginated_photos(&state.db, photo::Entity::find(), query).await
}

async fn paginated_photos(
    db: &DatabaseConnection,
    select: Select<photo::Entity>,
    query: PhotoListQuery,
) -> Result<Json<PhotoListResponse>, AppError> {
    let page = std::cmp::Ord::max(query.page.unwrap_or(1), 1);
    let per_page = clamp_limit(query.per_page);

    let total = select.clone().count(db).await?;
    let page_rows = select
        .order_by_desc(photo::Column::CreatedAt)
        .offset((page - 1).saturating_mul(per_page))
        .limit(per_page)
        .all(db)
        .await?;

    let data = photo_responses(db, page_rows).await?;
    let total_pages = if per_page == 0 { 0 } else { total.div_ceil(per_page) };

    Ok(Json(PhotoListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/search",
    tag = "Photos",
    operation_id = "searchPhotos",
    summary = "Search tagged photos",
    description = "Filters combine with AND; omitted filters impose no constraint. Only photos \
        with at least one tag are searchable here. Results are ordered by rating (best first, \
        unrated last), then newest first. An empty result is a normal response.",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching photos, possibly empty", body = Vec<PhotoResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn search_photos(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PhotoResponse>>, AppError> {
    let limit = clamp_limit(query.limit);
    let offset = query.offset.unwrap_or(0);

    let found = search::search(&state.db, limit, offset, &query.filters()).await?;
    Ok(Json(photo_responses(&state.db, found).await?))
}

#[utoipa::path(
    get,
    path = "/search/{user_id}",
    tag = "Photos",
    operation_id = "searchPhotosByOwner",
    summary = "List photos by owner",
    description = "Owner id 0 lists every owner. The optional `name` parameter matches a \
        case-insensitive substring of the owner's username.",
    params(("user_id" = i32, Path, description = "Owner ID, or 0 for all"), OwnerSearchQuery),
    responses(
        (status = 200, description = "Matching photos, possibly empty", body = Vec<PhotoResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query), fields(owner_id = user_id))]
pub async fn search_photos_by_owner(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Query(query): Query<OwnerSearchQuery>,
) -> Result<Json<Vec<PhotoResponse>>, AppError> {
    let limit = clamp_limit(query.limit);
    let offset = query.offset.unwrap_or(0);

    let found =
        search::search_by_owner(&state.db, limit, offset, user_id, query.name.as_deref()).await?;
    Ok(Json(photo_responses(&state.db, found).await?))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Photos",
    operation_id = "getPhoto",
    summary = "Get a photo",
    params(("id" = i32, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Photo", body = PhotoResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Photo not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(photo_id))]
pub async fn get_photo(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(photo_id): Path<i32>,
) -> Result<Json<PhotoResponse>, AppError> {
    let target = find_photo(&state.db, photo_id).await?;
    Ok(Json(photo_response(&state.db, target).await?))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Photos",
    operation_id = "updatePhoto",
    summary = "Update a photo's description",
    params(("id" = i32, Path, description = "Photo ID")),
    request_body = UpdatePhotoRequest,
    responses(
        (status = 200, description = "Updated photo", body = PhotoResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Photo not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(photo_id))]
pub async fn update_photo(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(photo_id): Path<i32>,
    AppJson(payload): AppJson<UpdatePhotoRequest>,
) -> Result<Json<PhotoResponse>, AppError> {
    validate_description(payload.description.as_deref())?;

    let target = find_photo(&state.db, photo_id).await?;
    require_owner_or_admin(&auth_user, &target)?;

    let mut active: photo::ActiveModel = target.into();
    active.description = Set(payload.description);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&state.db).await?;

    Ok(Json(photo_response(&state.db, updated).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Photos",
    operation_id = "deletePhoto",
    summary = "Delete a photo",
    description = "Removes the photo row together with its likes, comments, tag associations, \
        and transfer links, then deletes the image from the media host (best effort).",
    params(("id" = i32, Path, description = "Photo ID")),
    responses(
        (status = 204, description = "Photo deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Photo not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(photo_id))]
pub async fn delete_photo(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(photo_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let target = find_photo(&state.db, photo_id).await?;
    require_owner_or_admin(&auth_user, &target)?;

    let txn = state.db.begin().await?;
    like::Entity::delete_many()
        .filter(like::Column::PhotoId.eq(photo_id))
        .exec(&txn)
        .await?;
    comment::Entity::delete_many()
        .filter(comment::Column::PhotoId.eq(photo_id))
        .exec(&txn)
        .await?;
    photo_tag::Entity::delete_many()
        .filter(photo_tag::Column::PhotoId.eq(photo_id))
        .exec(&txn)
        .await?;
    photo_transfer::Entity::delete_many()
        .filter(photo_transfer::Column::PhotoId.eq(photo_id))
        .exec(&txn)
        .await?;
    photo::Entity::delete_by_id(photo_id).exec(&txn).await?;
    txn.commit().await?;

    // Rows are gone; a host failure here leaves an unreferenced object at
    // worst, never a row without its image.
    if let Err(e) = state.media.delete_image(&target.public_id).await {
        tracing::warn!("Media object {} left on the host: {e}", target.public_id);
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/transform",
    tag = "Photos",
    operation_id = "transformPhoto",
    summary = "Create a transformed variant link",
    description = "Builds a delivery URL with the requested transformation applied (no \
        re-upload) and records it as a transfer link.",
    params(("id" = i32, Path, description = "Photo ID"), TransformQuery),
    responses(
        (status = 201, description = "Transfer link created", body = TransferResponse),
        (status = 400, description = "No transformation requested (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Photo not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(photo_id))]
pub async fn transform_photo(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(photo_id): Path<i32>,
    Query(query): Query<TransformQuery>,
) -> Result<impl IntoResponse, AppError> {
    let target = find_photo(&state.db, photo_id).await?;
    require_owner_or_admin(&auth_user, &target)?;

    let transform: common::media::Transform = query.into();
    if transform.width.is_none()
        && transform.height.is_none()
        && transform.crop.is_none()
        && transform.angle.is_none()
        && transform.effect.is_none()
        && transform.quality.is_none()
        && transform.format.is_none()
    {
        return Err(AppError::Validation(
            "At least one transformation parameter is required".into(),
        ));
    }

    let link_url = state.media.transformed_url(&target.public_id, &transform);

    let created = photo_transfer::ActiveModel {
        image: Set(target.public_id),
        link_url: Set(link_url),
        link_qr: Set(None),
        photo_id: Set(photo_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(TransferResponse::from(created))))
}

#[utoipa::path(
    put,
    path = "/{id}/rating",
    tag = "Ratings",
    operation_id = "ratePhoto",
    summary = "Rate a photo",
    description = "Records a 1-5 rating. One rating per user per photo; rating your own photo \
        is rejected.",
    params(("id" = i32, Path, description = "Photo ID"), RatingQuery),
    responses(
        (status = 200, description = "Photo with the updated aggregate", body = PhotoResponse),
        (status = 400, description = "Invalid value or own photo (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Photo not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already rated (ALREADY_RATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(photo_id, value = query.value))]
pub async fn rate_photo(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(photo_id): Path<i32>,
    Query(query): Query<RatingQuery>,
) -> Result<Json<PhotoResponse>, AppError> {
    let updated = rating::submit_rating(&state.db, photo_id, query.value, auth_user.user_id).await?;
    Ok(Json(photo_response(&state.db, updated).await?))
}

#[utoipa::path(
    get,
    path = "/{id}/rating",
    tag = "Ratings",
    operation_id = "listPhotoRatings",
    summary = "List a photo's ratings",
    description = "Admin/moderator only. A photo with no ratings yet reports NOT_FOUND on \
        this path rather than an empty list.",
    params(("id" = i32, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Ratings with rater identity", body = Vec<RatingEntry>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No ratings (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(photo_id))]
pub async fn list_photo_ratings(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(photo_id): Path<i32>,
) -> Result<Json<Vec<RatingEntry>>, AppError> {
    auth_user.require_role(&[user::ROLE_ADMIN, user::ROLE_MODERATOR])?;

    let rows = rating::list_ratings(&state.db, photo_id).await?;
    let entries = rows
        .into_iter()
        .map(|(like_row, rater)| RatingEntry {
            like_id: like_row.id,
            value: like_row.value,
            user_id: like_row.user_id,
            username: rater.map(|u| u.username).unwrap_or_default(),
        })
        .collect();

    Ok(Json(entries))
}

#[utoipa::path(
    delete,
    path = "/rating/{like_id}",
    tag = "Ratings",
    operation_id = "deleteRating",
    summary = "Delete a rating",
    description = "Admin/moderator only. Recomputes the photo's aggregate; deleting the last \
        rating resets it to null.",
    params(("like_id" = i32, Path, description = "Like ID")),
    responses(
        (status = 200, description = "Photo with the updated aggregate", body = PhotoResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Like not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(like_id))]
pub async fn delete_rating(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(like_id): Path<i32>,
) -> Result<Json<PhotoResponse>, AppError> {
    auth_user.require_role(&[user::ROLE_ADMIN, user::ROLE_MODERATOR])?;

    let updated = rating::retract_rating(&state.db, like_id).await?;
    Ok(Json(photo_response(&state.db, updated).await?))
}

#[utoipa::path(
    post,
    path = "/qr/{transfer_id}",
    tag = "Photos",
    operation_id = "generateQr",
    summary = "Generate a QR code for a transfer link",
    description = "Admin/moderator only. Renders the transfer link as a QR image and stores \
        its URL; once set it is never regenerated.",
    params(("transfer_id" = i32, Path, description = "Transfer link ID")),
    responses(
        (status = 200, description = "Transfer link with QR URL", body = TransferResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Transfer link not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(transfer_id))]
pub async fn generate_qr(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(transfer_id): Path<i32>,
) -> Result<Json<TransferResponse>, AppError> {
    auth_user.require_role(&[user::ROLE_ADMIN, user::ROLE_MODERATOR])?;

    let transfer = photo_transfer::Entity::find_by_id(transfer_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer link not found".into()))?;

    if transfer.link_qr.is_some() {
        return Ok(Json(TransferResponse::from(transfer)));
    }

    let qr_url = state.media.upload_qr(&transfer.link_url).await?;

    let mut active: photo_transfer::ActiveModel = transfer.into();
    active.link_qr = Set(Some(qr_url));
    let updated = active.update(&state.db).await?;

    Ok(Json(TransferResponse::from(updated)))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use common::mail::LogMailer;
    use common::media::{MediaError, Transform};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    use crate::config::{AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig};

    use super::*;

    #[derive(Default)]
    struct RecordingMedia {
        deleted: Mutex<Vec<String>>,
        fail_deletes: bool,
    }

    #[async_trait::async_trait]
    impl MediaHost for RecordingMedia {
        async fn upload_image(
            &self,
            _data: Vec<u8>,
            _content_type: &str,
        ) -> Result<UploadedImage, MediaError> {
            Ok(UploadedImage {
                url: "https://img.example/up.jpg".into(),
                public_id: "photoshare/up".into(),
            })
        }

        async fn delete_image(&self, public_id: &str) -> Result<(), MediaError> {
            self.deleted.lock().unwrap().push(public_id.to_string());
            if self.fail_deletes {
                return Err(MediaError::Protocol("host unreachable".into()));
            }
            Ok(())
        }

        fn transformed_url(&self, public_id: &str, _transform: &Transform) -> String {
            format!("https://img.example/{public_id}")
        }

        async fn upload_qr(&self, _link_url: &str) -> Result<String, MediaError> {
            Ok("https://img.example/qr.png".into())
        }
    }

    fn test_state(db: DatabaseConnection, media: Arc<RecordingMedia>) -> AppState {
        AppState {
            db,
            config: Arc::new(AppConfig {
                server: ServerConfig {
                    host: "127.0.0.1".into(),
                    port: 0,
                    base_url: "http://127.0.0.1:0".into(),
                    cors: CorsConfig {
                        allow_origins: vec![],
                        max_age: 3600,
                    },
                },
                database: DatabaseConfig {
                    url: "postgres://unused".into(),
                    max_connections: 1,
                    min_connections: 1,
                    connect_timeout_secs: 1,
                    idle_timeout_secs: 1,
                },
                auth: AuthConfig {
                    jwt_secret: "test-secret".into(),
                },
                media: common::media::CloudinaryConfig {
                    cloud_name: "demo".into(),
                    api_key: "key".into(),
                    api_secret: "secret".into(),
                },
                mail: None,
            }),
            media,
            mailer: Arc::new(LogMailer),
        }
    }

    fn photo_row(id: i32, user_id: i32) -> BTreeMap<&'static str, Value> {
        let now = chrono::Utc::now();
        BTreeMap::from([
            ("id", Value::from(id)),
            ("image", Value::from("https://img.example/cat.jpg")),
            ("public_id", Value::from("photoshare/cat")),
            ("description", Value::from(Option::<String>::None)),
            ("rating", Value::from(Option::<f64>::None)),
            ("user_id", Value::from(user_id)),
            ("created_at", Value::from(now)),
            ("updated_at", Value::from(now)),
        ])
    }

    fn uploaded_cat() -> UploadedImage {
        UploadedImage {
            url: "https://img.example/cat.jpg".into(),
            public_id: "photoshare/cat".into(),
        }
    }

    #[tokio::test]
    async fn failed_photo_insert_discards_the_uploaded_image() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("insert failed".into())])
            .into_connection();
        let media = RecordingMedia::default();

        let err = persist_or_discard(&db, &media, 7, uploaded_cat(), None, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(media.deleted.lock().unwrap().as_slice(), ["photoshare/cat"]);
    }

    #[tokio::test]
    async fn tag_failure_after_the_insert_discards_the_uploaded_image() {
        let names: Vec<String> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|s| ToString::to_string(s))
            .collect();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // insert photo (RETURNING), then attach: photo check, current tags
            .append_query_results([vec![photo_row(1, 7)]])
            .append_query_results([vec![photo_row(1, 7)]])
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();
        let media = RecordingMedia::default();

        let err = persist_or_discard(&db, &media, 7, uploaded_cat(), None, &names)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TagLimitExceeded));
        assert_eq!(media.deleted.lock().unwrap().as_slice(), ["photoshare/cat"]);
    }

    #[tokio::test]
    async fn huge_page_numbers_do_not_overflow_the_offset() {
        let count_row: BTreeMap<&str, Value> = BTreeMap::from([("num_items", Value::from(0i64))]);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row]])
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();

        let query = PhotoListQuery {
            page: Some(u64::MAX),
            per_page: Some(50),
        };
        let Json(page) = paginated_photos(&db, photo::Entity::find(), query)
            .await
            .unwrap();

        assert!(page.data.is_empty());
        assert_eq!(page.pagination.page, u64::MAX);
    }

    #[tokio::test]
    async fn photo_rows_are_deleted_even_when_the_media_host_fails() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![photo_row(1, 7)]])
            // likes, comments, tag links, transfers, photo
            .append_exec_results(vec![
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                };
                5
            ])
            .into_connection();
        let media = Arc::new(RecordingMedia {
            fail_deletes: true,
            ..Default::default()
        });
        let state = test_state(db, media.clone());

        let auth_user = AuthUser {
            user_id: 7,
            username: "alice".into(),
            email: "a@b.c".into(),
            role: user::ROLE_USER.into(),
            token: "token".into(),
        };

        let response = delete_photo(auth_user, State(state), Path(1))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(media.deleted.lock().unwrap().as_slice(), ["photoshare/cat"]);
    }
}
