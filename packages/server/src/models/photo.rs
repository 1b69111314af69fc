use chrono::{DateTime, Utc};
use common::media::Transform;
use serde::{Deserialize, Serialize};

use crate::entity::{photo, photo_transfer, tag};
use crate::services::search::SearchFilters;

pub use super::shared::Pagination;

/// A photo as returned by every photo endpoint.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PhotoResponse {
    #[schema(example = 7)]
    pub id: i32,
    /// Delivery URL on the media host.
    pub image: String,
    pub description: Option<String>,
    /// Mean of the photo's like values rounded to 2 decimals; `null`
    /// until the first rating arrives.
    #[schema(example = 4.5)]
    pub rating: Option<f64>,
    #[schema(example = 42)]
    pub user_id: i32,
    #[schema(example = json!(["cats", "sunset"]))]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PhotoResponse {
    pub fn new(photo: photo::Model, tags: Vec<tag::Model>) -> Self {
        Self {
            id: photo.id,
            image: photo.image,
            description: photo.description,
            rating: photo.rating,
            user_id: photo.user_id,
            tags: tags.into_iter().map(|t| t.name).collect(),
            created_at: photo.created_at,
            updated_at: photo.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PhotoListResponse {
    pub data: Vec<PhotoResponse>,
    pub pagination: Pagination,
}

/// Body for `PUT /photos/{id}`. Only the description is client-mutable;
/// the rating is derived state.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdatePhotoRequest {
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PhotoListQuery {
    /// 1-based page number.
    pub page: Option<u64>,
    /// Page size (max 50).
    pub per_page: Option<u64>,
}

/// Query parameters for `GET /photos/search`.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive substring match on the description.
    pub keyword: Option<String>,
    /// Restrict to photos carrying this tag.
    pub tag_id: Option<i32>,
    /// Lower rating bound; unrated photos still match.
    pub min_rating: Option<f64>,
    /// Upper rating bound; unrated photos still match.
    pub max_rating: Option<f64>,
    /// Inclusive creation-time lower bound.
    pub created_after: Option<DateTime<Utc>>,
    /// Inclusive creation-time upper bound.
    pub created_before: Option<DateTime<Utc>>,
    /// Page size (clamped to 0-50).
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SearchQuery {
    pub fn filters(&self) -> SearchFilters {
        SearchFilters {
            keyword: self.keyword.clone(),
            tag_id: self.tag_id,
            min_rating: self.min_rating,
            max_rating: self.max_rating,
            created_after: self.created_after,
            created_before: self.created_before,
        }
    }
}

/// Query parameters for `GET /photos/search/{user_id}`.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct OwnerSearchQuery {
    /// Case-insensitive substring match on the owner's username.
    pub name: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Query parameters for `GET /photos/{id}/transform`, mapped 1:1 onto the
/// media host's URL transformation.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct TransformQuery {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Crop mode understood by the media host (e.g. `fill`, `fit`).
    pub crop: Option<String>,
    /// Rotation in degrees.
    pub angle: Option<i32>,
    pub effect: Option<String>,
    /// Quality percentage (1-100).
    pub quality: Option<u8>,
    /// Target format (e.g. `png`, `webp`).
    pub format: Option<String>,
}

impl From<TransformQuery> for Transform {
    fn from(q: TransformQuery) -> Self {
        Transform {
            width: q.width,
            height: q.height,
            crop: q.crop,
            angle: q.angle,
            effect: q.effect,
            quality: q.quality,
            format: q.format,
        }
    }
}

/// A generated shareable link for a transformed photo variant.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TransferResponse {
    pub id: i32,
    /// Media-host handle of the source image.
    pub image: String,
    pub link_url: String,
    /// QR-code image URL; populated once by the QR endpoint.
    pub link_qr: Option<String>,
    pub photo_id: i32,
}

impl From<photo_transfer::Model> for TransferResponse {
    fn from(t: photo_transfer::Model) -> Self {
        Self {
            id: t.id,
            image: t.image,
            link_url: t.link_url,
            link_qr: t.link_qr,
            photo_id: t.photo_id,
        }
    }
}

/// Query parameter for `PUT /photos/{id}/rating`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct RatingQuery {
    /// Rating value, 1-5 inclusive.
    pub value: i32,
}

/// One like on a photo, paired with its rater.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RatingEntry {
    /// Like ID, usable with `DELETE /photos/rating/{like_id}`.
    pub like_id: i32,
    #[schema(example = 4)]
    pub value: i32,
    pub user_id: i32,
    /// Rater's username; empty if the account was since removed.
    pub username: String,
}
