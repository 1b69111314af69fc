use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::comment;

pub use super::shared::validate_comment_text;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    /// Comment text (1-250 characters).
    #[schema(example = "Great shot!")]
    pub text: String,
    pub photo_id: i32,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateCommentRequest {
    #[schema(example = "Great shot!")]
    pub text: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub text: String,
    pub photo_id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<comment::Model> for CommentResponse {
    fn from(c: comment::Model) -> Self {
        Self {
            id: c.id,
            text: c.text,
            photo_id: c.photo_id,
            user_id: c.user_id,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
