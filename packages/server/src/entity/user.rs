use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MODERATOR: &str = "moderator";
pub const ROLE_USER: &str = "user";

/// The role assigned to newly registered users (the very first account is
/// promoted to admin at signup).
pub const DEFAULT_ROLE: &str = ROLE_USER;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub refresh_token: Option<String>,
    pub confirmed: bool,
    pub role: String,

    #[sea_orm(has_many)]
    pub photos: HasMany<super::photo::Entity>,

    #[sea_orm(has_many)]
    pub comments: HasMany<super::comment::Entity>,

    #[sea_orm(has_many)]
    pub likes: HasMany<super::like::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
