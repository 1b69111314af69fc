use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A single user's 1-5 rating of a photo. At most one row per
/// (photo, user) pair; see `seed::ensure_indexes` for the unique index
/// backing the application-level pre-check.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "like")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub value: i32,
    pub photo_id: i32,
    pub user_id: i32,

    #[sea_orm(belongs_to, from = "photo_id", to = "id")]
    pub photo: Option<super::photo::Entity>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: Option<super::user::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
