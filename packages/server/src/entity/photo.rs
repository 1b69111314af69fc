use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "photo")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Delivery URL on the media host.
    pub image: String,
    /// Opaque media-host handle used for deletion and transformation.
    pub public_id: String,
    pub description: Option<String>,
    /// Derived mean of this photo's like values, rounded to 2 decimals.
    /// NULL means "no ratings yet", which is distinct from a rating of 0.
    pub rating: Option<f64>,
    pub user_id: i32,

    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: Option<super::user::Entity>,

    #[sea_orm(has_many)]
    pub likes: HasMany<super::like::Entity>,

    #[sea_orm(has_many)]
    pub comments: HasMany<super::comment::Entity>,

    #[sea_orm(has_many)]
    pub transfers: HasMany<super::photo_transfer::Entity>,

    #[sea_orm(has_many, via = "photo_tag")]
    pub tags: HasMany<super::tag::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
