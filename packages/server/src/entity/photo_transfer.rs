use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A generated shareable link for a transformed photo variant. `link_qr`
/// is populated lazily, at most once.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "photo_transfer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Media-host handle of the source image.
    pub image: String,
    pub link_url: String,
    pub link_qr: Option<String>,
    pub photo_id: i32,

    #[sea_orm(belongs_to, from = "photo_id", to = "id")]
    pub photo: Option<super::photo::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
