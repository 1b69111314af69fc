use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Photo-tag association. The composite key forbids duplicate links; the
/// 5-tags-per-photo cap is enforced at the write boundary, not here.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "photo_tag")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub photo_id: i32,
    #[sea_orm(primary_key)]
    pub tag_id: i32,

    #[sea_orm(belongs_to, from = "photo_id", to = "id")]
    pub photo: Option<super::photo::Entity>,
    #[sea_orm(belongs_to, from = "tag_id", to = "id")]
    pub tag: Option<super::tag::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
