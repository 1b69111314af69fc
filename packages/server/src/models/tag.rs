use serde::Serialize;

use crate::entity::tag;

pub use super::shared::validate_tag_name;

#[derive(Serialize, utoipa::ToSchema)]
pub struct TagResponse {
    pub id: i32,
    #[schema(example = "cats")]
    pub name: String,
}

impl From<tag::Model> for TagResponse {
    fn from(t: tag::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
        }
    }
}
