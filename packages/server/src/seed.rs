use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use tracing::info;

use crate::entity::{like, photo};

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite or partial indexes, so we
/// create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // One like per (photo, user). The rating engine pre-checks this for a
    // friendly error; the index closes the concurrent check-then-insert
    // window the pre-check alone cannot.
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_like_photo_user")
        .table(like::Entity)
        .col(like::Column::PhotoId)
        .col(like::Column::UserId)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured unique index idx_like_photo_user exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index idx_like_photo_user: {}", e);
        }
    }

    // Composite index for the search ordering:
    // ORDER BY rating DESC NULLS LAST, created_at DESC
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_photo_rating_created")
        .table(photo::Entity)
        .col(photo::Column::Rating)
        .col(photo::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index idx_photo_rating_created exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index idx_photo_rating_created: {}", e);
        }
    }

    Ok(())
}
