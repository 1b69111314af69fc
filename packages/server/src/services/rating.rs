//! Keeps `photo.rating` consistent with the live set of likes.
//!
//! The stored rating is a materialized aggregate: every like insert or
//! delete recomputes it from a fresh read of the like set inside the same
//! transaction, so concurrent like/unlike pairs on one photo cannot leave
//! a stale value behind.

use chrono::Utc;
use sea_orm::*;

use crate::entity::{like, photo, user};
use crate::error::AppError;

/// Mean of the like values rounded to 2 decimals, or `None` for an empty
/// set. Ties round half-to-even: a mean of 3.625 stores as 3.62.
pub fn aggregate(values: &[i32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().map(|v| f64::from(*v)).sum::<f64>() / values.len() as f64;
    Some((mean * 100.0).round_ties_even() / 100.0)
}

pub async fn find_photo<C: ConnectionTrait>(conn: &C, photo_id: i32) -> Result<photo::Model, AppError> {
    photo::Entity::find_by_id(photo_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Photo not found".into()))
}

/// Re-derive and persist a photo's rating from its current likes. Always
/// stamps `updated_at`, even when the value is unchanged.
pub async fn recompute_rating<C: ConnectionTrait>(
    conn: &C,
    photo_id: i32,
) -> Result<photo::Model, AppError> {
    let target = find_photo(conn, photo_id).await?;

    let values: Vec<i32> = like::Entity::find()
        .filter(like::Column::PhotoId.eq(photo_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|l| l.value)
        .collect();

    let mut active: photo::ActiveModel = target.into();
    active.rating = Set(aggregate(&values));
    active.updated_at = Set(Utc::now());

    Ok(active.update(conn).await?)
}

/// Record a 1-5 rating of a photo by a user and return the photo with its
/// updated aggregate.
///
/// Self-rating is rejected here rather than trusted to the caller. The
/// duplicate pre-check is backed by the unique index on
/// (photo_id, user_id) from `seed::ensure_indexes`, so a concurrent
/// double-submit fails on insert and still reports `AlreadyRated`.
pub async fn submit_rating(
    db: &DatabaseConnection,
    photo_id: i32,
    value: i32,
    rater_id: i32,
) -> Result<photo::Model, AppError> {
    if !(1..=5).contains(&value) {
        return Err(AppError::Validation(
            "Rating value must be between 1 and 5".into(),
        ));
    }

    let txn = db.begin().await?;

    let target = find_photo(&txn, photo_id).await?;
    if target.user_id == rater_id {
        return Err(AppError::Validation(
            "You cannot rate your own photo".into(),
        ));
    }

    let existing = like::Entity::find()
        .filter(like::Column::PhotoId.eq(photo_id))
        .filter(like::Column::UserId.eq(rater_id))
        .count(&txn)
        .await?;
    if existing > 0 {
        return Err(AppError::AlreadyRated);
    }

    like::ActiveModel {
        value: Set(value),
        photo_id: Set(photo_id),
        user_id: Set(rater_id),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| match e.sql_err() {
        // Loser of a concurrent double-submit: the pre-check passed but the
        // (photo_id, user_id) index caught the insert.
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::AlreadyRated,
        _ => AppError::from(e),
    })?;

    let updated = recompute_rating(&txn, photo_id).await?;
    txn.commit().await?;

    Ok(updated)
}

/// Delete a like by id and return its photo with the aggregate recomputed.
/// Retracting the only like resets the rating to NULL, not 0.
pub async fn retract_rating(db: &DatabaseConnection, like_id: i32) -> Result<photo::Model, AppError> {
    let txn = db.begin().await?;

    let target = like::Entity::find_by_id(like_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Like not found".into()))?;

    like::Entity::delete_by_id(like_id).exec(&txn).await?;

    let updated = recompute_rating(&txn, target.photo_id).await?;
    txn.commit().await?;

    Ok(updated)
}

/// Every like on a photo, each paired with its rater. A photo with zero
/// likes is reported as `NotFound` on this read path, not as an empty
/// list; see DESIGN.md.
pub async fn list_ratings(
    db: &DatabaseConnection,
    photo_id: i32,
) -> Result<Vec<(like::Model, Option<user::Model>)>, AppError> {
    let rows = like::Entity::find()
        .filter(like::Column::PhotoId.eq(photo_id))
        .find_also_related(user::Entity)
        .all(db)
        .await?;

    if rows.is_empty() {
        return Err(AppError::NotFound("No ratings found for this photo".into()));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    use super::*;

    #[test]
    fn aggregate_of_no_likes_is_none() {
        assert_eq!(aggregate(&[]), None);
    }

    #[test]
    fn aggregate_is_the_rounded_mean() {
        assert_eq!(aggregate(&[5, 4, 3]), Some(4.0));
        assert_eq!(aggregate(&[5, 4]), Some(4.5));
        assert_eq!(aggregate(&[3]), Some(3.0));
        assert_eq!(aggregate(&[1, 2]), Some(1.5));
    }

    #[test]
    fn aggregate_rounds_half_to_even_at_two_decimals() {
        // mean 3.625 -> 3.62, mean 4.875 -> 4.88
        assert_eq!(aggregate(&[4, 4, 4, 4, 4, 4, 4, 1]), Some(3.62));
        assert_eq!(aggregate(&[5, 5, 5, 5, 5, 5, 5, 4]), Some(4.88));
    }

    fn photo_row(
        id: i32,
        user_id: i32,
        rating: Option<f64>,
    ) -> BTreeMap<&'static str, Value> {
        let now = Utc::now();
        BTreeMap::from([
            ("id", Value::from(id)),
            ("image", Value::from("https://img.example/cat.jpg")),
            ("public_id", Value::from("photoshare/cat")),
            ("description", Value::from(Option::<String>::None)),
            ("rating", Value::from(rating)),
            ("user_id", Value::from(user_id)),
            ("created_at", Value::from(now)),
            ("updated_at", Value::from(now)),
        ])
    }

    fn like_row(id: i32, value: i32, photo_id: i32, user_id: i32) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("id", Value::from(id)),
            ("value", Value::from(value)),
            ("photo_id", Value::from(photo_id)),
            ("user_id", Value::from(user_id)),
        ])
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::from(n))])
    }

    #[tokio::test]
    async fn out_of_range_value_is_rejected_before_touching_the_db() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = submit_rating(&db, 1, 0, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = submit_rating(&db, 1, 6, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn rating_a_missing_photo_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();

        let err = submit_rating(&db, 404, 5, 2).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn rating_your_own_photo_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![photo_row(1, 7, None)]])
            .into_connection();

        let err = submit_rating(&db, 1, 5, 7).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn second_rating_by_the_same_user_is_already_rated() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![photo_row(1, 7, Some(5.0))]])
            .append_query_results([vec![count_row(1)]])
            .into_connection();

        let err = submit_rating(&db, 1, 3, 2).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyRated));
    }

    #[tokio::test]
    async fn insert_failure_without_a_unique_violation_stays_internal() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![photo_row(1, 7, None)]])
            .append_query_results([vec![count_row(0)]])
            .append_query_errors([DbErr::Custom("connection reset".into())])
            .into_connection();

        let err = submit_rating(&db, 1, 4, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn first_rating_stores_its_own_value_as_the_mean() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // submit: find photo, duplicate pre-check
            .append_query_results([vec![photo_row(1, 7, None)]])
            .append_query_results([vec![count_row(0)]])
            // insert like (RETURNING)
            .append_query_results([vec![like_row(10, 4, 1, 2)]])
            // recompute: fresh photo read, like set, update (RETURNING)
            .append_query_results([vec![photo_row(1, 7, None)]])
            .append_query_results([vec![like_row(10, 4, 1, 2)]])
            .append_query_results([vec![photo_row(1, 7, Some(4.0))]])
            .into_connection();

        let updated = submit_rating(&db, 1, 4, 2).await.unwrap();
        assert_eq!(updated.rating, Some(4.0));
    }

    #[tokio::test]
    async fn retracting_a_missing_like_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();

        let err = retract_rating(&db, 99).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn retracting_the_only_like_resets_the_rating_to_null() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // find like
            .append_query_results([vec![like_row(10, 4, 1, 2)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            // recompute: fresh photo read, empty like set, update (RETURNING)
            .append_query_results([vec![photo_row(1, 7, Some(4.0))]])
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .append_query_results([vec![photo_row(1, 7, None)]])
            .into_connection();

        let updated = retract_rating(&db, 10).await.unwrap();
        assert_eq!(updated.rating, None);
    }

    #[tokio::test]
    async fn listing_ratings_of_an_unrated_photo_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();

        let err = list_ratings(&db, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
