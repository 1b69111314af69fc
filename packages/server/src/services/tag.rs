//! Photo-tag association management under the 5-tags-per-photo cap.

use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;

use crate::entity::{photo, photo_tag, tag};
use crate::error::AppError;

pub const MAX_TAGS_PER_PHOTO: usize = 5;

/// Attach a set of tag names to a photo.
///
/// Names are deduplicated after trimming; blank entries are dropped. Tag
/// rows are reused when they exist and created otherwise, and names
/// already associated with the photo are skipped, so re-attaching is a
/// no-op per name. The cap counts current associations plus net-new ones
/// and rejects the whole call before any link is written.
///
/// Takes any connection so photo upload can run it inside its own
/// transaction. Returns the photo's full tag set after the operation.
pub async fn attach_tags<C: ConnectionTrait>(
    conn: &C,
    photo_id: i32,
    names: &[String],
) -> Result<Vec<tag::Model>, AppError> {
    photo::Entity::find_by_id(photo_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Photo not found".into()))?;

    let mut wanted: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !wanted.iter().any(|w| w == name) {
            wanted.push(name.to_owned());
        }
    }

    let mut current = tag::Entity::find()
        .filter(
            tag::Column::Id.in_subquery(
                SeaQuery::select()
                    .column(photo_tag::Column::TagId)
                    .from(photo_tag::Entity)
                    .and_where(photo_tag::Column::PhotoId.eq(photo_id))
                    .to_owned(),
            ),
        )
        .all(conn)
        .await?;

    let net_new: Vec<String> = wanted
        .into_iter()
        .filter(|name| !current.iter().any(|t| &t.name == name))
        .collect();

    if current.len() + net_new.len() > MAX_TAGS_PER_PHOTO {
        return Err(AppError::TagLimitExceeded);
    }

    for name in net_new {
        let tag_row = match tag::Entity::find()
            .filter(tag::Column::Name.eq(&name))
            .one(conn)
            .await?
        {
            Some(existing) => existing,
            None => {
                tag::ActiveModel {
                    name: Set(name),
                    ..Default::default()
                }
                .insert(conn)
                .await?
            }
        };

        photo_tag::ActiveModel {
            photo_id: Set(photo_id),
            tag_id: Set(tag_row.id),
        }
        .insert(conn)
        .await?;

        current.push(tag_row);
    }

    Ok(current)
}

/// Tags currently associated with a photo.
pub async fn tags_of_photo<C: ConnectionTrait>(
    conn: &C,
    photo_id: i32,
) -> Result<Vec<tag::Model>, AppError> {
    Ok(tag::Entity::find()
        .filter(
            tag::Column::Id.in_subquery(
                SeaQuery::select()
                    .column(photo_tag::Column::TagId)
                    .from(photo_tag::Entity)
                    .and_where(photo_tag::Column::PhotoId.eq(photo_id))
                    .to_owned(),
            ),
        )
        .all(conn)
        .await?)
}

/// Delete a tag by name, removing it from every photo that carries it.
pub async fn detach_tag(db: &DatabaseConnection, name: &str) -> Result<(), AppError> {
    let txn = db.begin().await?;

    let tag_row = tag::Entity::find()
        .filter(tag::Column::Name.eq(name.trim()))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".into()))?;

    photo_tag::Entity::delete_many()
        .filter(photo_tag::Column::TagId.eq(tag_row.id))
        .exec(&txn)
        .await?;
    tag::Entity::delete_by_id(tag_row.id).exec(&txn).await?;

    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    use super::*;

    fn photo_row(id: i32) -> BTreeMap<&'static str, Value> {
        let now = Utc::now();
        BTreeMap::from([
            ("id", Value::from(id)),
            ("image", Value::from("https://img.example/cat.jpg")),
            ("public_id", Value::from("photoshare/cat")),
            ("description", Value::from(Option::<String>::None)),
            ("rating", Value::from(Option::<f64>::None)),
            ("user_id", Value::from(7)),
            ("created_at", Value::from(now)),
            ("updated_at", Value::from(now)),
        ])
    }

    fn tag_row(id: i32, name: &str) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("id", Value::from(id)), ("name", Value::from(name))])
    }

    fn link_row(photo_id: i32, tag_id: i32) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("photo_id", Value::from(photo_id)),
            ("tag_id", Value::from(tag_id)),
        ])
    }

    #[tokio::test]
    async fn attaching_to_a_missing_photo_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();

        let err = attach_tags(&db, 404, &["cats".into()]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn exceeding_the_cap_rejects_the_whole_call() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![photo_row(1)]])
            .append_query_results([vec![
                tag_row(1, "a"),
                tag_row(2, "b"),
                tag_row(3, "c"),
                tag_row(4, "d"),
            ]])
            .into_connection();

        let err = attach_tags(&db, 1, &["e".into(), "f".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TagLimitExceeded));
    }

    #[tokio::test]
    async fn already_attached_names_do_not_count_against_the_cap() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![photo_row(1)]])
            .append_query_results([vec![
                tag_row(1, "a"),
                tag_row(2, "b"),
                tag_row(3, "c"),
                tag_row(4, "d"),
            ]])
            // "e" is the only net-new name: lookup misses, tag + link created
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .append_query_results([vec![tag_row(5, "e")]])
            .append_query_results([vec![link_row(1, 5)]])
            .into_connection();

        let tags = attach_tags(&db, 1, &["a".into(), "e".into(), "a".into()])
            .await
            .unwrap();
        assert_eq!(tags.len(), 5);
        assert!(tags.iter().any(|t| t.name == "e"));
    }

    #[tokio::test]
    async fn blank_and_duplicate_names_are_dropped_before_any_write() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![photo_row(1)]])
            .append_query_results([vec![tag_row(1, "cats")]])
            .into_connection();

        let tags = attach_tags(&db, 1, &["cats".into(), "  ".into(), "cats ".into()])
            .await
            .unwrap();
        assert_eq!(tags.len(), 1);
    }

    #[tokio::test]
    async fn detaching_a_missing_tag_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();

        let err = detach_tag(&db, "ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn detaching_removes_every_association_then_the_tag() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tag_row(3, "cats")]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        detach_tag(&db, "cats").await.unwrap();
    }
}
