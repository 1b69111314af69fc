//! Dynamic photo search: conjunctive optional filters with deterministic
//! ordering. Filters that were not provided add no predicate at all, so
//! the generated SQL only carries what the caller asked for.

use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, Query as SeaQuery};
use sea_orm::*;

use crate::entity::{photo, photo_tag, user};
use crate::error::AppError;
use crate::models::shared::escape_like;

/// Optional predicates for [`search`]. Every field narrows the result set
/// independently; `None` means no constraint.
#[derive(Debug, Default, Clone)]
pub struct SearchFilters {
    /// Case-insensitive substring match on the description.
    pub keyword: Option<String>,
    /// Restrict to photos carrying this tag.
    pub tag_id: Option<i32>,
    /// Lower rating bound; photos not yet rated still pass.
    pub min_rating: Option<f64>,
    /// Upper rating bound; photos not yet rated still pass.
    pub max_rating: Option<f64>,
    /// Inclusive creation-time bounds.
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

fn ilike_contains(term: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(term.trim()).to_lowercase())).escape('\\')
}

/// Build the search query. Kept separate from execution so tests can pin
/// the generated SQL the same way for every filter combination.
///
/// The base set is photos with at least one tag association; untagged
/// photos are reachable through the plain listing endpoints instead. The
/// membership test goes through a subquery rather than a join so that a
/// photo with several tags still yields one row.
pub fn build_search(filters: &SearchFilters, limit: u64, offset: u64) -> Select<photo::Entity> {
    let mut tagged = SeaQuery::select()
        .column(photo_tag::Column::PhotoId)
        .from(photo_tag::Entity)
        .to_owned();
    if let Some(tag_id) = filters.tag_id {
        tagged.and_where(photo_tag::Column::TagId.eq(tag_id));
    }

    let mut select = photo::Entity::find().filter(photo::Column::Id.in_subquery(tagged));

    if let Some(ref keyword) = filters.keyword {
        select = select.filter(
            Expr::expr(Func::lower(Expr::col(photo::Column::Description)))
                .like(ilike_contains(keyword)),
        );
    }
    if let Some(min) = filters.min_rating {
        select = select.filter(
            Condition::any()
                .add(photo::Column::Rating.gte(min))
                .add(photo::Column::Rating.is_null()),
        );
    }
    if let Some(max) = filters.max_rating {
        select = select.filter(
            Condition::any()
                .add(photo::Column::Rating.lte(max))
                .add(photo::Column::Rating.is_null()),
        );
    }
    if let Some(after) = filters.created_after {
        select = select.filter(photo::Column::CreatedAt.gte(after));
    }
    if let Some(before) = filters.created_before {
        select = select.filter(photo::Column::CreatedAt.lte(before));
    }

    select
        .order_by_with_nulls(photo::Column::Rating, Order::Desc, sea_query::NullOrdering::Last)
        .order_by_desc(photo::Column::CreatedAt)
        .offset(offset)
        .limit(limit)
}

/// Execute a filtered search. An empty page is a normal outcome here,
/// unlike the ratings read path.
pub async fn search(
    db: &DatabaseConnection,
    limit: u64,
    offset: u64,
    filters: &SearchFilters,
) -> Result<Vec<photo::Model>, AppError> {
    Ok(build_search(filters, limit, offset).all(db).await?)
}

/// Build the by-owner listing: exact owner id (0 means every owner) plus
/// an optional case-insensitive substring match on the owner's username,
/// ordered by owner id ascending.
pub fn build_owner_search(
    user_id: i32,
    name: Option<&str>,
    limit: u64,
    offset: u64,
) -> Select<photo::Entity> {
    let mut select = photo::Entity::find();

    if user_id != 0 {
        select = select.filter(photo::Column::UserId.eq(user_id));
    }
    if let Some(name) = name {
        select = select.filter(
            photo::Column::UserId.in_subquery(
                SeaQuery::select()
                    .column(user::Column::Id)
                    .from(user::Entity)
                    .and_where(
                        Expr::expr(Func::lower(Expr::col(user::Column::Username)))
                            .like(ilike_contains(name)),
                    )
                    .to_owned(),
            ),
        );
    }

    select
        .order_by_asc(photo::Column::UserId)
        .offset(offset)
        .limit(limit)
}

pub async fn search_by_owner(
    db: &DatabaseConnection,
    limit: u64,
    offset: u64,
    user_id: i32,
    name: Option<&str>,
) -> Result<Vec<photo::Model>, AppError> {
    Ok(build_owner_search(user_id, name, limit, offset).all(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql(filters: &SearchFilters, limit: u64, offset: u64) -> String {
        build_search(filters, limit, offset)
            .build(DatabaseBackend::Postgres)
            .to_string()
    }

    #[test]
    fn base_query_restricts_to_tagged_photos_only() {
        let q = sql(&SearchFilters::default(), 10, 0);
        assert!(q.contains(r#""photo"."id" IN (SELECT "photo_id" FROM "photo_tag")"#));
        assert!(!q.contains("LIKE"));
        assert!(!q.contains("rating\" >="));
        assert!(!q.contains("created_at\" >="));
    }

    #[test]
    fn ordering_is_rating_desc_nulls_last_then_newest_first() {
        let q = sql(&SearchFilters::default(), 10, 0);
        assert!(q.contains(
            r#"ORDER BY "photo"."rating" DESC NULLS LAST, "photo"."created_at" DESC"#
        ));
        assert!(q.contains("LIMIT 10"));
        assert!(q.contains("OFFSET 0"));
    }

    #[test]
    fn keyword_matches_substring_case_insensitively() {
        let filters = SearchFilters {
            keyword: Some("SunSet".into()),
            ..Default::default()
        };
        let q = sql(&filters, 10, 0);
        assert!(q.contains(r#"LOWER("description") LIKE '%sunset%'"#));
    }

    #[test]
    fn keyword_wildcards_are_escaped() {
        let filters = SearchFilters {
            keyword: Some("50%".into()),
            ..Default::default()
        };
        let q = sql(&filters, 10, 0);
        assert!(q.contains(r"50\"));
        assert!(q.contains("ESCAPE"));
    }

    #[test]
    fn rating_bounds_each_admit_unrated_photos() {
        let filters = SearchFilters {
            min_rating: Some(2.5),
            max_rating: Some(4.5),
            ..Default::default()
        };
        let q = sql(&filters, 10, 0);
        assert!(q.contains(r#""photo"."rating" >= 2.5 OR "photo"."rating" IS NULL"#));
        assert!(q.contains(r#""photo"."rating" <= 4.5 OR "photo"."rating" IS NULL"#));
    }

    #[test]
    fn tag_filter_narrows_the_membership_subquery() {
        let filters = SearchFilters {
            tag_id: Some(3),
            ..Default::default()
        };
        let q = sql(&filters, 10, 0);
        assert!(q.contains(
            r#"IN (SELECT "photo_id" FROM "photo_tag" WHERE "photo_tag"."tag_id" = 3)"#
        ));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let after: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let before: DateTime<Utc> = "2024-12-31T00:00:00Z".parse().unwrap();
        let filters = SearchFilters {
            created_after: Some(after),
            created_before: Some(before),
            ..Default::default()
        };
        let q = sql(&filters, 10, 0);
        assert!(q.contains(r#""photo"."created_at" >="#));
        assert!(q.contains(r#""photo"."created_at" <="#));
    }

    #[test]
    fn owner_zero_means_all_owners() {
        let q = build_owner_search(0, None, 10, 0)
            .build(DatabaseBackend::Postgres)
            .to_string();
        assert!(!q.contains("WHERE"));
        assert!(q.contains(r#"ORDER BY "photo"."user_id" ASC"#));
    }

    #[test]
    fn owner_search_filters_by_id_and_username_substring() {
        let q = build_owner_search(7, Some("Ali"), 10, 0)
            .build(DatabaseBackend::Postgres)
            .to_string();
        assert!(q.contains(r#""photo"."user_id" = 7"#));
        assert!(q.contains(r#"LOWER("username") LIKE '%ali%'"#));
    }
}
