use crate::orm::{categories, comments, locations, posts, users};
use chrono::NaiveDateTime;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult, PaginatorTrait};

pub const POSTS_PER_PAGE: usize = 10;

/// A fully joined struct representing the post model and its relational data.
#[derive(Debug, FromQueryResult)]
pub struct PostForTemplate {
    pub id: i32,
    pub title: String,
    pub text: String,
    pub pub_date: Option<NaiveDateTime>,
    pub image: Option<String>,
    pub user_id: i32,
    pub is_published: bool,
    pub created_at: NaiveDateTime,
    // join users
    pub username: String,
    // join locations
    pub location_name: Option<String>,
    // join categories
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    // aggregate
    pub comment_count: i64,
}

/// Predicate for posts eligible for anonymous display.
///
/// A NULL pub_date or a missing/unpublished category fails the comparison,
/// so scheduled, draft and uncategorized posts all stay hidden.
pub fn visible_at(now: NaiveDateTime) -> Condition {
    Condition::all()
        .add(posts::Column::IsPublished.eq(true))
        .add(posts::Column::PubDate.lte(now))
        .add(categories::Column::IsPublished.eq(true))
}

/// Posts joined with author, location, category and comment count.
/// Ordered by publication date, newest first.
fn select_for_template() -> Select<posts::Entity> {
    posts::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Name, "username")
        .left_join(locations::Entity)
        .column_as(locations::Column::Name, "location_name")
        .left_join(categories::Entity)
        .column_as(categories::Column::Title, "category_title")
        .column_as(categories::Column::Slug, "category_slug")
        .left_join(comments::Entity)
        .column_as(comments::Column::Id.count(), "comment_count")
        .group_by(posts::Column::Id)
        .group_by(users::Column::Name)
        .group_by(locations::Column::Name)
        .group_by(categories::Column::Title)
        .group_by(categories::Column::Slug)
        .order_by_desc(posts::Column::PubDate)
}

pub fn page_count(num_items: usize) -> usize {
    std::cmp::max(1, (num_items + POSTS_PER_PAGE - 1) / POSTS_PER_PAGE)
}

fn page_offset(page: usize) -> u64 {
    ((page.max(1) - 1) * POSTS_PER_PAGE) as u64
}

/// One page of the public listing plus the total page count.
pub async fn get_public_post_page(
    db: &DatabaseConnection,
    now: NaiveDateTime,
    page: usize,
) -> Result<(Vec<PostForTemplate>, usize), DbErr> {
    let items = select_for_template()
        .filter(visible_at(now))
        .limit(POSTS_PER_PAGE as u64)
        .offset(page_offset(page))
        .into_model::<PostForTemplate>()
        .all(db)
        .await?;
    let num_items = posts::Entity::find()
        .left_join(categories::Entity)
        .filter(visible_at(now))
        .paginate(db, POSTS_PER_PAGE)
        .num_items()
        .await?;
    Ok((items, page_count(num_items)))
}

/// Public listing restricted to one category.
pub async fn get_category_post_page(
    db: &DatabaseConnection,
    now: NaiveDateTime,
    category_id: i32,
    page: usize,
) -> Result<(Vec<PostForTemplate>, usize), DbErr> {
    let items = select_for_template()
        .filter(visible_at(now))
        .filter(posts::Column::CategoryId.eq(category_id))
        .limit(POSTS_PER_PAGE as u64)
        .offset(page_offset(page))
        .into_model::<PostForTemplate>()
        .all(db)
        .await?;
    let num_items = posts::Entity::find()
        .left_join(categories::Entity)
        .filter(visible_at(now))
        .filter(posts::Column::CategoryId.eq(category_id))
        .paginate(db, POSTS_PER_PAGE)
        .num_items()
        .await?;
    Ok((items, page_count(num_items)))
}

/// Everything one author wrote, hidden and scheduled posts included.
pub async fn get_author_post_page(
    db: &DatabaseConnection,
    author_id: i32,
    page: usize,
) -> Result<(Vec<PostForTemplate>, usize), DbErr> {
    let items = select_for_template()
        .filter(posts::Column::UserId.eq(author_id))
        .limit(POSTS_PER_PAGE as u64)
        .offset(page_offset(page))
        .into_model::<PostForTemplate>()
        .all(db)
        .await?;
    let num_items = posts::Entity::find()
        .filter(posts::Column::UserId.eq(author_id))
        .paginate(db, POSTS_PER_PAGE)
        .num_items()
        .await?;
    Ok((items, page_count(num_items)))
}

/// Selects a post by id regardless of visibility.
pub async fn get_post_for_template(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<PostForTemplate>, DbErr> {
    select_for_template()
        .filter(posts::Column::Id.eq(id))
        .into_model::<PostForTemplate>()
        .one(db)
        .await
}

/// Selects a post by id under the public visibility rules.
pub async fn get_public_post_for_template(
    db: &DatabaseConnection,
    id: i32,
    now: NaiveDateTime,
) -> Result<Option<PostForTemplate>, DbErr> {
    select_for_template()
        .filter(posts::Column::Id.eq(id))
        .filter(visible_at(now))
        .into_model::<PostForTemplate>()
        .one(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, QueryTrait};

    fn listing_sql() -> String {
        let now = chrono::NaiveDate::from_ymd(2024, 1, 29).and_hms(18, 51, 0);
        select_for_template()
            .filter(visible_at(now))
            .build(DatabaseBackend::Postgres)
            .to_string()
    }

    #[test]
    fn public_filter_checks_post_and_category_flags() {
        let sql = listing_sql();
        assert!(sql.contains(r#""posts"."is_published" = TRUE"#), "{}", sql);
        assert!(sql.contains(r#""categories"."is_published" = TRUE"#), "{}", sql);
    }

    #[test]
    fn public_filter_excludes_scheduled_posts() {
        let sql = listing_sql();
        assert!(sql.contains(r#""posts"."pub_date" <= "#), "{}", sql);
    }

    #[test]
    fn listing_orders_newest_first() {
        let sql = listing_sql();
        assert!(sql.contains(r#"ORDER BY "posts"."pub_date" DESC"#), "{}", sql);
    }

    #[test]
    fn listing_counts_comments() {
        let sql = listing_sql();
        assert!(sql.contains(r#"COUNT("comments"."id")"#), "{}", sql);
    }

    #[test]
    fn page_count_rounds_up_and_never_zero() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(POSTS_PER_PAGE), 1);
        assert_eq!(page_count(POSTS_PER_PAGE + 1), 2);
        assert_eq!(page_count(POSTS_PER_PAGE * 3), 3);
    }

    #[test]
    fn page_offset_clamps_to_first_page() {
        assert_eq!(page_offset(0), 0);
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(2), POSTS_PER_PAGE as u64);
    }
}
