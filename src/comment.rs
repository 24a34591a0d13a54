use crate::orm::{comments, users};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};

/// A comment row joined with its author's name.
#[derive(Debug, FromQueryResult)]
pub struct CommentForTemplate {
    pub id: i32,
    pub text: String,
    pub post_id: i32,
    pub user_id: i32,
    pub created_at: chrono::NaiveDateTime,
    // join users
    pub username: String,
}

/// All comments under a post, oldest first.
pub async fn get_comments_for_post(
    db: &DatabaseConnection,
    post_id: i32,
) -> Result<Vec<CommentForTemplate>, DbErr> {
    comments::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Name, "username")
        .filter(comments::Column::PostId.eq(post_id))
        .order_by_asc(comments::Column::CreatedAt)
        .into_model::<CommentForTemplate>()
        .all(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, QueryTrait};

    #[test]
    fn comments_are_listed_oldest_first() {
        let sql = comments::Entity::find()
            .left_join(users::Entity)
            .column_as(users::Column::Name, "username")
            .filter(comments::Column::PostId.eq(1))
            .order_by_asc(comments::Column::CreatedAt)
            .build(DatabaseBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#"ORDER BY "comments"."created_at" ASC"#), "{}", sql);
    }
}
