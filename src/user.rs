use crate::orm::users;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};

/// A mini struct for holding only what information we need about a client.
#[derive(Clone, Debug, FromQueryResult)]
pub struct ClientUser {
    pub id: i32,
    pub name: String,
}

/// User fields rendered on the profile page.
#[derive(Clone, Debug, FromQueryResult)]
pub struct Profile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: chrono::NaiveDateTime,
}

pub async fn get_client_user_by_id(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<ClientUser>, DbErr> {
    users::Entity::find_by_id(id)
        .select_only()
        .column(users::Column::Id)
        .column(users::Column::Name)
        .into_model::<ClientUser>()
        .one(db)
        .await
}

pub async fn get_profile_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<Profile>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Name.eq(name))
        .into_model::<Profile>()
        .one(db)
        .await
}
