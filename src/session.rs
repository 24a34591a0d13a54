use crate::orm::sessions;
use crate::user::ClientUser;
use actix_web::{error, get, Error, HttpResponse, Responder};
use chrono::{NaiveDateTime, Utc};
use once_cell::sync::OnceCell;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Cached copy of a sessions row.
pub struct Session {
    pub user_id: i32,
    pub expires_at: NaiveDateTime,
}

pub type SessionMap = RwLock<HashMap<Uuid, Session>>;

static SESSION_MAP: OnceCell<SessionMap> = OnceCell::new();
static SESSION_TIME: OnceCell<chrono::Duration> = OnceCell::new();

#[inline(always)]
pub fn get_sess() -> &'static SessionMap {
    SESSION_MAP.get().expect("session::init() has not run")
}

#[inline(always)]
pub fn get_session_time() -> &'static chrono::Duration {
    SESSION_TIME.get().expect("session::init() has not run")
}

pub fn init() {
    let time = std::env::var("SESSION_TIME").expect("SESSION_TIME MISSING from .env");
    let time = time
        .parse::<i64>()
        .expect("SESSION_TIME cannot be parsed as an integer");
    if time < 0 {
        panic!("SESSION_TIME is a negative number!");
    }
    SESSION_TIME
        .set(chrono::Duration::minutes(time))
        .expect("failed to set SESSION_TIME");
    SESSION_MAP
        .set(RwLock::new(HashMap::new()))
        .unwrap_or_else(|_| panic!("failed to set SESSION_MAP"));
}

/// Fills the session cache from the sessions table.
pub async fn reload_session_cache(db: &DatabaseConnection) -> Result<(), DbErr> {
    let rows = sessions::Entity::find().all(db).await?;
    let map = &mut *get_sess().write().unwrap();
    map.clear();
    for row in rows {
        match Uuid::parse_str(&row.id) {
            Ok(uuid) => {
                map.insert(
                    uuid,
                    Session {
                        user_id: row.user_id,
                        expires_at: row.expires_at,
                    },
                );
            }
            Err(e) => {
                log::warn!("reload_session_cache: bad token in sessions table: {}", e);
            }
        }
    }
    Ok(())
}

pub async fn new_session(db: &DatabaseConnection, user_id: i32) -> Result<Uuid, DbErr> {
    let expires_at = Utc::now().naive_utc() + *get_session_time();
    let mut uuid;
    loop {
        uuid = Uuid::new_v4();
        let map = &mut *get_sess().write().unwrap();
        if !map.contains_key(&uuid) {
            map.insert(
                uuid,
                Session {
                    user_id,
                    expires_at,
                },
            );
            break;
        }
    }

    sessions::Entity::insert(sessions::ActiveModel {
        id: Set(uuid.to_string()),
        user_id: Set(user_id),
        expires_at: Set(expires_at),
    })
    .exec(db)
    .await?;

    Ok(uuid)
}

pub async fn remove_session(db: &DatabaseConnection, uuid: Uuid) -> Result<(), DbErr> {
    sessions::Entity::delete_many()
        .filter(sessions::Column::Id.eq(uuid.to_string()))
        .exec(db)
        .await?;
    get_sess().write().unwrap().remove(&uuid);
    Ok(())
}

/// Deletes expired rows and drops them from the cache.
pub async fn remove_expired_sessions(db: &DatabaseConnection) -> Result<u64, DbErr> {
    let now = Utc::now().naive_utc();
    let res = sessions::Entity::delete_many()
        .filter(sessions::Column::ExpiresAt.lt(now))
        .exec(db)
        .await?;
    get_sess()
        .write()
        .unwrap()
        .retain(|_, ses| ses.expires_at >= now);
    Ok(res.rows_affected)
}

/// Maintenance sweep for the sessions table.
#[get("/tasks/expire-sessions")]
pub async fn view_task_expire_sessions() -> Result<impl Responder, Error> {
    let count = remove_expired_sessions(crate::db::get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().body(format!("Removed {} expired sessions.", count)))
}

/// Resolves the cookie's token to a live user, if any.
pub async fn authenticate_client_by_session(cookies: &actix_session::Session) -> Option<ClientUser> {
    let token = match cookies.get::<String>("token") {
        Ok(Some(token)) => token,
        Ok(None) => return None,
        Err(e) => {
            log::error!("authenticate_client_by_session: cookies.get() {}", e);
            return None;
        }
    };

    let uuid = match Uuid::parse_str(&token) {
        Ok(uuid) => uuid,
        Err(e) => {
            log::error!("authenticate_client_by_session: parse_str() {}", e);
            return None;
        }
    };

    let user_id = {
        let map = get_sess().read().unwrap();
        let ses = map.get(&uuid)?;
        if ses.expires_at < Utc::now().naive_utc() {
            return None;
        }
        ses.user_id
    };

    match crate::user::get_client_user_by_id(crate::db::get_db_pool(), user_id).await {
        Ok(user) => user,
        Err(e) => {
            log::error!("authenticate_client_by_session: {}", e);
            None
        }
    }
}
