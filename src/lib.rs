pub mod comment;
pub mod db;
pub mod filesystem;
pub mod middleware;
pub mod orm;
pub mod post;
pub mod session;
pub mod user;
pub mod web;

pub use crate::db::get_db_pool;

/// Reads .env and prepares process-wide statics.
/// This MUST be called before init_db().
pub fn init() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    session::init();
    filesystem::init();
}
