use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::http::StatusCode;
use actix_web::middleware::{ErrorHandlers, Logger};
use actix_web::{cookie::Key, App, HttpServer};
use rublog::middleware::ClientCtx;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    rublog::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    rublog::db::init_db(database_url).await;

    // SECRET_KEY must hold at least 64 bytes of entropy.
    let secret_key = match std::env::var("SECRET_KEY") {
        Ok(key) => Key::derive_from(key.as_bytes()),
        Err(_) => {
            log::warn!("SECRET_KEY not set; session cookies will not survive a restart.");
            Key::generate()
        }
    };
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_owned());

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .wrap(ClientCtx::new())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                secret_key.clone(),
            ))
            .wrap(Logger::new("%a %{User-Agent}i"))
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::FORBIDDEN, rublog::web::error::render_403)
                    .handler(StatusCode::NOT_FOUND, rublog::web::error::render_404)
                    .handler(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        rublog::web::error::render_500,
                    ),
            )
            .configure(rublog::web::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
