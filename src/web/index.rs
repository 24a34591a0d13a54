use super::PageQuery;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::post::{get_public_post_page, PostForTemplate};
use actix_web::{error, get, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::Utc;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub client: ClientCtx,
    pub posts: Vec<PostForTemplate>,
    pub page: usize,
    pub page_count: usize,
}

#[get("/")]
pub async fn view_index(
    client: ClientCtx,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let page = query.page();
    let (posts, page_count) = get_public_post_page(get_db_pool(), Utc::now().naive_utc(), page)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(IndexTemplate {
        client,
        posts,
        page,
        page_count,
    }
    .to_response())
}
