use super::PageQuery;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::categories;
use crate::post::{get_category_post_page, PostForTemplate};
use actix_web::{error, get, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::Utc;
use sea_orm::{entity::*, query::*};

#[derive(Template)]
#[template(path = "category.html")]
pub struct CategoryTemplate {
    pub client: ClientCtx,
    pub category: categories::Model,
    pub posts: Vec<PostForTemplate>,
    pub page: usize,
    pub page_count: usize,
}

/// Hidden categories 404 outright, hiding their posts with them.
#[get("/category/{slug}/")]
pub async fn view_category(
    client: ClientCtx,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let slug = path.into_inner();
    let db = get_db_pool();

    let category = categories::Entity::find()
        .filter(categories::Column::Slug.eq(slug))
        .filter(categories::Column::IsPublished.eq(true))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Category not found."))?;

    let page = query.page();
    let (posts, page_count) =
        get_category_post_page(db, Utc::now().naive_utc(), category.id, page)
            .await
            .map_err(error::ErrorInternalServerError)?;

    Ok(CategoryTemplate {
        client,
        category,
        posts,
        page,
        page_count,
    }
    .to_response())
}
