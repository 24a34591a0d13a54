use super::account::{validate_email, validate_username};
use super::post::{redirect_to, redirect_to_login};
use super::PageQuery;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::post::{get_author_post_page, PostForTemplate};
use crate::user::{get_profile_by_name, Profile};
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, query::*};
use serde::Deserialize;

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub client: ClientCtx,
    pub profile: Profile,
    pub posts: Vec<PostForTemplate>,
    pub page: usize,
    pub page_count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileFormData {
    pub username: String,
    pub email: String,
}

#[derive(Template)]
#[template(path = "profile_update.html")]
pub struct ProfileUpdateTemplate {
    pub client: ClientCtx,
    pub form: ProfileFormData,
    pub errors: Vec<String>,
}

/// An author's page lists everything they wrote, hidden and scheduled
/// posts included. Only users exist to 404 on; there is no published
/// flag for them.
#[get("/profile/{username}/")]
pub async fn view_profile(
    client: ClientCtx,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let username = path.into_inner();
    let db = get_db_pool();

    let profile = get_profile_by_name(db, &username)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("User not found."))?;

    let page = query.page();
    let (posts, page_count) = get_author_post_page(db, profile.id, page)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(ProfileTemplate {
        client,
        profile,
        posts,
        page,
        page_count,
    }
    .to_response())
}

#[get("/profile/edit/")]
pub async fn edit_profile(client: ClientCtx) -> Result<HttpResponse, Error> {
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login()),
    };

    let user = users::Entity::find_by_id(user_id)
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorInternalServerError("Lost client identity mid-request."))?;

    Ok(ProfileUpdateTemplate {
        client,
        form: ProfileFormData {
            username: user.name,
            email: user.email,
        },
        errors: Vec::new(),
    }
    .to_response())
}

#[post("/profile/edit/")]
pub async fn update_profile(
    client: ClientCtx,
    form: web::Form<ProfileFormData>,
) -> Result<HttpResponse, Error> {
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login()),
    };
    let db = get_db_pool();
    let form = form.into_inner();

    let user = users::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorInternalServerError("Lost client identity mid-request."))?;

    let mut errors = Vec::new();
    let name = validate_username(&form.username).unwrap_or_else(|e| {
        errors.push(e);
        String::new()
    });
    let email = validate_email(&form.email).unwrap_or_else(|e| {
        errors.push(e);
        String::new()
    });

    if errors.is_empty() && name != user.name {
        let taken = users::Entity::find()
            .filter(users::Column::Name.eq(name.as_str()))
            .filter(users::Column::Id.ne(user.id))
            .one(db)
            .await
            .map_err(error::ErrorInternalServerError)?
            .is_some();
        if taken {
            errors.push("That username is taken.".to_owned());
        }
    }

    if !errors.is_empty() {
        return Ok(ProfileUpdateTemplate {
            client,
            form,
            errors,
        }
        .to_response());
    }

    let mut active: users::ActiveModel = user.into();
    active.name = Set(name.to_owned());
    active.email = Set(email);
    active
        .update(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to(format!("/profile/{}/", name)))
}
