use crate::comment::{get_comments_for_post, CommentForTemplate};
use crate::db::get_db_pool;
use crate::filesystem;
use crate::middleware::ClientCtx;
use crate::orm::{categories, locations, posts};
use crate::post::{get_post_for_template, get_public_post_for_template, PostForTemplate};
use actix_multipart::Multipart;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::{NaiveDateTime, Utc};
use futures::TryStreamExt;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, TransactionTrait};
use serde::Deserialize;

pub const TITLE_MAX_LEN: usize = 256;

pub(super) fn post_url(id: i32) -> String {
    format!("/posts/{}/", id)
}

pub(super) fn redirect_to(location: String) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", location))
        .finish()
}

pub(super) fn redirect_to_login() -> HttpResponse {
    redirect_to("/login".to_owned())
}

#[derive(Debug, Default, Deserialize)]
pub struct PostFormData {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub pub_date: String,
    #[serde(default)]
    pub location_id: String,
    #[serde(default)]
    pub category_id: String,
}

impl PostFormData {
    /// Prefills the form from a stored post.
    fn from_model(post: &posts::Model) -> Self {
        Self {
            title: post.title.to_owned(),
            text: post.text.to_owned(),
            pub_date: post
                .pub_date
                .map(|dt| dt.format("%Y-%m-%dT%H:%M").to_string())
                .unwrap_or_default(),
            location_id: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            category_id: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

pub struct ValidPostForm {
    pub title: String,
    pub text: String,
    pub pub_date: NaiveDateTime,
    pub location_id: Option<i32>,
    pub category_id: Option<i32>,
}

fn parse_select(value: &str) -> Result<Option<i32>, ()> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<i32>().map(Some).map_err(|_| ())
}

fn parse_pub_date(value: &str) -> Option<NaiveDateTime> {
    // datetime-local submits with or without seconds depending on the browser.
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
}

/// Run form data through validator.
pub fn validate_post_form(form: &PostFormData) -> Result<ValidPostForm, Vec<String>> {
    let mut errors = Vec::new();

    let title = form.title.trim();
    if title.is_empty() {
        errors.push("Title must not be empty.".to_owned());
    } else if title.len() > TITLE_MAX_LEN {
        errors.push(format!("Title must be {} characters or fewer.", TITLE_MAX_LEN));
    }

    let text = form.text.trim();
    if text.is_empty() {
        errors.push("Text must not be empty.".to_owned());
    }

    let pub_date = parse_pub_date(form.pub_date.trim());
    if pub_date.is_none() {
        errors.push("Publication date and time must be set.".to_owned());
    }

    let location_id = parse_select(&form.location_id).unwrap_or_else(|_| {
        errors.push("Bad location choice.".to_owned());
        None
    });
    let category_id = parse_select(&form.category_id).unwrap_or_else(|_| {
        errors.push("Bad category choice.".to_owned());
        None
    });

    match pub_date {
        Some(pub_date) if errors.is_empty() => Ok(ValidPostForm {
            title: title.to_owned(),
            text: text.to_owned(),
            pub_date,
            location_id,
            category_id,
        }),
        _ => Err(errors),
    }
}

/// Published categories and locations for the form's select boxes.
async fn form_choices(
    db: &DatabaseConnection,
) -> Result<(Vec<categories::Model>, Vec<locations::Model>), DbErr> {
    let category_list = categories::Entity::find()
        .filter(categories::Column::IsPublished.eq(true))
        .order_by_asc(categories::Column::Title)
        .all(db)
        .await?;
    let location_list = locations::Entity::find()
        .filter(locations::Column::IsPublished.eq(true))
        .order_by_asc(locations::Column::Name)
        .all(db)
        .await?;
    Ok((category_list, location_list))
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub client: ClientCtx,
    pub post: PostForTemplate,
    pub comments: Vec<CommentForTemplate>,
}

#[derive(Template)]
#[template(path = "post_create.html")]
pub struct PostCreateTemplate {
    pub client: ClientCtx,
    pub form: PostFormData,
    pub category_list: Vec<categories::Model>,
    pub location_list: Vec<locations::Model>,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "post_update.html")]
pub struct PostUpdateTemplate {
    pub client: ClientCtx,
    pub post_id: i32,
    pub form: PostFormData,
    pub category_list: Vec<categories::Model>,
    pub location_list: Vec<locations::Model>,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "post_delete.html")]
pub struct PostDeleteTemplate {
    pub client: ClientCtx,
    pub post: posts::Model,
}

#[derive(Template)]
#[template(path = "post_image.html")]
pub struct PostImageTemplate {
    pub client: ClientCtx,
    pub post: posts::Model,
    pub errors: Vec<String>,
}

/// Authors see their own posts unconditionally, scheduled and hidden ones
/// included. Everyone else goes through the public visibility re-select, and
/// a miss is a plain 404 so hidden posts are not revealed to exist.
#[get("/posts/{post_id}/")]
pub async fn view_post(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let db = get_db_pool();

    let post = get_post_for_template(db, id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    let post = if client.is_author(&post.user_id) {
        post
    } else {
        get_public_post_for_template(db, id, Utc::now().naive_utc())
            .await
            .map_err(error::ErrorInternalServerError)?
            .ok_or_else(|| error::ErrorNotFound("Post not found."))?
    };

    let comments = get_comments_for_post(db, id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(PostDetailTemplate {
        client,
        post,
        comments,
    }
    .to_response())
}

#[get("/posts/new/")]
pub async fn create_post_form(client: ClientCtx) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        return Ok(redirect_to_login());
    }

    let (category_list, location_list) = form_choices(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(PostCreateTemplate {
        client,
        form: PostFormData::default(),
        category_list,
        location_list,
        errors: Vec::new(),
    }
    .to_response())
}

#[post("/posts/new/")]
pub async fn create_post(
    client: ClientCtx,
    form: web::Form<PostFormData>,
) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        return Ok(redirect_to_login());
    }
    let db = get_db_pool();
    let form = form.into_inner();

    let valid = match validate_post_form(&form) {
        Ok(valid) => valid,
        Err(errors) => {
            let (category_list, location_list) = form_choices(db)
                .await
                .map_err(error::ErrorInternalServerError)?;
            return Ok(PostCreateTemplate {
                client,
                form,
                category_list,
                location_list,
                errors,
            }
            .to_response());
        }
    };

    posts::ActiveModel {
        title: Set(valid.title),
        text: Set(valid.text),
        pub_date: Set(Some(valid.pub_date)),
        image: Set(None),
        user_id: Set(client.get_id().ok_or_else(|| {
            error::ErrorInternalServerError("Lost client identity mid-request.")
        })?),
        location_id: Set(valid.location_id),
        category_id: Set(valid.category_id),
        is_published: Set(true),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to(format!("/profile/{}/", client.get_name())))
}

#[get("/posts/{post_id}/edit/")]
pub async fn edit_post(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let db = get_db_pool();

    let post = posts::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    // Non-authors are quietly bounced to the public page.
    if !client.can_update_post(&post) {
        return Ok(redirect_to(post_url(id)));
    }

    let (category_list, location_list) = form_choices(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(PostUpdateTemplate {
        client,
        post_id: id,
        form: PostFormData::from_model(&post),
        category_list,
        location_list,
        errors: Vec::new(),
    }
    .to_response())
}

#[post("/posts/{post_id}/edit/")]
pub async fn update_post(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Form<PostFormData>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let db = get_db_pool();
    let form = form.into_inner();

    let post = posts::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.can_update_post(&post) {
        return Ok(redirect_to(post_url(id)));
    }

    let valid = match validate_post_form(&form) {
        Ok(valid) => valid,
        Err(errors) => {
            let (category_list, location_list) = form_choices(db)
                .await
                .map_err(error::ErrorInternalServerError)?;
            return Ok(PostUpdateTemplate {
                client,
                post_id: id,
                form,
                category_list,
                location_list,
                errors,
            }
            .to_response());
        }
    };

    let mut active: posts::ActiveModel = post.into();
    active.title = Set(valid.title);
    active.text = Set(valid.text);
    active.pub_date = Set(Some(valid.pub_date));
    active.location_id = Set(valid.location_id);
    active.category_id = Set(valid.category_id);
    active
        .update(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to(post_url(id)))
}

#[get("/posts/{post_id}/delete/")]
pub async fn delete_post(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let id = path.into_inner();

    let post = posts::Entity::find_by_id(id)
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.can_delete_post(&post) {
        return Ok(redirect_to(post_url(id)));
    }

    Ok(PostDeleteTemplate { client, post }.to_response())
}

#[post("/posts/{post_id}/delete/")]
pub async fn destroy_post(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    use crate::orm::comments;

    let id = path.into_inner();
    let db = get_db_pool();

    let post = posts::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.can_delete_post(&post) {
        return Ok(redirect_to(post_url(id)));
    }

    // The post's comments go with it.
    let txn = db.begin().await.map_err(error::ErrorInternalServerError)?;
    comments::Entity::delete_many()
        .filter(comments::Column::PostId.eq(id))
        .exec(&txn)
        .await
        .map_err(error::ErrorInternalServerError)?;
    posts::Entity::delete_many()
        .filter(posts::Column::Id.eq(id))
        .exec(&txn)
        .await
        .map_err(error::ErrorInternalServerError)?;
    txn.commit().await.map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to(format!("/profile/{}/", client.get_name())))
}

#[get("/posts/{post_id}/image")]
pub async fn edit_post_image(
    client: ClientCtx,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();

    let post = posts::Entity::find_by_id(id)
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.can_update_post(&post) {
        return Ok(redirect_to(post_url(id)));
    }

    Ok(PostImageTemplate {
        client,
        post,
        errors: Vec::new(),
    }
    .to_response())
}

#[post("/posts/{post_id}/image")]
pub async fn update_post_image(
    client: ClientCtx,
    path: web::Path<i32>,
    mut multipart: Multipart,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let db = get_db_pool();

    let post = posts::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.can_update_post(&post) {
        return Ok(redirect_to(post_url(id)));
    }

    let mut stored: Option<String> = None;
    let mut errors: Vec<String> = Vec::new();
    while let Ok(Some(mut field)) = multipart.try_next().await {
        let field_name = field
            .content_disposition()
            .get_name()
            .map(|name| name.to_owned());
        match field_name.as_deref() {
            Some("image") => {
                if !filesystem::is_image_field(&field) {
                    errors.push("Upload must be an image.".to_owned());
                    continue;
                }
                match filesystem::read_field_as_payload(&mut field).await? {
                    Some(payload) => stored = Some(filesystem::persist_payload(&payload)?),
                    None => errors.push("Upload is empty or improper.".to_owned()),
                }
            }
            Some(name) => {
                return Err(error::ErrorBadRequest(format!("Unknown field '{}'", name)));
            }
            None => {}
        }
    }

    let stored = match stored {
        Some(stored) if errors.is_empty() => stored,
        _ => {
            if errors.is_empty() {
                errors.push("Choose an image file to upload.".to_owned());
            }
            return Ok(PostImageTemplate {
                client,
                post,
                errors,
            }
            .to_response());
        }
    };

    let mut active: posts::ActiveModel = post.into();
    active.image = Set(Some(stored));
    active
        .update(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to(post_url(id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, text: &str, pub_date: &str) -> PostFormData {
        PostFormData {
            title: title.to_owned(),
            text: text.to_owned(),
            pub_date: pub_date.to_owned(),
            location_id: String::new(),
            category_id: String::new(),
        }
    }

    #[test]
    fn valid_form_passes() {
        let valid = validate_post_form(&form("Hello", "World", "2024-01-29T18:51"))
            .expect("form should validate");
        assert_eq!(valid.title, "Hello");
        assert_eq!(valid.pub_date.format("%Y-%m-%d %H:%M").to_string(), "2024-01-29 18:51");
        assert_eq!(valid.location_id, None);
        assert_eq!(valid.category_id, None);
    }

    #[test]
    fn whitespace_only_fields_are_rejected() {
        assert!(validate_post_form(&form("  ", "World", "2024-01-29T18:51")).is_err());
        assert!(validate_post_form(&form("Hello", " \n ", "2024-01-29T18:51")).is_err());
    }

    #[test]
    fn pub_date_is_required() {
        assert!(validate_post_form(&form("Hello", "World", "")).is_err());
        assert!(validate_post_form(&form("Hello", "World", "yesterday")).is_err());
    }

    #[test]
    fn pub_date_accepts_seconds() {
        assert!(validate_post_form(&form("Hello", "World", "2024-01-29T18:51:07")).is_ok());
    }

    #[test]
    fn overlong_title_is_rejected() {
        let title = "x".repeat(TITLE_MAX_LEN + 1);
        assert!(validate_post_form(&form(&title, "World", "2024-01-29T18:51")).is_err());
    }

    #[test]
    fn select_values_parse() {
        let mut data = form("Hello", "World", "2024-01-29T18:51");
        data.category_id = "3".to_owned();
        data.location_id = " ".to_owned();
        let valid = validate_post_form(&data).expect("form should validate");
        assert_eq!(valid.category_id, Some(3));
        assert_eq!(valid.location_id, None);

        data.category_id = "not-a-number".to_owned();
        assert!(validate_post_form(&data).is_err());
    }
}
