use super::post::{post_url, redirect_to, redirect_to_login};
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{comments, posts};
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::Utc;
use sea_orm::{entity::*, query::*};
use serde::Deserialize;

pub const COMMENT_MAX_LEN: usize = 2000;

#[derive(Debug, Default, Deserialize)]
pub struct CommentFormData {
    pub text: String,
}

/// Run form data through validator.
pub fn validate_comment_form(form: &CommentFormData) -> Result<String, Vec<String>> {
    let mut errors = Vec::new();

    let text = form.text.trim();
    if text.is_empty() {
        errors.push("Comment must not be empty.".to_owned());
    } else if text.len() > COMMENT_MAX_LEN {
        errors.push(format!(
            "Comment must be {} characters or fewer.",
            COMMENT_MAX_LEN
        ));
    }

    if errors.is_empty() {
        Ok(text.to_owned())
    } else {
        Err(errors)
    }
}

#[derive(Template)]
#[template(path = "comment_form.html")]
pub struct CommentFormTemplate {
    pub client: ClientCtx,
    pub post_id: i32,
    pub comment_id: Option<i32>,
    pub form: CommentFormData,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "comment_delete.html")]
pub struct CommentDeleteTemplate {
    pub client: ClientCtx,
    pub post_id: i32,
    pub comment: comments::Model,
}

/// Any logged-in user may comment on any post they can reach.
#[post("/posts/{post_id}/comment/")]
pub async fn create_comment(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Form<CommentFormData>,
) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        return Ok(redirect_to_login());
    }
    let post_id = path.into_inner();
    let db = get_db_pool();
    let form = form.into_inner();

    let post = posts::Entity::find_by_id(post_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    let text = match validate_comment_form(&form) {
        Ok(text) => text,
        Err(errors) => {
            return Ok(CommentFormTemplate {
                client,
                post_id,
                comment_id: None,
                form,
                errors,
            }
            .to_response());
        }
    };

    comments::ActiveModel {
        text: Set(text),
        post_id: Set(post.id),
        user_id: Set(client.get_id().ok_or_else(|| {
            error::ErrorInternalServerError("Lost client identity mid-request.")
        })?),
        is_published: Set(true),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to(post_url(post_id)))
}

#[get("/posts/{post_id}/comment/{comment_id}/edit/")]
pub async fn edit_comment(
    client: ClientCtx,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, Error> {
    let (post_id, comment_id) = path.into_inner();

    let comment = comments::Entity::find_by_id(comment_id)
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Comment not found."))?;

    // Non-authors are quietly bounced to the public page.
    if !client.can_update_comment(&comment) {
        return Ok(redirect_to(post_url(post_id)));
    }

    Ok(CommentFormTemplate {
        client,
        post_id,
        comment_id: Some(comment_id),
        form: CommentFormData { text: comment.text },
        errors: Vec::new(),
    }
    .to_response())
}

#[post("/posts/{post_id}/comment/{comment_id}/edit/")]
pub async fn update_comment(
    client: ClientCtx,
    path: web::Path<(i32, i32)>,
    form: web::Form<CommentFormData>,
) -> Result<HttpResponse, Error> {
    let (post_id, comment_id) = path.into_inner();
    let db = get_db_pool();
    let form = form.into_inner();

    let comment = comments::Entity::find_by_id(comment_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Comment not found."))?;

    if !client.can_update_comment(&comment) {
        return Ok(redirect_to(post_url(post_id)));
    }

    let text = match validate_comment_form(&form) {
        Ok(text) => text,
        Err(errors) => {
            return Ok(CommentFormTemplate {
                client,
                post_id,
                comment_id: Some(comment_id),
                form,
                errors,
            }
            .to_response());
        }
    };

    let mut active: comments::ActiveModel = comment.into();
    active.text = Set(text);
    active
        .update(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to(post_url(post_id)))
}

#[get("/posts/{post_id}/comment/{comment_id}/delete/")]
pub async fn delete_comment(
    client: ClientCtx,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, Error> {
    let (post_id, comment_id) = path.into_inner();

    let comment = comments::Entity::find_by_id(comment_id)
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Comment not found."))?;

    if !client.can_delete_comment(&comment) {
        return Ok(redirect_to(post_url(post_id)));
    }

    Ok(CommentDeleteTemplate {
        client,
        post_id,
        comment,
    }
    .to_response())
}

#[post("/posts/{post_id}/comment/{comment_id}/delete/")]
pub async fn destroy_comment(
    client: ClientCtx,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, Error> {
    let (post_id, comment_id) = path.into_inner();
    let db = get_db_pool();

    let comment = comments::Entity::find_by_id(comment_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Comment not found."))?;

    if !client.can_delete_comment(&comment) {
        return Ok(redirect_to(post_url(post_id)));
    }

    comments::Entity::delete_many()
        .filter(comments::Column::Id.eq(comment_id))
        .exec(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to(post_url(post_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_text_is_trimmed() {
        let form = CommentFormData {
            text: "  hello  ".to_owned(),
        };
        assert_eq!(validate_comment_form(&form).expect("should validate"), "hello");
    }

    #[test]
    fn empty_comment_is_rejected() {
        let form = CommentFormData {
            text: " \n\t ".to_owned(),
        };
        assert!(validate_comment_form(&form).is_err());
    }

    #[test]
    fn overlong_comment_is_rejected() {
        let form = CommentFormData {
            text: "x".repeat(COMMENT_MAX_LEN + 1),
        };
        assert!(validate_comment_form(&form).is_err());
    }
}
