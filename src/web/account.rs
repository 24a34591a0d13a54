use super::post::redirect_to;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::session;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use askama_actix::{Template, TemplateToResponse};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{entity::*, query::*};
use serde::Deserialize;
use uuid::Uuid;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const EMAIL_MAX_LEN: usize = 254;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^[A-Za-z0-9_-]{3,32}$").expect("USERNAME_RE failed to parse")
});

pub(super) fn validate_username(name: &str) -> Result<String, String> {
    let name = name.trim();
    if USERNAME_RE.is_match(name) {
        Ok(name.to_owned())
    } else {
        Err("Usernames are 3-32 characters: latin letters, digits, hyphen, underscore.".to_owned())
    }
}

pub(super) fn validate_email(email: &str) -> Result<String, String> {
    let email = email.trim();
    if email.is_empty() || email.len() > EMAIL_MAX_LEN || !email.contains('@') {
        Err("Enter a valid email address.".to_owned())
    } else {
        Ok(email.to_owned())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterFormData {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct ValidRegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Run form data through validator.
pub fn validate_register_form(form: &RegisterFormData) -> Result<ValidRegisterForm, Vec<String>> {
    let mut errors = Vec::new();

    let name = validate_username(&form.username).unwrap_or_else(|e| {
        errors.push(e);
        String::new()
    });
    let email = validate_email(&form.email).unwrap_or_else(|e| {
        errors.push(e);
        String::new()
    });
    if form.password.len() < PASSWORD_MIN_LEN {
        errors.push(format!(
            "Passwords must be at least {} characters.",
            PASSWORD_MIN_LEN
        ));
    }

    if errors.is_empty() {
        Ok(ValidRegisterForm {
            name,
            email,
            password: form.password.to_owned(),
        })
    } else {
        Err(errors)
    }
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub client: ClientCtx,
    pub form: RegisterFormData,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub client: ClientCtx,
    pub username: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "logout.html")]
pub struct LogoutTemplate {
    pub client: ClientCtx,
}

#[get("/register")]
pub async fn view_register(client: ClientCtx) -> Result<HttpResponse, Error> {
    Ok(RegisterTemplate {
        client,
        form: RegisterFormData::default(),
        errors: Vec::new(),
    }
    .to_response())
}

#[post("/register")]
pub async fn post_register(
    client: ClientCtx,
    form: web::Form<RegisterFormData>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let form = form.into_inner();

    let valid = match validate_register_form(&form) {
        Ok(valid) => valid,
        Err(errors) => {
            return Ok(RegisterTemplate {
                client,
                form,
                errors,
            }
            .to_response());
        }
    };

    let taken = users::Entity::find()
        .filter(users::Column::Name.eq(valid.name.as_str()))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .is_some();
    if taken {
        return Ok(RegisterTemplate {
            client,
            form,
            errors: vec!["That username is taken.".to_owned()],
        }
        .to_response());
    }

    let password_hash = Argon2::default()
        .hash_password(valid.password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map_err(|e| {
            log::error!("post_register: hash_password: {}", e);
            error::ErrorInternalServerError("Could not create account.")
        })?
        .to_string();

    users::ActiveModel {
        name: Set(valid.name),
        email: Set(valid.email),
        password: Set(password_hash),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to("/login".to_owned()))
}

#[derive(Debug, Deserialize)]
pub struct LoginFormData {
    pub username: String,
    pub password: String,
}

fn login_failed(client: ClientCtx, username: String) -> HttpResponse {
    // One message for both unknown user and wrong password.
    LoginTemplate {
        client,
        username,
        errors: vec!["Invalid username or password.".to_owned()],
    }
    .to_response()
}

#[get("/login")]
pub async fn view_login(client: ClientCtx) -> Result<HttpResponse, Error> {
    Ok(LoginTemplate {
        client,
        username: String::new(),
        errors: Vec::new(),
    }
    .to_response())
}

#[post("/login")]
pub async fn post_login(
    client: ClientCtx,
    cookies: Session,
    form: web::Form<LoginFormData>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let form = form.into_inner();
    let username = form.username.trim().to_owned();

    let user = match users::Entity::find()
        .filter(users::Column::Name.eq(username.as_str()))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
    {
        Some(user) => user,
        None => return Ok(login_failed(client, username)),
    };

    let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
        log::error!("post_login: stored hash unreadable for user {}: {}", user.id, e);
        error::ErrorInternalServerError("Could not verify credentials.")
    })?;
    if Argon2::default()
        .verify_password(form.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Ok(login_failed(client, username));
    }

    let uuid = session::new_session(db, user.id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    cookies
        .insert("token", uuid.to_string())
        .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to("/".to_owned()))
}

#[get("/logout")]
pub async fn view_logout(cookies: Session) -> Result<HttpResponse, Error> {
    match cookies.get::<String>("token") {
        Ok(Some(token)) => match Uuid::parse_str(&token) {
            Ok(uuid) => {
                if let Err(e) = session::remove_session(get_db_pool(), uuid).await {
                    log::error!("view_logout: remove_session() {}", e);
                }
            }
            Err(e) => {
                log::error!("view_logout: parse_str() {}", e);
            }
        },
        Ok(None) => {}
        Err(e) => {
            log::error!("view_logout: cookies.get() {}", e);
        }
    }

    cookies.purge();

    // The middleware resolved this request's client before the purge,
    // so render as a guest explicitly.
    Ok(LogoutTemplate {
        client: ClientCtx::default(),
    }
    .to_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_follow_the_pattern() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("  alice  ").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("alice smith").is_err());
        assert!(validate_username("алиса").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
    }

    #[test]
    fn emails_need_an_at_sign() {
        assert!(validate_email("a@b.c").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("nobody").is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        let form = RegisterFormData {
            username: "alice".to_owned(),
            email: "a@b.c".to_owned(),
            password: "1234567".to_owned(),
        };
        assert!(validate_register_form(&form).is_err());
    }

    #[test]
    fn valid_registration_passes() {
        let form = RegisterFormData {
            username: " alice ".to_owned(),
            email: "a@b.c".to_owned(),
            password: "hunter2hunter2".to_owned(),
        };
        let valid = validate_register_form(&form).expect("should validate");
        assert_eq!(valid.name, "alice");
    }
}
