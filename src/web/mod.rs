pub mod account;
pub mod category;
pub mod comment;
pub mod error;
pub mod index;
pub mod pages;
pub mod post;
pub mod profile;

use serde::Deserialize;

/// `?page=N` for the listing views.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

impl PageQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }
}

/// Configures the web app
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Literal paths must register ahead of their parameterized siblings
    // (/posts/new/ vs /posts/{post_id}/, /profile/edit/ vs /profile/{username}/).
    conf.service(index::view_index)
        .service(account::view_register)
        .service(account::post_register)
        .service(account::view_login)
        .service(account::post_login)
        .service(account::view_logout)
        .service(pages::view_about)
        .service(pages::view_rules)
        .service(category::view_category)
        .service(post::create_post_form)
        .service(post::create_post)
        .service(post::edit_post)
        .service(post::update_post)
        .service(post::delete_post)
        .service(post::destroy_post)
        .service(post::edit_post_image)
        .service(post::update_post_image)
        .service(post::view_post)
        .service(comment::create_comment)
        .service(comment::edit_comment)
        .service(comment::update_comment)
        .service(comment::delete_comment)
        .service(comment::destroy_comment)
        .service(profile::edit_profile)
        .service(profile::update_profile)
        .service(profile::view_profile)
        .service(crate::session::view_task_expire_sessions)
        .service(actix_files::Files::new(
            "/media",
            crate::filesystem::get_media_dir(),
        ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_to_one() {
        assert_eq!(PageQuery { page: None }.page(), 1);
        assert_eq!(PageQuery { page: Some(0) }.page(), 1);
        assert_eq!(PageQuery { page: Some(4) }.page(), 4);
    }
}
