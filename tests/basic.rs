#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::middleware::ErrorHandlers;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn static_pages_render() {
        let app = test::init_service(
            App::new()
                .service(rublog::web::pages::view_about)
                .service(rublog::web::pages::view_rules),
        )
        .await;

        for uri in ["/pages/about", "/pages/rules"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success(), "{} did not render", uri);
        }
    }

    #[actix_rt::test]
    async fn auth_forms_render_for_guests() {
        let app = test::init_service(
            App::new()
                .service(rublog::web::account::view_login)
                .service(rublog::web::account::view_register),
        )
        .await;

        for uri in ["/login", "/register"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success(), "{} did not render", uri);
        }
    }

    #[actix_rt::test]
    async fn anonymous_post_creation_redirects_to_login() {
        let app =
            test::init_service(App::new().service(rublog::web::post::create_post_form)).await;

        let req = test::TestRequest::get().uri("/posts/new/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers()
                .get("Location")
                .expect("redirect should set Location"),
            "/login"
        );
    }

    #[actix_rt::test]
    async fn missing_routes_render_the_not_found_page() {
        let app = test::init_service(
            App::new()
                .wrap(
                    ErrorHandlers::new()
                        .handler(StatusCode::NOT_FOUND, rublog::web::error::render_404),
                )
                .service(rublog::web::pages::view_about),
        )
        .await;

        let req = test::TestRequest::get().uri("/no-such-page").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = test::read_body(resp).await;
        let body = std::str::from_utf8(&body).expect("error page should be utf-8");
        assert!(body.contains("404 Not Found"), "{}", body);
    }
}
