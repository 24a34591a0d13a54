use crate::middleware::ClientCtx;
use actix_web::{get, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub client: ClientCtx,
}

#[derive(Template)]
#[template(path = "rules.html")]
pub struct RulesTemplate {
    pub client: ClientCtx,
}

#[get("/pages/about")]
pub async fn view_about(client: ClientCtx) -> Result<HttpResponse, Error> {
    Ok(AboutTemplate { client }.to_response())
}

#[get("/pages/rules")]
pub async fn view_rules(client: ClientCtx) -> Result<HttpResponse, Error> {
    Ok(RulesTemplate { client }.to_response())
}
