use crate::middleware::ClientCtx;
use actix_web::{get, Responder};
use askama_actix::{Template, TemplateToResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_author).service(view_tech);
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate {
    pub client: ClientCtx,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate {
    pub client: ClientCtx,
}

#[get("/about/author/")]
pub async fn view_author(client: ClientCtx) -> impl Responder {
    AboutAuthorTemplate { client }.to_response()
}

#[get("/about/tech/")]
pub async fn view_tech(client: ClientCtx) -> impl Responder {
    AboutTechTemplate { client }.to_response()
}
