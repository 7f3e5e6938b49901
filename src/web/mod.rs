pub mod about;
pub mod account;
pub mod comment;
pub mod css;
pub mod error;
pub mod follow;
pub mod group;
pub mod index;
pub mod post;
pub mod profile;

use actix_web::HttpResponse;
use serde::Deserialize;

/// Configures the web app
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    index::configure(conf);
    group::configure(conf);
    profile::configure(conf);
    post::configure(conf);
    comment::configure(conf);
    follow::configure(conf);
    account::configure(conf);
    about::configure(conf);
    css::configure(conf);
}

/// `?page=N` on every listing route. 1-based.
#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

impl PageQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }
}

pub(crate) fn html_response(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// Sends guests to the login form, carrying the page they wanted.
pub(crate) fn login_redirect(next: &str) -> HttpResponse {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    HttpResponse::Found()
        .append_header(("Location", format!("/login?{}", query)))
        .finish()
}

pub(crate) fn found(location: String) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", location))
        .finish()
}
