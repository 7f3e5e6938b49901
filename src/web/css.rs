use actix_web::{get, Error, HttpResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_css);
}

#[get("/style.css")]
pub async fn view_css() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok()
        .content_type("text/css")
        .body(include_str!("../../templates/css/main.css")))
}
