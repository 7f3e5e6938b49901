use crate::cache;
use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::pagination::Paginator;
use crate::web::comment::{recent_comments, CommentForTemplate};
use crate::web::post::{paginate_posts, posts_with_meta, PostForTemplate};
use crate::web::PageQuery;
use actix_web::{error, get, web, Error, HttpResponse};
use askama_actix::Template;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index);
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub client: ClientCtx,
    pub posts: &'a Vec<PostForTemplate>,
    pub paginator: &'a Paginator,
    pub comments: &'a Vec<CommentForTemplate>,
}

#[get("/")]
pub async fn view_index(
    client: ClientCtx,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let page = query.page();

    // Whole-page cache: every client gets the same rendering for the TTL.
    let key = cache::index_key(page);
    if let Some(body) = cache::get(&key) {
        return Ok(super::html_response(body));
    }

    let db = get_db_pool();
    let (posts, paginator) = paginate_posts(db, posts_with_meta(), "/", page)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let comments = recent_comments(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let body = IndexTemplate {
        client,
        posts: &posts,
        paginator: &paginator,
        comments: &comments,
    }
    .render()
    .map_err(|_| error::ErrorInternalServerError("Template parsing error"))?;

    cache::put(&key, body.to_owned());
    Ok(super::html_response(body))
}
