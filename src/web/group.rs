use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{groups, posts};
use crate::pagination::Paginator;
use crate::web::comment::{recent_comments, CommentForTemplate};
use crate::web::post::{paginate_posts, posts_with_meta, PostForTemplate};
use crate::web::PageQuery;
use actix_web::{error, get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, query::*};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_group);
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate<'a> {
    pub client: ClientCtx,
    pub group: &'a groups::Model,
    pub posts: &'a Vec<PostForTemplate>,
    pub paginator: &'a Paginator,
    pub comments: &'a Vec<CommentForTemplate>,
}

#[get("/group/{slug}/")]
pub async fn view_group(
    client: ClientCtx,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, Error> {
    let db = get_db_pool();
    let group = groups::Entity::find()
        .filter(groups::Column::Slug.eq(path.into_inner()))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Group not found."))?;

    let base_url = format!("/group/{}/", group.slug);
    let (posts, paginator) = paginate_posts(
        db,
        posts_with_meta().filter(posts::Column::GroupId.eq(group.id)),
        &base_url,
        query.page(),
    )
    .await
    .map_err(error::ErrorInternalServerError)?;
    let comments = recent_comments(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(GroupTemplate {
        client,
        group: &group,
        posts: &posts,
        paginator: &paginator,
        comments: &comments,
    }
    .to_response())
}
