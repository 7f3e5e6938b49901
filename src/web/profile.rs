use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{follows, posts, users};
use crate::pagination::Paginator;
use crate::user::get_user_by_username;
use crate::web::comment::{recent_comments, CommentForTemplate};
use crate::web::post::{paginate_posts, posts_with_meta, PostForTemplate};
use crate::web::PageQuery;
use actix_web::{error, get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_profile);
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate<'a> {
    pub client: ClientCtx,
    pub author: &'a users::Model,
    pub following: bool,
    pub posts: &'a Vec<PostForTemplate>,
    pub paginator: &'a Paginator,
    pub comments: &'a Vec<CommentForTemplate>,
}

/// True when `follower_id` has a live follow edge to `author_id`.
pub async fn is_following(
    db: &DatabaseConnection,
    follower_id: i32,
    author_id: i32,
) -> Result<bool, DbErr> {
    Ok(follows::Entity::find()
        .filter(
            Condition::all()
                .add(follows::Column::UserId.eq(follower_id))
                .add(follows::Column::AuthorId.eq(author_id)),
        )
        .one(db)
        .await?
        .is_some())
}

#[get("/profile/{username}/")]
pub async fn view_profile(
    client: ClientCtx,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, Error> {
    let db = get_db_pool();
    let author = get_user_by_username(db, &path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("User not found."))?;

    let following = match client.get_id() {
        Some(id) => is_following(db, id, author.id)
            .await
            .map_err(error::ErrorInternalServerError)?,
        None => false,
    };

    let base_url = format!("/profile/{}/", author.username);
    let (posts, paginator) = paginate_posts(
        db,
        posts_with_meta().filter(posts::Column::UserId.eq(author.id)),
        &base_url,
        query.page(),
    )
    .await
    .map_err(error::ErrorInternalServerError)?;
    let comments = recent_comments(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(ProfileTemplate {
        client,
        author: &author,
        following,
        posts: &posts,
        paginator: &paginator,
        comments: &comments,
    }
    .to_response())
}
