use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::follows;
use crate::pagination::Paginator;
use crate::user::get_user_by_username;
use crate::web::comment::{recent_comments, CommentForTemplate};
use crate::web::post::{paginate_posts, posts_with_meta, PostForTemplate};
use crate::web::profile::is_following;
use crate::web::PageQuery;
use actix_web::{error, get, web, Error, HttpResponse};
use askama_actix::Template;
use sea_orm::{entity::*, query::*, JoinType};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(follow_index)
        .service(profile_follow)
        .service(profile_unfollow);
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate<'a> {
    pub client: ClientCtx,
    pub posts: &'a Vec<PostForTemplate>,
    pub paginator: &'a Paginator,
    pub comments: &'a Vec<CommentForTemplate>,
}

#[get("/follow/")]
pub async fn follow_index(
    client: ClientCtx,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(super::login_redirect("/follow/")),
    };
    let db = get_db_pool();

    // Posts reached through the follow edge: the author join is already in
    // the base selector, the edge hangs off the joined users table.
    let select = posts_with_meta()
        .join_rev(JoinType::InnerJoin, follows::Relation::Author.def())
        .filter(follows::Column::UserId.eq(user_id));

    let (posts, paginator) = paginate_posts(db, select, "/follow/", query.page())
        .await
        .map_err(error::ErrorInternalServerError)?;
    let comments = recent_comments(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let body = FollowTemplate {
        client,
        posts: &posts,
        paginator: &paginator,
        comments: &comments,
    }
    .render()
    .map_err(|_| error::ErrorInternalServerError("Template parsing error"))?;
    Ok(super::html_response(body))
}

#[get("/profile/{username}/follow/")]
pub async fn profile_follow(client: ClientCtx, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let username = path.into_inner();
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(super::login_redirect(&format!("/profile/{}/follow/", username))),
    };
    let db = get_db_pool();
    let author = get_user_by_username(db, &username)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("User not found."))?;

    // Self-follow and duplicate edges are silently skipped.
    let duplicate = is_following(db, user_id, author.id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    if author.id != user_id && !duplicate {
        follows::ActiveModel {
            user_id: Set(user_id),
            author_id: Set(author.id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(error::ErrorInternalServerError)?;
    }

    Ok(super::found(format!("/profile/{}/", author.username)))
}

#[get("/profile/{username}/unfollow/")]
pub async fn profile_unfollow(
    client: ClientCtx,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let username = path.into_inner();
    let user_id = match client.get_id() {
        Some(id) => id,
        None => {
            return Ok(super::login_redirect(&format!(
                "/profile/{}/unfollow/",
                username
            )))
        }
    };
    let db = get_db_pool();
    let author = get_user_by_username(db, &username)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("User not found."))?;

    follows::Entity::delete_many()
        .filter(
            Condition::all()
                .add(follows::Column::UserId.eq(user_id))
                .add(follows::Column::AuthorId.eq(author.id)),
        )
        .exec(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(super::found(format!("/profile/{}/", author.username)))
}
