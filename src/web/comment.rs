use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{comments, users};
use crate::web::post::{get_post_for_template, PostForTemplate};
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use sea_orm::FromQueryResult;
use serde::Deserialize;

/// Listing pages show this many of the newest comments as a sidebar.
const RECENT_COMMENTS: u64 = 10;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(add_comment).service(delete_comment);
}

#[derive(Debug, FromQueryResult)]
pub struct CommentForTemplate {
    pub id: i32,
    pub text: String,
    pub created: chrono::NaiveDateTime,
    pub post_id: i32,
    pub user_id: i32,
    // join users
    pub username: Option<String>,
}

fn comments_with_meta() -> Select<comments::Entity> {
    comments::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Username, "username")
        .order_by_desc(comments::Column::Created)
}

pub async fn comments_for_post(
    db: &DatabaseConnection,
    post_id: i32,
) -> Result<Vec<CommentForTemplate>, DbErr> {
    comments_with_meta()
        .filter(comments::Column::PostId.eq(post_id))
        .into_model::<CommentForTemplate>()
        .all(db)
        .await
}

pub async fn recent_comments(db: &DatabaseConnection) -> Result<Vec<CommentForTemplate>, DbErr> {
    comments_with_meta()
        .limit(RECENT_COMMENTS)
        .into_model::<CommentForTemplate>()
        .all(db)
        .await
}

async fn get_comment_for_template(
    db: &DatabaseConnection,
    post_id: i32,
    comment_id: i32,
) -> Result<Option<CommentForTemplate>, DbErr> {
    comments_with_meta()
        .filter(comments::Column::Id.eq(comment_id))
        .filter(comments::Column::PostId.eq(post_id))
        .into_model::<CommentForTemplate>()
        .one(db)
        .await
}

#[derive(Template)]
#[template(path = "comment_delete.html")]
pub struct CommentDeleteTemplate<'a> {
    pub client: ClientCtx,
    pub post: &'a PostForTemplate,
    pub comment: &'a CommentForTemplate,
}

#[derive(Deserialize)]
pub struct CommentFormData {
    pub text: String,
}

#[post("/posts/{post_id}/comment/")]
pub async fn add_comment(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Form<CommentFormData>,
) -> Result<HttpResponse, Error> {
    let post_id = path.into_inner();
    if !client.is_user() {
        return Ok(super::login_redirect(&format!(
            "/posts/{}/comment/",
            post_id
        )));
    }
    let db = get_db_pool();
    let post = get_post_for_template(db, post_id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    // An empty comment is dropped, not an error; either way the client
    // lands back on the post.
    let text = form.text.trim();
    if !text.is_empty() {
        comments::ActiveModel {
            text: Set(text.to_owned()),
            created: Set(Utc::now().naive_utc()),
            post_id: Set(post.id),
            user_id: Set(client.get_id().unwrap()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(error::ErrorInternalServerError)?;
    }

    Ok(super::found(format!("/posts/{}/", post.id)))
}

#[get("/posts/{post_id}/comment/{comment_id}/delete/{check}/")]
pub async fn delete_comment(
    client: ClientCtx,
    path: web::Path<(i32, i32, String)>,
) -> Result<HttpResponse, Error> {
    let (post_id, comment_id, check) = path.into_inner();
    if !client.is_user() {
        return Ok(super::login_redirect(&format!(
            "/posts/{}/comment/{}/delete/{}/",
            post_id, comment_id, check
        )));
    }
    let db = get_db_pool();
    let post = get_post_for_template(db, post_id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;
    let comment = get_comment_for_template(db, post.id, comment_id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Comment not found."))?;

    if !client.can_delete_comment(&comment) {
        return Ok(super::found(format!("/posts/{}/", post.id)));
    }

    match check.as_str() {
        "check" => Ok(CommentDeleteTemplate {
            client,
            post: &post,
            comment: &comment,
        }
        .to_response()),
        "cancel" => Ok(super::found(format!("/posts/{}/", post.id))),
        "delete" => {
            comments::Entity::delete_many()
                .filter(comments::Column::Id.eq(comment.id))
                .exec(db)
                .await
                .map_err(error::ErrorInternalServerError)?;
            Ok(super::found(format!("/posts/{}/", post.id)))
        }
        _ => Err(error::ErrorNotFound("Unknown delete action.")),
    }
}
