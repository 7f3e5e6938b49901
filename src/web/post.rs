use crate::filesystem;
use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{groups, posts, users};
use crate::pagination::{Paginator, POSTS_PER_PAGE};
use crate::web::comment::{comments_for_post, CommentForTemplate};
use actix_multipart::{Field, Multipart};
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use sea_orm::FromQueryResult;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_post)
        .service(create_post_get)
        .service(create_post_post)
        .service(edit_post_get)
        .service(edit_post_post)
        .service(delete_post);
}

/// A fully joined struct representing the post model and its relational data.
#[derive(Debug, FromQueryResult)]
pub struct PostForTemplate {
    pub id: i32,
    pub text: String,
    pub pub_date: chrono::NaiveDateTime,
    pub user_id: i32,
    pub group_id: Option<i32>,
    pub image: Option<String>,
    // join users
    pub username: Option<String>,
    // join groups
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
}

/// Base selector for every post listing: author and group metadata joined,
/// newest first.
pub fn posts_with_meta() -> Select<posts::Entity> {
    posts::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Username, "username")
        .left_join(groups::Entity)
        .column_as(groups::Column::Title, "group_title")
        .column_as(groups::Column::Slug, "group_slug")
        .order_by_desc(posts::Column::PubDate)
}

pub async fn get_post_for_template(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<PostForTemplate>, DbErr> {
    posts_with_meta()
        .filter(posts::Column::Id.eq(id))
        .into_model::<PostForTemplate>()
        .one(db)
        .await
}

/// Slices a post selector into one fixed-size page.
/// An out-of-range `page` clamps to the nearest valid page.
pub async fn paginate_posts(
    db: &DatabaseConnection,
    select: Select<posts::Entity>,
    base_url: &str,
    page: usize,
) -> Result<(Vec<PostForTemplate>, Paginator), DbErr> {
    let paginator = select
        .into_model::<PostForTemplate>()
        .paginate(db, POSTS_PER_PAGE);
    let page_count = paginator.num_pages().await?.max(1);
    let page = page.min(page_count);
    let posts = paginator.fetch_page(page - 1).await?;
    Ok((posts, Paginator::new(base_url, page, page_count)))
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate<'a> {
    pub client: ClientCtx,
    pub post: &'a PostForTemplate,
    pub comments: &'a Vec<CommentForTemplate>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate<'a> {
    pub client: ClientCtx,
    pub groups: &'a Vec<groups::Model>,
    pub text: String,
    pub group_id: Option<i32>,
    pub is_edit: bool,
    pub post_id: Option<i32>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "post_delete.html")]
pub struct PostDeleteTemplate<'a> {
    pub client: ClientCtx,
    pub post: &'a PostForTemplate,
}

/// Multipart fields accepted by the create and edit forms.
#[derive(Debug, Default)]
pub struct PostFormData {
    pub text: String,
    pub group_id: Option<i32>,
    /// Stored filename of a newly uploaded image, if any.
    pub image: Option<String>,
}

pub fn validate_post_text(text: &str) -> Result<String, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err("Post text cannot be empty.".to_owned())
    } else {
        Ok(trimmed.to_owned())
    }
}

async fn read_text_field(field: &mut Field) -> Result<String, Error> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = field.next().await {
        let bytes = chunk.map_err(|e| {
            log::error!("read_text_field: multipart read error: {}", e);
            error::ErrorInternalServerError("error reading form data")
        })?;
        buf.extend(bytes);
    }
    String::from_utf8(buf).map_err(|_| error::ErrorBadRequest("Form text must be UTF-8."))
}

async fn read_post_form(mut payload: Multipart) -> Result<PostFormData, Error> {
    let mut form = PostFormData::default();
    while let Ok(Some(mut field)) = payload.try_next().await {
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or("")
            .to_owned();
        match name.as_str() {
            "text" => form.text = read_text_field(&mut field).await?,
            "group" => {
                let value = read_text_field(&mut field).await?;
                let value = value.trim();
                form.group_id = if value.is_empty() {
                    None
                } else {
                    Some(value.parse::<i32>().map_err(|_| {
                        error::ErrorBadRequest("Group selection was not an id.")
                    })?)
                };
            }
            "image" => {
                if let Some(upload) = filesystem::read_image_field(&mut field).await? {
                    let stored = filesystem::persist(&upload)
                        .map_err(error::ErrorInternalServerError)?;
                    form.image = Some(stored);
                }
            }
            _ => return Err(error::ErrorBadRequest(format!("Unknown field '{}'", name))),
        }
    }
    Ok(form)
}

async fn get_groups_for_form(db: &DatabaseConnection) -> Result<Vec<groups::Model>, Error> {
    groups::Entity::find()
        .order_by_asc(groups::Column::Title)
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)
}

/// Checks the form against everything the database must agree with.
async fn validate_post_form(
    db: &DatabaseConnection,
    form: &PostFormData,
) -> Result<Result<String, String>, Error> {
    let text = match validate_post_text(&form.text) {
        Ok(text) => text,
        Err(e) => return Ok(Err(e)),
    };
    if let Some(group_id) = form.group_id {
        let exists = groups::Entity::find_by_id(group_id)
            .one(db)
            .await
            .map_err(error::ErrorInternalServerError)?
            .is_some();
        if !exists {
            return Ok(Err("That group does not exist.".to_owned()));
        }
    }
    Ok(Ok(text))
}

#[get("/posts/{post_id}/")]
pub async fn view_post(client: ClientCtx, path: web::Path<i32>) -> Result<impl Responder, Error> {
    let db = get_db_pool();
    let post = get_post_for_template(db, path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;
    let comments = comments_for_post(db, post.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(PostDetailTemplate {
        client,
        post: &post,
        comments: &comments,
    }
    .to_response())
}

#[get("/create/")]
pub async fn create_post_get(client: ClientCtx) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        return Ok(super::login_redirect("/create/"));
    }
    let groups = get_groups_for_form(get_db_pool()).await?;

    Ok(PostFormTemplate {
        client,
        groups: &groups,
        text: String::new(),
        group_id: None,
        is_edit: false,
        post_id: None,
        error: None,
    }
    .to_response())
}

#[post("/create/")]
pub async fn create_post_post(
    client: ClientCtx,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        return Ok(super::login_redirect("/create/"));
    }
    let db = get_db_pool();
    let form = read_post_form(payload).await?;

    let text = match validate_post_form(db, &form).await? {
        Ok(text) => text,
        Err(message) => {
            let groups = get_groups_for_form(db).await?;
            return Ok(PostFormTemplate {
                client,
                groups: &groups,
                text: form.text,
                group_id: form.group_id,
                is_edit: false,
                post_id: None,
                error: Some(message),
            }
            .to_response());
        }
    };

    posts::ActiveModel {
        text: Set(text),
        pub_date: Set(Utc::now().naive_utc()),
        user_id: Set(client.get_id().unwrap()),
        group_id: Set(form.group_id),
        image: Set(form.image),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(super::found(format!("/profile/{}/", client.get_name())))
}

#[get("/posts/{post_id}/edit/")]
pub async fn edit_post_get(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let post_id = path.into_inner();
    if !client.is_user() {
        return Ok(super::login_redirect(&format!("/posts/{}/edit/", post_id)));
    }
    let db = get_db_pool();
    let post = get_post_for_template(db, post_id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.can_update_post(&post) {
        return Ok(super::found(format!("/posts/{}/", post.id)));
    }

    let groups = get_groups_for_form(db).await?;
    Ok(PostFormTemplate {
        client,
        groups: &groups,
        text: post.text.to_owned(),
        group_id: post.group_id,
        is_edit: true,
        post_id: Some(post.id),
        error: None,
    }
    .to_response())
}

#[post("/posts/{post_id}/edit/")]
pub async fn edit_post_post(
    client: ClientCtx,
    path: web::Path<i32>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let post_id = path.into_inner();
    if !client.is_user() {
        return Ok(super::login_redirect(&format!("/posts/{}/edit/", post_id)));
    }
    let db = get_db_pool();
    let post = get_post_for_template(db, post_id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.can_update_post(&post) {
        return Ok(super::found(format!("/posts/{}/", post.id)));
    }

    let form = read_post_form(payload).await?;
    let text = match validate_post_form(db, &form).await? {
        Ok(text) => text,
        Err(message) => {
            let groups = get_groups_for_form(db).await?;
            return Ok(PostFormTemplate {
                client,
                groups: &groups,
                text: form.text,
                group_id: form.group_id,
                is_edit: true,
                post_id: Some(post.id),
                error: Some(message),
            }
            .to_response());
        }
    };

    // A form without a new upload keeps the stored image.
    let image = match form.image {
        Some(image) => Some(image),
        None => post.image.to_owned(),
    };

    posts::ActiveModel {
        id: Set(post.id),
        text: Set(text),
        group_id: Set(form.group_id),
        image: Set(image),
        ..Default::default()
    }
    .update(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(super::found(format!("/posts/{}/", post.id)))
}

#[get("/posts/{post_id}/delete/{check}/")]
pub async fn delete_post(
    client: ClientCtx,
    path: web::Path<(i32, String)>,
) -> Result<HttpResponse, Error> {
    let (post_id, check) = path.into_inner();
    if !client.is_user() {
        return Ok(super::login_redirect(&format!(
            "/posts/{}/delete/{}/",
            post_id, check
        )));
    }
    let db = get_db_pool();
    let post = get_post_for_template(db, post_id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.can_delete_post(&post) {
        return Ok(super::found(format!("/posts/{}/", post.id)));
    }

    match check.as_str() {
        "check" => Ok(PostDeleteTemplate {
            client,
            post: &post,
        }
        .to_response()),
        "cancel" => Ok(super::found(format!("/posts/{}/", post.id))),
        "delete" => {
            posts::Entity::delete_many()
                .filter(posts::Column::Id.eq(post.id))
                .exec(db)
                .await
                .map_err(error::ErrorInternalServerError)?;
            // The index is cached whole; dropping one post invalidates all of it.
            crate::cache::clear();
            Ok(super::found(format!("/profile/{}/", client.get_name())))
        }
        _ => Err(error::ErrorNotFound("Unknown delete action.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_text_is_trimmed() {
        assert_eq!(validate_post_text("  hello \n"), Ok("hello".to_owned()));
    }

    #[test]
    fn blank_post_text_is_rejected() {
        assert!(validate_post_text("").is_err());
        assert!(validate_post_text("   \n\t ").is_err());
    }
}
