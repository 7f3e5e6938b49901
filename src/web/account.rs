use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::session;
use crate::user::get_user_by_username;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{entity::*, query::*};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(login_get)
        .service(login_post)
        .service(logout)
        .service(signup_get)
        .service(signup_post)
        .service(account_get)
        .service(account_post);
}

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.@+-]{1,150}$").expect("USERNAME_RE failed to compile"));

const PASSWORD_MIN_LEN: usize = 8;

pub fn validate_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("verify_password: stored hash failed to parse: {}", e);
            false
        }
    }
}

/// Relative paths only; anything else falls back to the index.
fn safe_next(next: &Option<String>) -> String {
    match next.as_deref() {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => next.to_owned(),
        _ => "/".to_owned(),
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub client: ClientCtx,
    pub next: Option<String>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub client: ClientCtx,
    pub username: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "logout.html")]
pub struct LogoutTemplate {
    pub client: ClientCtx,
}

#[derive(Template)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub client: ClientCtx,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginFormData {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct SignupFormData {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Deserialize)]
pub struct PasswordChangeFormData {
    pub old_password: String,
    pub new_password: String,
}

#[get("/login")]
pub async fn login_get(client: ClientCtx, query: web::Query<NextQuery>) -> impl Responder {
    LoginTemplate {
        client,
        next: query.into_inner().next,
        error: None,
    }
    .to_response()
}

#[post("/login")]
pub async fn login_post(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<LoginFormData>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let user = get_user_by_username(db, &form.username)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let user = match user {
        Some(user) if verify_password(&form.password, &user.password) => user,
        // A miss and a bad password read the same to the client.
        _ => {
            return Ok(LoginTemplate {
                client,
                next: form.next.to_owned(),
                error: Some("Invalid username or password.".to_owned()),
            }
            .to_response())
        }
    };

    let uuid = session::new_session(db, user.id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    cookies
        .insert("token", uuid.to_string())
        .map_err(error::ErrorInternalServerError)?;

    if let Err(e) = session::remove_expired_sessions(db).await {
        log::warn!("login_post: remove_expired_sessions: {}", e);
    }

    Ok(super::found(safe_next(&form.next)))
}

#[get("/logout")]
pub async fn logout(
    client: ClientCtx,
    cookies: actix_session::Session,
) -> Result<impl Responder, Error> {
    if let Some(uuid) = session::uuid_from_cookies(&cookies) {
        if let Err(e) = session::remove_session(get_db_pool(), uuid).await {
            log::error!("logout: remove_session(): {}", e);
        }
    }
    cookies.purge();
    Ok(LogoutTemplate { client }.to_response())
}

#[get("/signup")]
pub async fn signup_get(client: ClientCtx) -> impl Responder {
    SignupTemplate {
        client,
        username: String::new(),
        error: None,
    }
    .to_response()
}

#[post("/signup")]
pub async fn signup_post(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<SignupFormData>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let form = form.into_inner();

    let failure = if !validate_username(&form.username) {
        Some("Usernames are 1-150 characters of letters, digits, and @.+-_ only.")
    } else if form.password.len() < PASSWORD_MIN_LEN {
        Some("Passwords must be at least 8 characters.")
    } else if form.password != form.password_confirm {
        Some("Passwords do not match.")
    } else if get_user_by_username(db, &form.username)
        .await
        .map_err(error::ErrorInternalServerError)?
        .is_some()
    {
        Some("That username is taken.")
    } else {
        None
    };

    if let Some(message) = failure {
        return Ok(SignupTemplate {
            client,
            username: form.username,
            error: Some(message.to_owned()),
        }
        .to_response());
    }

    let password = hash_password(&form.password)
        .map_err(|e| error::ErrorInternalServerError(e.to_string()))?;
    let user = users::ActiveModel {
        username: Set(form.username),
        password: Set(password),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    // Fresh accounts are logged straight in.
    let uuid = session::new_session(db, user.id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    cookies
        .insert("token", uuid.to_string())
        .map_err(error::ErrorInternalServerError)?;

    Ok(super::found("/".to_owned()))
}

#[get("/account")]
pub async fn account_get(client: ClientCtx) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        return Ok(super::login_redirect("/account"));
    }
    Ok(AccountTemplate {
        client,
        message: None,
        error: None,
    }
    .to_response())
}

#[post("/account")]
pub async fn account_post(
    client: ClientCtx,
    form: web::Form<PasswordChangeFormData>,
) -> Result<HttpResponse, Error> {
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(super::login_redirect("/account")),
    };
    let db = get_db_pool();
    let user = users::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorInternalServerError("Could not load profile."))?;

    if !verify_password(&form.old_password, &user.password) {
        return Ok(AccountTemplate {
            client,
            message: None,
            error: Some("Current password was incorrect.".to_owned()),
        }
        .to_response());
    }
    if form.new_password.len() < PASSWORD_MIN_LEN {
        return Ok(AccountTemplate {
            client,
            message: None,
            error: Some("Passwords must be at least 8 characters.".to_owned()),
        }
        .to_response());
    }

    let password = hash_password(&form.new_password)
        .map_err(|e| error::ErrorInternalServerError(e.to_string()))?;
    users::ActiveModel {
        id: Set(user.id),
        password: Set(password),
        ..Default::default()
    }
    .update(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(AccountTemplate {
        client,
        message: Some("Password updated.".to_owned()),
        error: None,
    }
    .to_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn garbage_hashes_never_verify() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn usernames_follow_the_pattern() {
        assert!(validate_username("Author"));
        assert!(validate_username("user.name+tag@host"));
        assert!(!validate_username(""));
        assert!(!validate_username("has spaces"));
        assert!(!validate_username("slash/name"));
    }

    #[test]
    fn next_targets_stay_on_site() {
        assert_eq!(safe_next(&Some("/create/".to_owned())), "/create/");
        assert_eq!(safe_next(&Some("//evil.example".to_owned())), "/");
        assert_eq!(safe_next(&Some("https://evil.example".to_owned())), "/");
        assert_eq!(safe_next(&None), "/");
    }
}
