use crate::global::get_session_time;
use crate::orm::sessions;
use crate::user::ClientUser;
use chrono::{NaiveDateTime, Utc};
use once_cell::sync::OnceCell;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-process mirror of one `sessions` row.
#[derive(Copy, Clone, Debug)]
pub struct Session {
    pub user_id: i32,
    pub expires_at: NaiveDateTime,
}

pub type SessionMap = RwLock<HashMap<Uuid, Session>>;

static SESSION_CACHE: OnceCell<SessionMap> = OnceCell::new();

#[inline(always)]
pub fn get_session_cache() -> &'static SessionMap {
    unsafe { SESSION_CACHE.get_unchecked() }
}

pub fn init() {
    SESSION_CACHE
        .set(RwLock::new(HashMap::new()))
        .expect("failed to set SESSION_CACHE");
}

/// Replaces the cache contents with the `sessions` table. Called at boot.
pub async fn reload_session_cache(db: &DatabaseConnection) -> Result<(), DbErr> {
    let results = sessions::Entity::find().all(db).await?;
    let mut cache = get_session_cache().write().unwrap();
    cache.clear();
    for session in results {
        match Uuid::parse_str(&session.id) {
            Ok(uuid) => {
                cache.insert(
                    uuid,
                    Session {
                        user_id: session.user_id,
                        expires_at: session.expires_at,
                    },
                );
            }
            Err(e) => {
                log::warn!("reload_session_cache: bad token in sessions table: {}", e);
            }
        }
    }
    Ok(())
}

/// Issues a new session for a user, writing both the table and the cache.
pub async fn new_session(db: &DatabaseConnection, user_id: i32) -> Result<Uuid, DbErr> {
    let expires_at = Utc::now().naive_utc() + *get_session_time();
    let session = Session {
        user_id,
        expires_at,
    };

    let mut uuid;
    loop {
        uuid = Uuid::new_v4();
        let cache = &mut *get_session_cache().write().unwrap();
        if !cache.contains_key(&uuid) {
            cache.insert(uuid, session);
            break;
        }
    }

    sessions::Entity::insert(sessions::ActiveModel {
        id: Set(uuid.to_string()),
        user_id: Set(user_id),
        expires_at: Set(expires_at),
    })
    .exec(db)
    .await?;

    Ok(uuid)
}

/// Drops a session from the cache and the table.
pub async fn remove_session(db: &DatabaseConnection, uuid: Uuid) -> Result<(), DbErr> {
    get_session_cache().write().unwrap().remove(&uuid);
    sessions::Entity::delete_many()
        .filter(sessions::Column::Id.eq(uuid.to_string()))
        .exec(db)
        .await?;
    Ok(())
}

/// Deletes expired rows from the table and evicts them from the cache.
pub async fn remove_expired_sessions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();
    get_session_cache()
        .write()
        .unwrap()
        .retain(|_, v| v.expires_at >= now);
    sessions::Entity::delete_many()
        .filter(sessions::Column::ExpiresAt.lt(now))
        .exec(db)
        .await?;
    Ok(())
}

/// Resolves a token to a live session. Expired entries are evicted, not returned.
pub fn authenticate_by_uuid(uuid: &Uuid) -> Option<Session> {
    let session = { get_session_cache().read().unwrap().get(uuid).copied() };
    match session {
        Some(session) if session.expires_at >= Utc::now().naive_utc() => Some(session),
        Some(_) => {
            get_session_cache().write().unwrap().remove(uuid);
            None
        }
        None => None,
    }
}

/// Pulls the token out of the cookie session, if there is one.
pub fn uuid_from_cookies(cookies: &actix_session::Session) -> Option<Uuid> {
    match cookies.get::<String>("token") {
        Ok(Some(token)) => match Uuid::parse_str(&token) {
            Ok(uuid) => Some(uuid),
            Err(e) => {
                log::warn!("uuid_from_cookies: parse_str(): {}", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            log::warn!("uuid_from_cookies: cookies.get(): {}", e);
            None
        }
    }
}

/// Cookie token -> cached session -> user row.
pub async fn authenticate_client_by_session(
    db: &DatabaseConnection,
    cookies: &actix_session::Session,
) -> Option<ClientUser> {
    let uuid = uuid_from_cookies(cookies)?;
    let session = authenticate_by_uuid(&uuid)?;
    match crate::user::get_client_user_by_id(db, session.user_id).await {
        Ok(user) => user,
        Err(e) => {
            log::error!("authenticate_client_by_session: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn init_once() {
        let _ = SESSION_CACHE.set(RwLock::new(HashMap::new()));
    }

    #[test]
    fn expired_tokens_do_not_authenticate() {
        init_once();
        let uuid = Uuid::new_v4();
        get_session_cache().write().unwrap().insert(
            uuid,
            Session {
                user_id: 1,
                expires_at: Utc::now().naive_utc() - Duration::minutes(1),
            },
        );
        assert!(authenticate_by_uuid(&uuid).is_none());
        // The expired entry is evicted, too.
        assert!(!get_session_cache().read().unwrap().contains_key(&uuid));
    }

    #[test]
    fn live_tokens_authenticate() {
        init_once();
        let uuid = Uuid::new_v4();
        get_session_cache().write().unwrap().insert(
            uuid,
            Session {
                user_id: 7,
                expires_at: Utc::now().naive_utc() + Duration::minutes(5),
            },
        );
        let session = authenticate_by_uuid(&uuid).expect("session should resolve");
        assert_eq!(session.user_id, 7);
    }
}
