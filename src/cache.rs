use chrono::{Duration, NaiveDateTime, Utc};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::RwLock;

/// How long a cached index page stays valid.
pub const PAGE_TTL_SECONDS: i64 = 20;

const INDEX_KEY_PREFIX: &str = "index_page";

struct CachedPage {
    body: String,
    rendered_at: NaiveDateTime,
}

static PAGE_CACHE: OnceCell<RwLock<HashMap<String, CachedPage>>> = OnceCell::new();

#[inline(always)]
fn get_page_cache() -> &'static RwLock<HashMap<String, CachedPage>> {
    unsafe { PAGE_CACHE.get_unchecked() }
}

pub fn init() {
    PAGE_CACHE
        .set(RwLock::new(HashMap::new()))
        .ok()
        .expect("failed to set PAGE_CACHE");
}

pub fn index_key(page: usize) -> String {
    format!("{}:{}", INDEX_KEY_PREFIX, page)
}

/// Returns the cached body if it is still within its TTL.
/// Stale entries are evicted on read.
pub fn get(key: &str) -> Option<String> {
    let deadline = Utc::now().naive_utc() - Duration::seconds(PAGE_TTL_SECONDS);
    {
        let cache = get_page_cache().read().unwrap();
        match cache.get(key) {
            Some(page) if page.rendered_at > deadline => return Some(page.body.to_owned()),
            Some(_) => {}
            None => return None,
        }
    }
    get_page_cache().write().unwrap().remove(key);
    None
}

pub fn put(key: &str, body: String) {
    put_at(key, body, Utc::now().naive_utc());
}

fn put_at(key: &str, body: String, rendered_at: NaiveDateTime) {
    get_page_cache().write().unwrap().insert(
        key.to_owned(),
        CachedPage { body, rendered_at },
    );
}

/// Drops every cached page. Called when a post is deleted.
pub fn clear() {
    get_page_cache().write().unwrap().clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_once() {
        let _ = PAGE_CACHE.set(RwLock::new(HashMap::new()));
    }

    #[test]
    fn hit_within_ttl() {
        init_once();
        put("hit:1", "<html>a</html>".to_owned());
        assert_eq!(get("hit:1").as_deref(), Some("<html>a</html>"));
    }

    #[test]
    fn miss_after_ttl() {
        init_once();
        let stale = Utc::now().naive_utc() - Duration::seconds(PAGE_TTL_SECONDS + 1);
        put_at("stale:1", "<html>old</html>".to_owned(), stale);
        assert_eq!(get("stale:1"), None);
        // Evicted, not merely skipped.
        assert!(!get_page_cache().read().unwrap().contains_key("stale:1"));
    }

    #[test]
    fn clear_empties_everything() {
        init_once();
        put("clear:1", "a".to_owned());
        put("clear:2", "b".to_owned());
        clear();
        assert_eq!(get("clear:1"), None);
        assert_eq!(get("clear:2"), None);
    }

    #[test]
    fn index_key_carries_page_number() {
        assert_eq!(index_key(1), "index_page:1");
        assert_eq!(index_key(3), "index_page:3");
    }
}
