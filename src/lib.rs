pub mod cache;
pub mod db;
pub mod filesystem;
pub mod global;
pub mod middleware;
pub mod orm;
pub mod pagination;
pub mod session;
pub mod user;
pub mod web;

pub use db::{get_db_pool, init_db};
