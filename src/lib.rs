//! Forum storage backend with threaded post ordering.
//!
//! The crate stores users, forums, threads, posts, and votes in a relational
//! database and exposes one transactional operation per request through
//! [`service::ForumService`]. Posts carry a materialized
//! [`post_path::PostPath`] so a thread can be listed flat, as a depth-first
//! tree, or paginated by top-level post. Only one database backend (either
//! `sqlite` or `postgres`) should be enabled at a time.
cfg_if::cfg_if! {
    if #[cfg(all(feature = "sqlite", feature = "postgres", not(feature = "lint")))] {
        compile_error!("Choose either sqlite or postgres, not both");
    } else if #[cfg(feature = "sqlite")] {
        pub use diesel::sqlite::Sqlite as DbBackend;
    } else if #[cfg(feature = "postgres")] {
        pub use diesel::pg::Pg as DbBackend;
    } else {
        compile_error!("Either the 'sqlite' or 'postgres' feature must be enabled");
    }
}

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod post_path;
pub mod schema;
pub mod server;
pub mod service;
