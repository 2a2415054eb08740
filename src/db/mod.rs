//! Storage gateway over the relational forum store.
//!
//! This module tree exposes helpers for creating pooled Diesel connections,
//! running embedded migrations, auditing backend capabilities, and the forum
//! queries grouped by record kind. Functions that issue more than one write
//! run inside their own transaction; the rest compose inside a caller's.

mod audit;
mod connection;
mod forums;
mod migrations;
mod posts;
pub mod registry;
mod status;
mod threads;
mod traversal;
mod users;
mod votes;

#[cfg(test)]
mod tests;

#[cfg(feature = "postgres")]
pub use self::audit::audit_postgres_features;
#[cfg(feature = "sqlite")]
pub use self::audit::audit_sqlite_features;
#[cfg(feature = "sqlite")]
pub use self::connection::establish_memory_pool;
pub use self::{
    connection::{
        Backend,
        DEFAULT_POOL_SIZE,
        DbConnection,
        DbPool,
        MIGRATIONS,
        claim_writer,
        establish_pool,
    },
    forums::{
        add_forum_members,
        add_forum_posts,
        add_forum_thread,
        create_forum,
        forum_by_slug,
        forum_threads,
        forum_users,
        get_forum,
    },
    migrations::apply_migrations,
    posts::{allocate_path, create_posts, get_post, update_post},
    registry::{RegistryError, open_pool},
    status::{clear, status},
    threads::{create_thread, get_thread, resolve_thread, thread_by_id, update_thread},
    traversal::thread_posts,
    users::{create_user, get_user, update_user, user_by_nickname},
    votes::{recount_votes, vote},
};

diesel::define_sql_function! {
    /// SQL `lower()`, used to compare nicknames and slugs without regard to
    /// case on both backends.
    fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text;
}
