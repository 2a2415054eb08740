//! Connection and pool helpers for database access.

use cfg_if::cfg_if;
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, PoolError, bb8::Pool};
#[cfg(feature = "sqlite")]
use diesel_async::{
    AsyncConnection,
    SimpleAsyncConnection,
    pooled_connection::ManagerConfig,
    sync_connection_wrapper::SyncConnectionWrapper,
};
#[cfg(feature = "sqlite")]
use futures_util::{FutureExt, future::BoxFuture};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

cfg_if! {
    if #[cfg(all(feature = "sqlite", feature = "postgres", not(feature = "lint")))] {
        compile_error!("Either feature 'sqlite' or 'postgres' must be enabled, not both");
    } else if #[cfg(feature = "sqlite")] {
        use diesel::sqlite::{Sqlite, SqliteConnection};
        /// Database backend type for `SQLite`.
        pub type Backend = Sqlite;
        /// Embedded database migrations for `SQLite`.
        pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");
        /// Connection type for `SQLite` database access.
        pub type DbConnection = SyncConnectionWrapper<SqliteConnection>;
        /// Connection pool type for `SQLite`.
        pub type DbPool = Pool<DbConnection>;
    } else if #[cfg(all(feature = "postgres", not(feature = "sqlite")))] {
        use diesel::pg::Pg;
        use diesel_async::AsyncPgConnection;
        /// Database backend type for PostgreSQL.
        pub type Backend = Pg;
        /// Embedded database migrations for PostgreSQL.
        pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");
        /// Connection type for PostgreSQL database access.
        pub type DbConnection = AsyncPgConnection;
        /// Connection pool type for PostgreSQL.
        pub type DbPool = Pool<DbConnection>;
    } else {
        compile_error!("Either feature 'sqlite' or 'postgres' must be enabled");
    }
}

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// How long a `SQLite` writer waits for another writer's lock.
#[cfg(feature = "sqlite")]
pub const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Open one `SQLite` connection that waits for competing writers instead of
/// failing at once.
#[cfg(feature = "sqlite")]
fn connect_sqlite(url: &str) -> BoxFuture<'_, diesel::ConnectionResult<DbConnection>> {
    async move {
        let mut conn = DbConnection::establish(url).await?;
        conn.batch_execute(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"))
            .await
            .map_err(diesel::ConnectionError::CouldntSetupConfiguration)?;
        Ok(conn)
    }
    .boxed()
}

/// Take the write lock at the start of the current transaction.
///
/// A deferred `SQLite` transaction that has already read cannot wait for a
/// competing writer, so write operations claim the lock before their first
/// read. The statement touches no rows.
///
/// # Errors
/// Returns the busy error when the lock is still held after
/// [`BUSY_TIMEOUT_MS`].
#[cfg(feature = "sqlite")]
pub async fn claim_writer(conn: &mut DbConnection) -> diesel::QueryResult<()> {
    conn.batch_execute("DELETE FROM votes WHERE 0").await
}

/// Take the write lock at the start of the current transaction.
///
/// PostgreSQL locks rows as they are written, so there is nothing to claim.
///
/// # Errors
/// Never fails.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub async fn claim_writer(_conn: &mut DbConnection) -> diesel::QueryResult<()> { Ok(()) }

#[cfg(feature = "sqlite")]
fn manager(database_url: &str) -> AsyncDieselConnectionManager<DbConnection> {
    let mut config = ManagerConfig::default();
    config.custom_setup = Box::new(connect_sqlite);
    AsyncDieselConnectionManager::new_with_config(database_url, config)
}

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
fn manager(database_url: &str) -> AsyncDieselConnectionManager<DbConnection> {
    AsyncDieselConnectionManager::new(database_url)
}

/// Create a pooled connection to the configured database.
///
/// `SQLite` connections wait up to [`BUSY_TIMEOUT_MS`] for a competing
/// writer's lock.
///
/// `database_url` is handed to the backend unchanged: a file path (or
/// `:memory:`) for `SQLite`, a `postgres://` URL for PostgreSQL. Use
/// [`crate::db::registry::open_pool`] to accept prefixed connection strings.
///
/// # Examples
///
/// ```no_run
/// use forumdb::db::establish_pool;
/// async fn example() {
///     let pool = establish_pool("forum.db", 4)
///         .await
///         .expect("failed to build pool");
/// }
/// ```
///
/// # Errors
/// Returns any error reported by the underlying connection pool builder.
pub async fn establish_pool(database_url: &str, max_size: u32) -> Result<DbPool, PoolError> {
    Pool::builder().max_size(max_size).build(manager(database_url)).await
}

/// Create a single-connection pool over a private in-memory `SQLite` database.
///
/// Every `SQLite` connection to `:memory:` sees its own database, so the pool
/// is pinned to one connection that is never recycled.
///
/// # Errors
/// Returns any error reported by the underlying connection pool builder.
#[cfg(feature = "sqlite")]
pub async fn establish_memory_pool() -> Result<DbPool, PoolError> {
    Pool::builder()
        .max_size(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .build(manager(":memory:"))
        .await
}
