//! Transactional entry points for the request layer.
//!
//! [`ForumService`] owns the connection pool. Each method checks out one
//! connection, runs the matching storage gateway operation inside a single
//! transaction, and logs rejected requests. Any error rolls the whole
//! operation back.

use diesel_async::{AsyncConnection, pooled_connection::bb8::PooledConnection};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    api::{
        Forum,
        ForumThreadsQuery,
        ForumUsersQuery,
        NewForum,
        NewPost,
        NewThread,
        Post,
        PostDetails,
        Related,
        Status,
        Thread,
        ThreadPostsQuery,
        ThreadRef,
        ThreadUpdate,
        User,
        UserProfile,
        UserUpdate,
        Vote,
    },
    db::{self, DbConnection, DbPool, RegistryError, apply_migrations, registry},
    error::ForumError,
};

/// Failure to bring the store up.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The connection string names no supported database.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// No connection could be checked out of the new pool.
    #[error("failed to get a database connection: {0}")]
    Connection(String),
    /// The backend audit or a migration failed.
    #[error("database setup failed: {0}")]
    Setup(#[from] diesel::result::Error),
}

/// Run one gateway call in a transaction on a pooled connection.
///
/// The `write` form takes the database write lock before the call runs.
macro_rules! in_transaction {
    ($service:expr, $op:literal, write |$conn:ident| $body:expr) => {
        in_transaction!($service, $op, |$conn| async {
            db::claim_writer($conn).await?;
            $body.await
        })
    };
    ($service:expr, $op:literal, |$conn:ident| $body:expr) => {{
        let mut conn = $service.connection().await?;
        let result = conn
            .transaction::<_, ForumError, _>(|$conn| Box::pin(async move { $body.await }))
            .await;
        if let Err(err) = &result {
            log_rejection($op, err);
        }
        result
    }};
}

fn log_rejection(op: &'static str, err: &ForumError) {
    match err {
        ForumError::Internal(_) => error!(op, error = %err, "operation failed"),
        _ => warn!(op, error = %err, "request rejected"),
    }
}

/// Forum store handle shared by request handlers.
#[derive(Clone)]
pub struct ForumService {
    pool: DbPool,
}

impl ForumService {
    /// Wrap an already migrated pool.
    #[must_use]
    pub const fn new(pool: DbPool) -> Self { Self { pool } }

    /// Open the database named by `database`, audit the backend, and apply
    /// pending migrations.
    ///
    /// `database` is a registry connection string such as
    /// `sqlite:forum.db` or `postgres://user@host/forum`.
    ///
    /// # Errors
    /// Returns [`OpenError`] when the string is not recognised, the pool
    /// cannot hand out a connection, or setup fails.
    pub async fn open(database: &str, pool_size: u32) -> Result<Self, OpenError> {
        let resolved = registry::resolve(database)?;
        let pool = resolved.open(pool_size).await?;
        {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| OpenError::Connection(e.to_string()))?;
            #[cfg(feature = "sqlite")]
            db::audit_sqlite_features(&mut conn).await?;
            #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
            db::audit_postgres_features(&mut conn).await?;
            apply_migrations(&mut conn, &resolved.source).await?;
        }
        info!(backend = resolved.kind.prefix, pool_size, "forum store ready");
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &DbPool { &self.pool }

    async fn connection(&self) -> Result<PooledConnection<'_, DbConnection>, ForumError> {
        self.pool.get().await.map_err(ForumError::internal)
    }

    /// Register a user.
    ///
    /// # Errors
    /// See [`db::create_user`].
    pub async fn create_user(&self, nickname: &str, profile: &UserProfile) -> Result<User, ForumError> {
        in_transaction!(self, "create_user", write |conn| db::create_user(conn, nickname, profile))
    }

    /// Fetch a user.
    ///
    /// # Errors
    /// See [`db::get_user`].
    pub async fn get_user(&self, nickname: &str) -> Result<User, ForumError> {
        in_transaction!(self, "get_user", |conn| db::get_user(conn, nickname))
    }

    /// Update a user's profile.
    ///
    /// # Errors
    /// See [`db::update_user`].
    pub async fn update_user(&self, nickname: &str, update: &UserUpdate) -> Result<User, ForumError> {
        in_transaction!(self, "update_user", write |conn| db::update_user(conn, nickname, update))
    }

    /// Open a forum.
    ///
    /// # Errors
    /// See [`db::create_forum`].
    pub async fn create_forum(&self, new: &NewForum) -> Result<Forum, ForumError> {
        in_transaction!(self, "create_forum", write |conn| db::create_forum(conn, new))
    }

    /// Fetch a forum.
    ///
    /// # Errors
    /// See [`db::get_forum`].
    pub async fn get_forum(&self, slug: &str) -> Result<Forum, ForumError> {
        in_transaction!(self, "get_forum", |conn| db::get_forum(conn, slug))
    }

    /// List a forum's threads.
    ///
    /// # Errors
    /// See [`db::forum_threads`].
    pub async fn forum_threads(
        &self,
        slug: &str,
        query: &ForumThreadsQuery,
    ) -> Result<Vec<Thread>, ForumError> {
        in_transaction!(self, "forum_threads", |conn| db::forum_threads(conn, slug, query))
    }

    /// List a forum's participants.
    ///
    /// # Errors
    /// See [`db::forum_users`].
    pub async fn forum_users(
        &self,
        slug: &str,
        query: &ForumUsersQuery,
    ) -> Result<Vec<User>, ForumError> {
        in_transaction!(self, "forum_users", |conn| db::forum_users(conn, slug, query))
    }

    /// Start a thread.
    ///
    /// # Errors
    /// See [`db::create_thread`].
    pub async fn create_thread(&self, new: &NewThread) -> Result<Thread, ForumError> {
        in_transaction!(self, "create_thread", write |conn| db::create_thread(conn, new))
    }

    /// Fetch a thread.
    ///
    /// # Errors
    /// See [`db::get_thread`].
    pub async fn get_thread(&self, thread: &ThreadRef) -> Result<Thread, ForumError> {
        in_transaction!(self, "get_thread", |conn| db::get_thread(conn, thread))
    }

    /// Edit a thread.
    ///
    /// # Errors
    /// See [`db::update_thread`].
    pub async fn update_thread(
        &self,
        thread: &ThreadRef,
        update: &ThreadUpdate,
    ) -> Result<Thread, ForumError> {
        in_transaction!(self, "update_thread", write |conn| db::update_thread(conn, thread, update))
    }

    /// Insert a batch of posts into a thread.
    ///
    /// # Errors
    /// See [`db::create_posts`].
    pub async fn create_posts(
        &self,
        thread: &ThreadRef,
        batch: &[NewPost],
    ) -> Result<Vec<Post>, ForumError> {
        in_transaction!(self, "create_posts", write |conn| db::create_posts(conn, thread, batch))
    }

    /// Fetch a post with the requested related records.
    ///
    /// # Errors
    /// See [`db::get_post`].
    pub async fn get_post(&self, id: i32, related: &[Related]) -> Result<PostDetails, ForumError> {
        in_transaction!(self, "get_post", |conn| db::get_post(conn, id, related))
    }

    /// Replace a post's message.
    ///
    /// # Errors
    /// See [`db::update_post`].
    pub async fn update_post(&self, id: i32, message: Option<&str>) -> Result<Post, ForumError> {
        in_transaction!(self, "update_post", write |conn| db::update_post(conn, id, message))
    }

    /// List a thread's posts in the requested order.
    ///
    /// # Errors
    /// See [`db::thread_posts`].
    pub async fn thread_posts(&self, query: &ThreadPostsQuery) -> Result<Vec<Post>, ForumError> {
        in_transaction!(self, "thread_posts", |conn| db::thread_posts(conn, query))
    }

    /// Vote on a thread.
    ///
    /// # Errors
    /// See [`db::vote`].
    pub async fn vote(&self, thread: &ThreadRef, vote: &Vote) -> Result<Thread, ForumError> {
        in_transaction!(self, "vote", write |conn| db::vote(conn, thread, vote))
    }

    /// Count the stored records.
    ///
    /// # Errors
    /// See [`db::status`].
    pub async fn status(&self) -> Result<Status, ForumError> {
        in_transaction!(self, "status", |conn| db::status(conn))
    }

    /// Delete every record.
    ///
    /// # Errors
    /// See [`db::clear`].
    pub async fn clear(&self) -> Result<(), ForumError> {
        in_transaction!(self, "clear", write |conn| db::clear(conn))?;
        info!("forum store cleared");
        Ok(())
    }
}
