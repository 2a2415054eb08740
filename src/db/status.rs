//! Store-wide row counts and reset.

use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::connection::DbConnection;
use crate::{
    api::Status,
    error::ForumError,
    schema::{forum_users, forums, posts, threads, users, votes},
};

/// Count users, forums, threads, and posts.
///
/// # Errors
/// Returns any error produced by the count queries.
#[must_use = "handle the result"]
pub async fn status(conn: &mut DbConnection) -> Result<Status, ForumError> {
    Ok(Status {
        user: users::table.count().get_result(conn).await?,
        forum: forums::table.count().get_result(conn).await?,
        thread: threads::table.count().get_result(conn).await?,
        post: posts::table.count().get_result(conn).await?,
    })
}

/// Delete every row, children before parents.
///
/// # Errors
/// Returns any error produced by the deletes; nothing is removed on failure.
pub async fn clear(conn: &mut DbConnection) -> Result<(), ForumError> {
    conn.transaction::<_, ForumError, _>(|conn| {
        Box::pin(async move {
            diesel::delete(votes::table).execute(conn).await?;
            diesel::delete(forum_users::table).execute(conn).await?;
            diesel::delete(posts::table).execute(conn).await?;
            diesel::delete(threads::table).execute(conn).await?;
            diesel::delete(forums::table).execute(conn).await?;
            diesel::delete(users::table).execute(conn).await?;
            Ok(())
        })
    })
    .await
}
