//! Thread lookup, creation, and editing.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use super::{
    connection::DbConnection,
    forums::{add_forum_members, add_forum_thread, forum_by_slug},
    lower,
    users::user_by_nickname,
};
use crate::{
    api::{NewThread, Thread, ThreadRef, ThreadUpdate},
    error::{Entity, ForumError},
    models::{NewThreadRow, ThreadChanges, ThreadRow},
    schema::{forums::dsl as f, threads::dsl as t, users::dsl as u},
};

impl ThreadRow {
    pub(crate) fn into_api(self, forum: String, author: String) -> Thread {
        Thread {
            id: self.id,
            slug: self.slug,
            forum,
            author,
            title: self.title,
            message: self.message,
            votes: self.votes,
            created: self.created.and_utc(),
        }
    }
}

/// Locate a thread by id or by slug, ignoring case.
///
/// # Errors
/// Returns [`ForumError::NotFound`] when neither resolves.
pub async fn resolve_thread(
    conn: &mut DbConnection,
    thread: &ThreadRef,
) -> Result<ThreadRow, ForumError> {
    let found = match thread {
        ThreadRef::Id(id) => {
            t::threads
                .find(*id)
                .select(ThreadRow::as_select())
                .first(conn)
                .await
        }
        ThreadRef::Slug(slug) => {
            t::threads
                .filter(lower(t::slug.assume_not_null()).eq(lower(slug.as_str())))
                .select(ThreadRow::as_select())
                .first(conn)
                .await
        }
    };
    found
        .optional()?
        .ok_or_else(|| ForumError::not_found(Entity::Thread, thread))
}

/// Load a thread with its forum slug and author nickname.
///
/// # Errors
/// Returns [`ForumError::NotFound`] for an unknown id.
pub async fn thread_by_id(conn: &mut DbConnection, id: i32) -> Result<Thread, ForumError> {
    let (row, forum, author) = t::threads
        .inner_join(f::forums)
        .inner_join(u::users)
        .filter(t::id.eq(id))
        .select((ThreadRow::as_select(), f::slug, u::nickname))
        .first::<(ThreadRow, String, String)>(conn)
        .await
        .optional()?
        .ok_or_else(|| ForumError::not_found(Entity::Thread, id))?;
    Ok(row.into_api(forum, author))
}

/// Start a thread in a forum.
///
/// Bumps the forum's thread counter and records the author as a forum
/// member. An empty slug is stored as no slug.
///
/// # Errors
/// Returns [`ForumError::NotFound`] for an unknown author or forum and
/// [`ForumError::Conflict`] for a slug already in use.
#[must_use = "handle the result"]
pub async fn create_thread(conn: &mut DbConnection, new: &NewThread) -> Result<Thread, ForumError> {
    conn.transaction::<_, ForumError, _>(|conn| {
        Box::pin(async move {
            let author = user_by_nickname(conn, &new.author).await?;
            let forum = forum_by_slug(conn, &new.forum).await?;
            let slug = new.slug.as_deref().filter(|s| !s.is_empty());
            let row = NewThreadRow {
                slug,
                forum_id: forum.id,
                author_id: author.id,
                title: &new.title,
                message: &new.message,
                created: new.created.unwrap_or_else(Utc::now).naive_utc(),
            };
            let inserted = diesel::insert_into(t::threads)
                .values(&row)
                .returning(ThreadRow::as_returning())
                .get_result(conn)
                .await
                .map_err(|e| {
                    ForumError::from(e).on_conflict(Entity::Thread, slug.unwrap_or(&new.title))
                })?;

            add_forum_thread(conn, forum.id).await?;
            add_forum_members(conn, forum.id, &[author.id]).await?;
            debug!(thread = inserted.id, forum = %forum.slug, "thread created");
            Ok(inserted.into_api(forum.slug, author.nickname))
        })
    })
    .await
}

/// Fetch a thread by id or slug.
///
/// # Errors
/// Returns [`ForumError::NotFound`] when the thread does not resolve.
#[must_use = "handle the result"]
pub async fn get_thread(conn: &mut DbConnection, thread: &ThreadRef) -> Result<Thread, ForumError> {
    let row = resolve_thread(conn, thread).await?;
    thread_by_id(conn, row.id).await
}

/// Overwrite a thread's title and/or message.
///
/// # Errors
/// Returns [`ForumError::NotFound`] when the thread does not resolve.
#[must_use = "handle the result"]
pub async fn update_thread(
    conn: &mut DbConnection,
    thread: &ThreadRef,
    update: &ThreadUpdate,
) -> Result<Thread, ForumError> {
    let row = resolve_thread(conn, thread).await?;
    let changes = ThreadChanges {
        title: update.title.as_deref(),
        message: update.message.as_deref(),
    };
    if changes.title.is_some() || changes.message.is_some() {
        diesel::update(t::threads.find(row.id))
            .set(&changes)
            .execute(conn)
            .await?;
    }
    thread_by_id(conn, row.id).await
}
